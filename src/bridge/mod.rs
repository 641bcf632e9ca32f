//! Simulator bridge: telemetry channel, shared episode state, and the
//! synchronous observe/act stepping contract over an event-driven simulator

mod channel;
mod controller;
mod frame;
mod messages;
mod state;
mod tcp;

pub use channel::{mock_channel, MockChannel, MockChannelHandle, SimulatorChannel};
pub use controller::{Observation, SimulatorBridge, StepInfo};
pub use frame::{CameraFrame, FrameDecoder, RawFrameDecoder};
pub use messages::{InboundMessage, OutboundMessage, TelemetryPayload, NO_COLLISION};
pub use tcp::TcpChannel;
