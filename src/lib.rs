//! marga-sim - Perturbation-testing harness core for driving agents
//!
//! This library provides the two subsystems a road-perturbation experiment
//! is built around:
//!
//! - a constrained procedural road generator that grows control-node chains
//!   under geometric validity constraints and samples them into smooth,
//!   simulator-consumable centerlines, and
//! - a simulator bridge that turns the event-driven telemetry stream of a
//!   vehicle simulator into a synchronous observe/act stepping loop.
//!
//! ## Quick start
//!
//! ```no_run
//! use marga_sim::{HarnessConfig, RoadGenerator, SimulatorBridge};
//! use marga_sim::bridge::{RawFrameDecoder, TcpChannel};
//! use std::sync::Arc;
//!
//! # fn main() -> marga_sim::Result<()> {
//! let config = HarnessConfig::udacity_defaults();
//!
//! let mut generator = RoadGenerator::new(&config.road)?;
//! let road = generator.generate()?;
//!
//! let channel = TcpChannel::bind(&config.network.bind_address)?;
//! let decoder = Arc::new(RawFrameDecoder::new(config.camera));
//! let mut bridge = SimulatorBridge::new(Box::new(channel), decoder, config.episode);
//!
//! bridge.start()?;
//! bridge.reset(Some(road.to_track_string()?), false);
//! let step = bridge.observe()?;
//! println!("cte {:.2}, done {}", step.info.cte, step.done);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod bridge;
pub mod config;
pub mod error;
pub mod geometry;
pub mod road;

// Re-export commonly used types
pub use agent::{Action, DrivingAgent};
pub use bridge::SimulatorBridge;
pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use road::{RoadArtifact, RoadGenerator};
