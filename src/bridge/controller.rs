//! Simulator bridge: episode lifecycle and the observe/act contract.
//!
//! [`SimulatorBridge`] owns the telemetry channel, the shared episode state,
//! and a named event thread that services inbound messages. The stepping
//! caller drives episodes through `start` / `reset` / `take_action` /
//! `observe` / `quit`; the event thread answers every telemetry message with
//! the reply the episode state dictates (reset request, one-shot track
//! delivery, or the latest control values).

use super::channel::SimulatorChannel;
use super::frame::{CameraFrame, FrameDecoder};
use super::messages::{InboundMessage, OutboundMessage};
use super::state::{EpisodeState, TelemetryReply};
use crate::agent::Action;
use crate::config::EpisodeConfig;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How long the event thread waits per poll before rechecking shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Per-step metadata returned alongside each observed frame
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// 0 after a cross-track overrun, 1 after a collision-only termination
    pub is_success: u8,
    /// Identifier of the track the simulator reports driving on
    pub track: Option<String>,
    /// Vehicle speed in km/h
    pub speed: f64,
    /// Vehicle position; the simulator's y and z arrive swapped and are
    /// reported in that inherited order
    pub pos: (f64, f64, f64),
    /// Cross-track error at this step
    pub cte: f64,
    /// Filtered cross-track error from the simulator's own controller
    pub cte_pid: f64,
}

/// One observation step: the freshest frame, the done flag, and step info
#[derive(Debug, Clone)]
pub struct Observation {
    pub frame: Arc<CameraFrame>,
    pub done: bool,
    pub info: StepInfo,
}

/// Bridge between the stepping caller and the event-driven simulator
pub struct SimulatorBridge {
    state: Arc<EpisodeState>,
    episode: EpisodeConfig,
    shutdown: Arc<AtomicBool>,
    event_thread: Option<JoinHandle<()>>,
    channel: Option<Box<dyn SimulatorChannel>>,
    decoder: Arc<dyn FrameDecoder>,
    last_seen_seq: u64,
}

impl SimulatorBridge {
    /// Create a bridge over the given channel and frame decoder.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    pub fn new(
        channel: Box<dyn SimulatorChannel>,
        decoder: Arc<dyn FrameDecoder>,
        episode: EpisodeConfig,
    ) -> Self {
        Self {
            state: Arc::new(EpisodeState::new()),
            episode,
            shutdown: Arc::new(AtomicBool::new(false)),
            event_thread: None,
            channel: Some(channel),
            decoder,
            last_seen_seq: 0,
        }
    }

    /// Spawn the event thread and block until the simulator connects.
    ///
    /// Calling again after a connect timeout keeps the existing thread and
    /// just waits once more.
    pub fn start(&mut self) -> Result<()> {
        if let Some(channel) = self.channel.take() {
            let state = Arc::clone(&self.state);
            let shutdown = Arc::clone(&self.shutdown);
            let decoder = Arc::clone(&self.decoder);
            let track_settle = Duration::from_millis(self.episode.track_settle_ms);

            let handle = thread::Builder::new()
                .name("bridge-events".to_string())
                .spawn(move || run_event_loop(channel, state, decoder, shutdown, track_settle))?;
            self.event_thread = Some(handle);
        }

        log::info!("Bridge: waiting for simulator connection");
        self.state
            .wait_connected(Duration::from_millis(self.episode.connect_timeout_ms))?;
        log::info!("Bridge: simulator connected");
        Ok(())
    }

    /// Whether the simulator is currently connected
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Clear all episode state, optionally staging a track for delivery on
    /// the next telemetry message, then settle while the simulator resets.
    pub fn reset(&mut self, track_string: Option<String>, skip_generation: bool) {
        let staged = if skip_generation { None } else { track_string };
        log::info!(
            "Bridge: resetting episode{}",
            if staged.is_some() {
                " with staged track"
            } else {
                ""
            }
        );
        self.state.reset_episode(staged);
        thread::sleep(Duration::from_millis(self.episode.reset_settle_ms));
    }

    /// Record the latest control values; the next inbound telemetry message
    /// samples them. Non-blocking, sends nothing itself.
    pub fn take_action(&self, action: Action) {
        self.state.record_action(action.steering, action.throttle);
    }

    /// Block until a frame this caller has not seen arrives, then evaluate
    /// termination and return the step.
    pub fn observe(&mut self) -> Result<Observation> {
        let snapshot = self.state.observe(
            self.last_seen_seq,
            Duration::from_millis(self.episode.observe_timeout_ms),
            self.episode.max_cte_error,
        )?;
        self.last_seen_seq = snapshot.frame_seq;

        let (x, y, z) = snapshot.pos;
        Ok(Observation {
            frame: snapshot.frame,
            done: snapshot.done,
            info: StepInfo {
                is_success: snapshot.success,
                track: snapshot.track,
                speed: snapshot.speed,
                pos: (x, z, y),
                cte: snapshot.cte,
                cte_pid: snapshot.cte_pid,
            },
        })
    }

    /// Stop the event thread and release the channel. The simulator is not
    /// forcibly disconnected.
    pub fn quit(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.event_thread.take() {
            if handle.join().is_err() {
                log::error!("Bridge: event thread panicked");
            }
        }
        self.channel = None;
        log::info!("Bridge: stopped");
    }
}

impl Drop for SimulatorBridge {
    fn drop(&mut self) {
        self.quit();
    }
}

/// Event thread body: service inbound messages until shutdown
fn run_event_loop(
    mut channel: Box<dyn SimulatorChannel>,
    state: Arc<EpisodeState>,
    decoder: Arc<dyn FrameDecoder>,
    shutdown: Arc<AtomicBool>,
    track_settle: Duration,
) {
    log::info!("Bridge: event loop started");

    while !shutdown.load(Ordering::Relaxed) {
        match channel.poll_inbound(POLL_INTERVAL) {
            Ok(Some(InboundMessage::Connect)) => {
                log::info!("Bridge: connect event, sending neutral control");
                state.mark_connected();
                if let Err(e) = channel.send(&OutboundMessage::steer(0.0, 0.0)) {
                    log::warn!("Bridge: failed to send initial control: {}", e);
                }
            }
            Ok(Some(InboundMessage::Telemetry(telemetry))) => {
                match state.apply_telemetry(&telemetry, decoder.as_ref()) {
                    Ok(reply) => {
                        let settle_after = matches!(reply, TelemetryReply::Track(_));
                        let message = match reply {
                            TelemetryReply::Reset => OutboundMessage::Reset,
                            TelemetryReply::Track(track_string) => {
                                OutboundMessage::Track { track_string }
                            }
                            TelemetryReply::Steer { steering, throttle } => {
                                OutboundMessage::steer(steering, throttle)
                            }
                        };
                        if let Err(e) = channel.send(&message) {
                            log::warn!("Bridge: failed to answer telemetry: {}", e);
                        }
                        if settle_after {
                            // Do not race the simulator's own track-load sequence
                            log::info!("Bridge: track delivered, settling {:?}", track_settle);
                            thread::sleep(track_settle);
                        }
                    }
                    Err(e) => log::warn!("Bridge: dropping telemetry: {}", e),
                }
            }
            Ok(None) => {}
            Err(Error::Disconnected) => {
                log::warn!("Bridge: simulator disconnected");
                state.mark_disconnected();
            }
            Err(Error::ChannelClosed) => {
                log::info!("Bridge: channel closed, stopping event loop");
                break;
            }
            Err(e) => {
                log::error!("Bridge: channel error: {}", e);
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    log::info!("Bridge: event loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::channel::{mock_channel, MockChannelHandle};
    use crate::bridge::frame::RawFrameDecoder;
    use crate::bridge::messages::TelemetryPayload;
    use crate::config::CameraConfig;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

    fn episode_config() -> EpisodeConfig {
        EpisodeConfig {
            max_cte_error: 2.0,
            reset_settle_ms: 0,
            track_settle_ms: 0,
            observe_timeout_ms: 2_000,
            connect_timeout_ms: 300,
        }
    }

    fn camera_config() -> CameraConfig {
        CameraConfig {
            width: 2,
            height: 2,
            channels: 1,
        }
    }

    fn telemetry(cte: f64, hit: &str) -> InboundMessage {
        InboundMessage::Telemetry(TelemetryPayload {
            speed: 5.0,
            cte,
            cte_pid: cte,
            pos_x: 1.0,
            pos_y: 2.0,
            pos_z: 3.0,
            hit: hit.to_string(),
            track: "generated".to_string(),
            image: BASE64.encode([9u8, 9, 9, 9]),
        })
    }

    fn started_bridge() -> (SimulatorBridge, MockChannelHandle) {
        let (channel, handle) = mock_channel();
        let decoder = Arc::new(RawFrameDecoder::new(camera_config()));
        let mut bridge = SimulatorBridge::new(Box::new(channel), decoder, episode_config());

        handle.send_inbound(InboundMessage::Connect);
        bridge.start().unwrap();
        (bridge, handle)
    }

    #[test]
    fn test_start_sends_neutral_control_on_connect() {
        let (_bridge, handle) = started_bridge();
        let first = handle.recv_outbound(Duration::from_secs(2));
        match first {
            Some(OutboundMessage::Steer {
                steering_angle,
                throttle,
            }) => {
                assert_eq!(steering_angle, "0");
                assert_eq!(throttle, "0");
            }
            other => panic!("expected neutral steer, got {:?}", other),
        }
    }

    #[test]
    fn test_start_times_out_without_simulator() {
        let (channel, _handle) = mock_channel();
        let decoder = Arc::new(RawFrameDecoder::new(camera_config()));
        let mut bridge = SimulatorBridge::new(Box::new(channel), decoder, episode_config());
        assert!(matches!(bridge.start(), Err(Error::ConnectionTimeout)));
    }

    #[test]
    fn test_staged_track_is_delivered_once_then_controls_flow() {
        let (mut bridge, handle) = started_bridge();
        handle.recv_outbound(Duration::from_secs(2)); // neutral control

        bridge.reset(Some("track-json".to_string()), false);

        handle.send_inbound(telemetry(0.0, "none"));
        match handle.recv_outbound(Duration::from_secs(2)) {
            Some(OutboundMessage::Track { track_string }) => {
                assert_eq!(track_string, "track-json");
            }
            other => panic!("expected track delivery, got {:?}", other),
        }

        handle.send_inbound(telemetry(0.0, "none"));
        assert!(matches!(
            handle.recv_outbound(Duration::from_secs(2)),
            Some(OutboundMessage::Steer { .. })
        ));
    }

    #[test]
    fn test_skip_generation_suppresses_track_delivery() {
        let (mut bridge, handle) = started_bridge();
        handle.recv_outbound(Duration::from_secs(2));

        bridge.reset(Some("track-json".to_string()), true);
        handle.send_inbound(telemetry(0.0, "none"));
        assert!(matches!(
            handle.recv_outbound(Duration::from_secs(2)),
            Some(OutboundMessage::Steer { .. })
        ));
    }

    #[test]
    fn test_actions_are_sampled_by_next_telemetry() {
        let (mut bridge, handle) = started_bridge();
        handle.recv_outbound(Duration::from_secs(2));
        bridge.reset(None, true);

        bridge.take_action(Action {
            steering: -0.5,
            throttle: 0.25,
        });
        handle.send_inbound(telemetry(0.0, "none"));
        match handle.recv_outbound(Duration::from_secs(2)) {
            Some(OutboundMessage::Steer {
                steering_angle,
                throttle,
            }) => {
                assert_eq!(steering_angle, "-0.5");
                assert_eq!(throttle, "0.25");
            }
            other => panic!("expected recorded action, got {:?}", other),
        }
    }

    #[test]
    fn test_observe_returns_fresh_frames_and_swapped_axes() {
        let (mut bridge, handle) = started_bridge();
        bridge.reset(None, true);

        handle.send_inbound(telemetry(0.5, "none"));
        let first = bridge.observe().unwrap();
        assert!(!first.done);
        assert_eq!(first.info.cte, 0.5);
        assert_eq!(first.info.speed, 18.0); // 5 m/s -> 18 km/h
        assert_eq!(first.info.pos, (1.0, 3.0, 2.0)); // y and z swapped
        assert_eq!(first.info.track.as_deref(), Some("generated"));

        // A second observe needs a second frame
        handle.send_inbound(telemetry(0.6, "none"));
        let second = bridge.observe().unwrap();
        assert_eq!(second.info.cte, 0.6);
        assert!(!Arc::ptr_eq(&first.frame, &second.frame));
    }

    #[test]
    fn test_observe_times_out_when_simulator_stalls() {
        let (channel, handle) = mock_channel();
        let decoder = Arc::new(RawFrameDecoder::new(camera_config()));
        let mut episode = episode_config();
        episode.observe_timeout_ms = 50;
        let mut bridge = SimulatorBridge::new(Box::new(channel), decoder, episode);
        handle.send_inbound(InboundMessage::Connect);
        bridge.start().unwrap();

        assert!(matches!(bridge.observe(), Err(Error::ConnectionTimeout)));
    }

    #[test]
    fn test_cross_track_overrun_terminates_as_failure() {
        let (mut bridge, handle) = started_bridge();
        bridge.reset(None, true);

        handle.send_inbound(telemetry(5.0, "none"));
        let step = bridge.observe().unwrap();
        assert!(step.done);
        assert_eq!(step.info.is_success, 0);

        // Once done, the next telemetry is answered with a reset request
        handle.drain_outbound();
        handle.send_inbound(telemetry(5.0, "none"));
        let mut saw_reset = false;
        for _ in 0..4 {
            if let Some(OutboundMessage::Reset) = handle.recv_outbound(Duration::from_secs(2)) {
                saw_reset = true;
                break;
            }
        }
        assert!(saw_reset);
    }

    #[test]
    fn test_collision_terminates_as_success() {
        let (mut bridge, handle) = started_bridge();
        bridge.reset(None, true);

        handle.send_inbound(telemetry(0.0, "wall"));
        let step = bridge.observe().unwrap();
        assert!(step.done);
        assert_eq!(step.info.is_success, 1);
    }

    #[test]
    fn test_reset_clears_termination_state() {
        let (mut bridge, handle) = started_bridge();
        bridge.reset(None, true);

        handle.send_inbound(telemetry(5.0, "none"));
        assert!(bridge.observe().unwrap().done);

        bridge.reset(None, true);
        handle.send_inbound(telemetry(0.0, "none"));
        let step = bridge.observe().unwrap();
        assert!(!step.done);
        assert_eq!(step.info.is_success, 0);
    }

    #[test]
    fn test_quit_stops_event_thread() {
        let (mut bridge, handle) = started_bridge();
        bridge.quit();
        // Messages injected after quit are never answered
        handle.drain_outbound();
        handle.send_inbound(telemetry(0.0, "none"));
        assert!(handle.recv_outbound(Duration::from_millis(400)).is_none());
    }
}
