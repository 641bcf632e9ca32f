//! Shared episode state.
//!
//! One [`EpisodeState`] per bridge, written by the telemetry event thread
//! and read by the stepping caller. Every slot lives behind a single mutex
//! with a condvar signalling frame arrival and connection, replacing the
//! value-change polling the original design relied on. The frame sequence
//! number gives `observe` its identity test: a caller is only handed a frame
//! whose sequence differs from the last one it saw.

use super::frame::{CameraFrame, FrameDecoder};
use super::messages::{TelemetryPayload, MS_TO_KMH, NO_COLLISION};
use crate::error::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reply the telemetry callback owes the simulator for one inbound message
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TelemetryReply {
    /// Episode already over: ask the simulator to reset
    Reset,
    /// Deliver the staged track; sent at most once per episode
    Track(String),
    /// Latest recorded control values
    Steer { steering: f64, throttle: f64 },
}

/// Mutable episode slots. Zeroed by `reset`.
#[derive(Debug)]
pub(crate) struct EpisodeSlots {
    pub frame: Option<Arc<CameraFrame>>,
    pub frame_seq: u64,
    pub steering: f64,
    pub throttle: f64,
    pub speed: f64,
    pub cte: f64,
    pub cte_pid: f64,
    pub hit: String,
    pub pos: (f64, f64, f64),
    pub done: bool,
    pub success: u8,
    pub connected: bool,
    pub track_delivered: bool,
    pub staged_track: Option<String>,
    pub current_track: Option<String>,
}

impl Default for EpisodeSlots {
    fn default() -> Self {
        Self {
            frame: None,
            frame_seq: 0,
            steering: 0.0,
            throttle: 0.0,
            speed: 0.0,
            cte: 0.0,
            cte_pid: 0.0,
            hit: NO_COLLISION.to_string(),
            pos: (0.0, 0.0, 0.0),
            done: false,
            success: 0,
            connected: false,
            track_delivered: false,
            staged_track: None,
            current_track: None,
        }
    }
}

/// Read-only view of the slots taken by `observe` under the lock
#[derive(Debug, Clone)]
pub(crate) struct EpisodeSnapshot {
    pub frame: Arc<CameraFrame>,
    pub frame_seq: u64,
    pub done: bool,
    pub success: u8,
    pub track: Option<String>,
    pub speed: f64,
    pub pos: (f64, f64, f64),
    pub cte: f64,
    pub cte_pid: f64,
}

/// Termination predicate: `Some(success)` when the episode is over.
///
/// A cross-track overrun counts as failure; a collision without overrun
/// counts as success. The asymmetry is inherited behavior: for a
/// perturbation-robustness run, provoking a collision is the outcome under
/// test.
pub(crate) fn evaluate_termination(cte: f64, hit: &str, max_cte_error: f64) -> Option<u8> {
    if cte.abs() > max_cte_error {
        Some(0)
    } else if hit != NO_COLLISION {
        Some(1)
    } else {
        None
    }
}

/// Episode state shared between the event thread and the stepping caller
pub(crate) struct EpisodeState {
    slots: Mutex<EpisodeSlots>,
    signal: Condvar,
}

impl EpisodeState {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(EpisodeSlots::default()),
            signal: Condvar::new(),
        }
    }

    /// Record the connection and wake anyone blocked in `wait_connected`
    pub fn mark_connected(&self) {
        let mut slots = self.slots.lock();
        slots.connected = true;
        self.signal.notify_all();
    }

    pub fn mark_disconnected(&self) {
        let mut slots = self.slots.lock();
        slots.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.slots.lock().connected
    }

    /// Block until the simulator connects, or time out
    pub fn wait_connected(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        while !slots.connected {
            if self.signal.wait_until(&mut slots, deadline).timed_out() {
                if slots.connected {
                    break;
                }
                return Err(Error::ConnectionTimeout);
            }
        }
        Ok(())
    }

    /// Latest recorded control values, sampled by the next telemetry event
    pub fn record_action(&self, steering: f64, throttle: f64) {
        let mut slots = self.slots.lock();
        slots.steering = steering;
        slots.throttle = throttle;
    }

    /// Zero every episode slot and stage the next track for delivery.
    ///
    /// The frame sequence is deliberately left monotonic so a stepping
    /// caller can never mistake a pre-reset frame for a fresh one.
    pub fn reset_episode(&self, staged_track: Option<String>) {
        let mut slots = self.slots.lock();
        slots.frame = None;
        slots.steering = 0.0;
        slots.throttle = 0.0;
        slots.speed = 0.0;
        slots.cte = 0.0;
        slots.cte_pid = 0.0;
        slots.hit = NO_COLLISION.to_string();
        slots.pos = (0.0, 0.0, 0.0);
        slots.done = false;
        slots.success = 0;
        slots.track_delivered = false;
        slots.staged_track = staged_track;
        slots.current_track = None;
    }

    /// Ingest one telemetry message and decide the reply.
    ///
    /// Decoding happens before any slot is touched, so a malformed payload
    /// leaves the episode state exactly as it was.
    pub fn apply_telemetry(
        &self,
        telemetry: &TelemetryPayload,
        decoder: &dyn FrameDecoder,
    ) -> Result<TelemetryReply> {
        let image_bytes = BASE64
            .decode(telemetry.image.as_bytes())
            .map_err(|e| Error::MalformedTelemetry(format!("bad base64 image: {}", e)))?;
        let frame = Arc::new(decoder.decode(&image_bytes)?);

        let mut slots = self.slots.lock();
        slots.speed = telemetry.speed * MS_TO_KMH;
        slots.cte = telemetry.cte;
        slots.cte_pid = telemetry.cte_pid;
        slots.pos = (telemetry.pos_x, telemetry.pos_y, telemetry.pos_z);
        slots.hit = telemetry.hit.clone();
        slots.current_track = Some(telemetry.track.clone());
        slots.frame = Some(frame);
        slots.frame_seq += 1;
        self.signal.notify_all();

        if slots.done {
            return Ok(TelemetryReply::Reset);
        }
        if !slots.track_delivered {
            if let Some(track) = slots.staged_track.clone() {
                slots.track_delivered = true;
                return Ok(TelemetryReply::Track(track));
            }
        }
        Ok(TelemetryReply::Steer {
            steering: slots.steering,
            throttle: slots.throttle,
        })
    }

    /// Block until a frame with a sequence other than `last_seq` is
    /// published, then evaluate termination and snapshot the slots.
    pub fn observe(
        &self,
        last_seq: u64,
        timeout: Duration,
        max_cte_error: f64,
    ) -> Result<EpisodeSnapshot> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();

        loop {
            if let Some(snapshot) = try_snapshot(&mut slots, last_seq, max_cte_error) {
                return Ok(snapshot);
            }
            if self.signal.wait_until(&mut slots, deadline).timed_out() {
                // One re-check covers a wakeup racing the deadline
                return try_snapshot(&mut slots, last_seq, max_cte_error)
                    .ok_or(Error::ConnectionTimeout);
            }
        }
    }

    #[cfg(test)]
    pub fn peek(&self) -> parking_lot::MutexGuard<'_, EpisodeSlots> {
        self.slots.lock()
    }
}

/// Snapshot the slots if a frame fresher than `last_seq` is available,
/// folding the termination verdict back into the shared state.
fn try_snapshot(
    slots: &mut EpisodeSlots,
    last_seq: u64,
    max_cte_error: f64,
) -> Option<EpisodeSnapshot> {
    if slots.frame_seq == last_seq {
        return None;
    }
    let frame = slots.frame.clone()?;

    if let Some(success) = evaluate_termination(slots.cte, &slots.hit, max_cte_error) {
        slots.done = true;
        slots.success = success;
    } else {
        slots.done = false;
    }

    Some(EpisodeSnapshot {
        frame,
        frame_seq: slots.frame_seq,
        done: slots.done,
        success: slots.success,
        track: slots.current_track.clone(),
        speed: slots.speed,
        pos: slots.pos,
        cte: slots.cte,
        cte_pid: slots.cte_pid,
    })
}
