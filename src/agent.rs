//! Driving-policy contract.
//!
//! The policy under test is a black box to this crate: one decoded camera
//! frame in, one action out. Nothing else couples the harness to the agent.

use crate::bridge::CameraFrame;

/// One control step: steering angle and throttle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Action {
    pub steering: f64,
    pub throttle: f64,
}

/// A driving policy under test
pub trait DrivingAgent: Send {
    /// Map one camera frame to the next control action
    fn act(&mut self, frame: &CameraFrame) -> Action;
}
