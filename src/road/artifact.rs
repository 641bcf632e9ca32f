//! Serializable road description consumed by the simulator bridge.

use super::node::ControlNode;
use crate::error::{Error, Result};
use crate::geometry::Point2D;
use serde::{Deserialize, Serialize};

/// Final output of a successful generation: the sampled centerline, the raw
/// control points it was derived from, and the fixed road width. Immutable
/// once created; clone to replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadArtifact {
    /// Spline-sampled centerline points, in drive order
    pub road_points: Vec<Point2D>,
    /// Control nodes the centerline was sampled from (anchor excluded)
    pub control_points: Vec<ControlNode>,
    /// Carriageway width applied along the whole road
    pub road_width: f64,
}

impl RoadArtifact {
    /// Serialize to the track string delivered over the telemetry channel
    pub fn to_track_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a track string back into an artifact
    pub fn from_track_string(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Serialization(e.to_string()))
    }
}
