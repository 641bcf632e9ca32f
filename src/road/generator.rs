//! Constrained random road generation.
//!
//! Grows a control-node chain by appending candidate nodes at fixed segment
//! length and bounded random heading offsets, validating the width-extruded
//! polygon of every prefix against the map boundary. Rejections retry in
//! place against a per-node budget, back off one accepted node when the
//! budget runs dry, and discard the whole chain when the undo budget is
//! spent. Whole-chain restarts are bounded; exhausting them surfaces a
//! configuration error instead of looping forever.

use super::artifact::RoadArtifact;
use super::node::ControlNode;
use crate::config::RoadConfig;
use crate::error::{Error, Result};
use crate::geometry::{catmull_rom_chain, BoundingBox, Point2D, RoadPolygon};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Nodes at the start of the chain that must continue straight
const NUM_INITIAL_SEGMENTS_THRESHOLD: usize = 2;

/// In-place retries permitted per skeleton before it is discarded
const NUM_UNDO_ATTEMPTS: u32 = 20;

/// Fixed heading from the initial node to the synthetic anchor
const ANCHOR_HEADING_DEG: f64 = 270.0;

/// Procedural road generator. One instance per experiment; reseed via
/// config for reproducible runs.
pub struct RoadGenerator {
    num_control_nodes: usize,
    num_spline_nodes: usize,
    max_angle: i64,
    seg_length: f64,
    initial_node: ControlNode,
    bbox: BoundingBox,
    max_restart_attempts: u32,
    rng: SmallRng,
    staged_road: Option<RoadArtifact>,
    previous_road: Option<RoadArtifact>,
}

impl RoadGenerator {
    /// Create a generator, validating the configuration.
    ///
    /// The synthetic anchor (one segment from the initial node at 270
    /// degrees) must lie outside the bounding box; that precondition is
    /// checked here once, not on every `generate` call.
    pub fn new(config: &RoadConfig) -> Result<Self> {
        if config.num_control_nodes < 3 {
            return Err(Error::InvalidConfig(
                "num_control_nodes must be at least 3".to_string(),
            ));
        }
        if config.num_spline_nodes == 0 {
            return Err(Error::InvalidConfig(
                "num_spline_nodes must be positive".to_string(),
            ));
        }
        if !(0..=360).contains(&config.max_angle) {
            return Err(Error::InvalidConfig(format!(
                "max_angle must be within 0..=360, got {}",
                config.max_angle
            )));
        }
        if config.seg_length <= 0.0 {
            return Err(Error::InvalidConfig(
                "seg_length must be positive".to_string(),
            ));
        }
        if config.max_restart_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_restart_attempts must be positive".to_string(),
            ));
        }

        let bbox = BoundingBox::from_extents(config.bbox_extents())?;
        let [x, y, z, width] = config.initial_node;

        let rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };

        let generator = Self {
            num_control_nodes: config.num_control_nodes,
            num_spline_nodes: config.num_spline_nodes,
            max_angle: config.max_angle,
            seg_length: config.seg_length,
            initial_node: ControlNode::new(x, y, z, width),
            bbox,
            max_restart_attempts: config.max_restart_attempts,
            rng,
            staged_road: None,
            previous_road: None,
        };

        let anchor = generator.anchor_node();
        if generator.bbox.contains_point(anchor.position()) {
            return Err(Error::InvalidConfig(format!(
                "anchor node ({:.1}, {:.1}) must lie outside the bounding box",
                anchor.x, anchor.y
            )));
        }

        Ok(generator)
    }

    /// Tighten or relax the turning budget between generations
    pub fn set_max_angle(&mut self, max_angle: i64) -> Result<()> {
        if max_angle <= 0 {
            return Err(Error::InvalidParameter(format!(
                "max_angle must be > 0, got {}",
                max_angle
            )));
        }
        self.max_angle = max_angle;
        Ok(())
    }

    /// Stage a specific road to be replayed by the next `generate` call
    pub fn stage_road(&mut self, artifact: RoadArtifact) {
        self.staged_road = Some(artifact);
    }

    /// The most recently generated road, if any
    pub fn previous_road(&self) -> Option<&RoadArtifact> {
        self.previous_road.as_ref()
    }

    /// The synthetic anchor node seeding every chain; outside the map by
    /// construction and never part of the returned artifact.
    pub fn anchor_node(&self) -> ControlNode {
        let (x, y) = self.next_xy(self.initial_node.x, self.initial_node.y, ANCHOR_HEADING_DEG);
        ControlNode::new(x, y, self.initial_node.z, self.initial_node.width)
    }

    /// Produce a geometrically valid road.
    ///
    /// If a road was staged for replay, a copy of it is returned and the
    /// staged slot cleared, bypassing generation entirely.
    pub fn generate(&mut self) -> Result<RoadArtifact> {
        if let Some(staged) = self.staged_road.take() {
            log::info!(
                "RoadGenerator: replaying staged road ({} sample points)",
                staged.road_points.len()
            );
            return Ok(staged);
        }

        let mut restarts = 0u32;
        loop {
            if let Some(nodes) = self.try_generate_control_nodes() {
                // The anchor exists only to aim the first segment
                let control: Vec<ControlNode> = nodes[1..].to_vec();
                let middle: Vec<Point2D> = control.iter().map(|n| n.position()).collect();

                match catmull_rom_chain(&middle, self.num_spline_nodes) {
                    Ok(samples) => {
                        if self.road_is_valid(&control, &samples) {
                            let artifact = RoadArtifact {
                                road_points: samples,
                                control_points: control,
                                road_width: self.initial_node.width,
                            };
                            self.previous_road = Some(artifact.clone());
                            log::debug!(
                                "RoadGenerator: generated road with {} control nodes after {} restarts",
                                artifact.control_points.len(),
                                restarts
                            );
                            return Ok(artifact);
                        }
                        log::debug!("RoadGenerator: sampled road failed validation, restarting");
                    }
                    Err(e) => {
                        log::debug!("RoadGenerator: spline rejected chain: {}", e);
                    }
                }
            } else {
                log::debug!("RoadGenerator: skeleton undo budget exhausted, restarting");
            }

            restarts += 1;
            if restarts >= self.max_restart_attempts {
                log::error!(
                    "RoadGenerator: giving up after {} restarts; constraints look unsatisfiable",
                    restarts
                );
                return Err(Error::ConstraintUnsatisfiable { attempts: restarts });
            }
        }
    }

    /// One skeleton attempt: grow the chain to the configured node count
    /// within the undo budget, or report failure for a full restart.
    fn try_generate_control_nodes(&mut self) -> Option<Vec<ControlNode>> {
        let mut nodes = vec![self.anchor_node(), self.initial_node];
        let mut i_valid: usize = 0;
        let mut attempt: u32 = 0;

        while i_valid < self.num_control_nodes && attempt <= NUM_UNDO_ATTEMPTS {
            let candidate = self.next_node(
                nodes[nodes.len() - 2],
                nodes[nodes.len() - 1],
                self.next_max_angle(i_valid),
            );
            nodes.push(candidate);

            // Retries left for this node before the previous one is undone
            let mut budget = self.num_control_nodes - i_valid;
            let mut valid = self.prefix_is_valid(&nodes, i_valid);

            while !valid && budget > 0 {
                nodes.pop();
                budget -= 1;
                attempt += 1;

                let candidate = self.next_node(
                    nodes[nodes.len() - 2],
                    nodes[nodes.len() - 1],
                    self.next_max_angle(i_valid),
                );
                nodes.push(candidate);
                valid = self.prefix_is_valid(&nodes, i_valid);
            }

            if valid {
                i_valid += 1;
            } else {
                nodes.pop();
                if nodes.len() > 2 {
                    // Back off one full step: the previous node boxed us in
                    nodes.pop();
                    i_valid = i_valid.saturating_sub(1);
                }
            }
        }

        if nodes.len() - 2 == self.num_control_nodes {
            Some(nodes)
        } else {
            None
        }
    }

    /// Validity of the chain prefix ending at the newest candidate: the
    /// extrusion must be simple, and its last quad must touch the boundary
    /// iff this is the very first appended node.
    fn prefix_is_valid(&self, nodes: &[ControlNode], i_valid: usize) -> bool {
        let polygon = RoadPolygon::from_nodes(nodes);
        if !polygon.is_simple() {
            return false;
        }
        let touches = match polygon.last_quad() {
            Some(quad) => self.bbox.intersects_boundary(&quad),
            None => return false,
        };
        if i_valid == 0 {
            touches
        } else {
            !touches
        }
    }

    /// Final acceptance: the sampled centerline extrusion is simple and the
    /// interior control nodes (first and last excluded) lie inside the map.
    fn road_is_valid(&self, control: &[ControlNode], samples: &[Point2D]) -> bool {
        let sampled = RoadPolygon::from_centerline(samples, self.initial_node.width);
        let interior = RoadPolygon::from_nodes(&control[1..control.len() - 1]);
        sampled.is_simple() && self.bbox.contains_polygon(&interior)
    }

    /// Candidate node: previous heading plus a uniform integer offset in
    /// [-max_angle, +max_angle] degrees, at fixed segment length.
    fn next_node(&mut self, first: ControlNode, second: ControlNode, max_angle: i64) -> ControlNode {
        let vx = second.x - first.x;
        let vy = second.y - first.y;
        let start_angle = vy.atan2(vx).to_degrees() as i64;
        let angle = self
            .rng
            .gen_range(start_angle - max_angle..=start_angle + max_angle);
        let (x, y) = self.next_xy(second.x, second.y, angle as f64);
        ControlNode::new(x, y, second.z, second.width)
    }

    #[inline]
    fn next_xy(&self, x0: f64, y0: f64, angle_deg: f64) -> (f64, f64) {
        let rad = angle_deg.to_radians();
        (
            x0 + self.seg_length * rad.cos(),
            y0 + self.seg_length * rad.sin(),
        )
    }

    /// The first two nodes and the final node may not turn at all
    fn next_max_angle(&self, i: usize) -> i64 {
        if i < NUM_INITIAL_SEGMENTS_THRESHOLD || i == self.num_control_nodes - 1 {
            0
        } else {
            self.max_angle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoadConfig;

    fn test_config() -> RoadConfig {
        RoadConfig {
            map_size: 250,
            num_control_nodes: 8,
            max_angle: 60,
            seg_length: 25.0,
            num_spline_nodes: 20,
            initial_node: [125.0, 0.0, -28.0, 4.0],
            bbox: None,
            seed: 42,
            max_restart_attempts: 50,
        }
    }

    #[test]
    fn test_anchor_node_position() {
        let generator = RoadGenerator::new(&test_config()).unwrap();
        let anchor = generator.anchor_node();
        // cos 270 = 0, sin 270 = -1 (up to double-precision rounding)
        assert!((anchor.x - 125.0).abs() < 1e-9);
        assert!((anchor.y - -25.0).abs() < 1e-9);
        assert_eq!(anchor.z, -28.0);
        assert_eq!(anchor.width, 4.0);
    }

    #[test]
    fn test_anchor_outside_box_is_enforced() {
        let mut config = test_config();
        // Initial node deep inside the map keeps the anchor inside too
        config.initial_node = [125.0, 125.0, -28.0, 4.0];
        assert!(matches!(
            RoadGenerator::new(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_straight_segment_budget() {
        let generator = RoadGenerator::new(&test_config()).unwrap();
        assert_eq!(generator.next_max_angle(0), 0);
        assert_eq!(generator.next_max_angle(1), 0);
        assert_eq!(generator.next_max_angle(2), 60);
        assert_eq!(generator.next_max_angle(7), 0); // final node
    }

    #[test]
    fn test_next_node_with_zero_angle_continues_straight() {
        let mut generator = RoadGenerator::new(&test_config()).unwrap();
        let first = ControlNode::new(0.0, 0.0, -28.0, 4.0);
        let second = ControlNode::new(25.0, 0.0, -28.0, 4.0);
        let next = generator.next_node(first, second, 0);
        assert_eq!(next.x, 50.0);
        assert_eq!(next.y, 0.0);
        assert_eq!(next.z, -28.0);
        assert_eq!(next.width, 4.0);
    }

    #[test]
    fn test_generated_road_is_valid() {
        let config = test_config();
        let mut generator = RoadGenerator::new(&config).unwrap();
        let artifact = generator.generate().unwrap();

        // One sample run per window plus the closing knot
        let expected = (config.num_control_nodes + 1 - 3) * config.num_spline_nodes + 1;
        assert_eq!(artifact.road_points.len(), expected);
        assert_eq!(
            artifact.control_points.len(),
            config.num_control_nodes + 1
        );
        assert_eq!(artifact.road_width, 4.0);

        // The anchor never appears: the artifact starts at the initial node
        let first = artifact.control_points[0];
        assert_eq!((first.x, first.y), (125.0, 0.0));

        // Invariants the generator promises
        let bbox = BoundingBox::from_extents(config.bbox_extents()).unwrap();
        let sampled = RoadPolygon::from_centerline(&artifact.road_points, artifact.road_width);
        assert!(sampled.is_simple());

        let n = artifact.control_points.len();
        let interior = RoadPolygon::from_nodes(&artifact.control_points[1..n - 1]);
        assert!(bbox.contains_polygon(&interior));

        assert!(!bbox.contains_point(generator.anchor_node().position()));
    }

    #[test]
    fn test_deterministic_under_fixed_seed() {
        let config = test_config();
        let a = RoadGenerator::new(&config).unwrap().generate().unwrap();
        let b = RoadGenerator::new(&config).unwrap().generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_previous_road_is_retained() {
        let mut generator = RoadGenerator::new(&test_config()).unwrap();
        assert!(generator.previous_road().is_none());
        let artifact = generator.generate().unwrap();
        assert_eq!(generator.previous_road(), Some(&artifact));
    }

    #[test]
    fn test_replay_returns_staged_copies() {
        let mut generator = RoadGenerator::new(&test_config()).unwrap();
        let original = generator.generate().unwrap();

        generator.stage_road(original.clone());
        let mut first = generator.generate().unwrap();
        generator.stage_road(original.clone());
        let second = generator.generate().unwrap();

        assert_eq!(first, original);
        assert_eq!(second, original);

        // Returned copies are storage-independent
        first.road_points.clear();
        assert_eq!(second, original);
    }

    #[test]
    fn test_staged_slot_is_cleared_after_replay() {
        let config = test_config();
        let mut generator = RoadGenerator::new(&config).unwrap();
        let original = generator.generate().unwrap();

        generator.stage_road(original.clone());
        let replayed = generator.generate().unwrap();
        assert_eq!(replayed, original);

        // Next call falls back to random generation
        let fresh = generator.generate().unwrap();
        assert_ne!(fresh, original);
    }

    #[test]
    fn test_unsatisfiable_constraints_surface_an_error() {
        let mut config = test_config();
        // Segments longer than the map cannot stay inside it
        config.seg_length = 300.0;
        config.max_angle = 0;
        config.max_restart_attempts = 5;
        config.seed = 1;

        let mut generator = RoadGenerator::new(&config).unwrap();
        assert!(matches!(
            generator.generate(),
            Err(Error::ConstraintUnsatisfiable { attempts: 5 })
        ));
    }

    #[test]
    fn test_set_max_angle_rejects_non_positive() {
        let mut generator = RoadGenerator::new(&test_config()).unwrap();
        assert!(generator.set_max_angle(0).is_err());
        assert!(generator.set_max_angle(45).is_ok());
    }
}
