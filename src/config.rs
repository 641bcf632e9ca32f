//! Configuration for the marga-sim harness
//!
//! Loads configuration from a TOML file. Every section has defaults matching
//! the Udacity-style simulator setup, so a missing file is never fatal for
//! development use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level harness configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
    pub camera: CameraConfig,
    pub episode: EpisodeConfig,
    pub road: RoadConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Camera sensor dimensions (height x width x channels)
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl CameraConfig {
    /// Byte length of one raw frame at these dimensions
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

/// Episode lifecycle parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct EpisodeConfig {
    /// Cross-track error magnitude that terminates the episode
    pub max_cte_error: f64,
    /// Settling delay after `reset()` before telemetry is trusted again
    pub reset_settle_ms: u64,
    /// Settling delay after a track delivery, letting the simulator load it
    pub track_settle_ms: u64,
    /// How long `observe()` waits for a fresh frame before erroring
    pub observe_timeout_ms: u64,
    /// How long `start()` waits for the simulator's first connection
    pub connect_timeout_ms: u64,
}

/// Road generator parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoadConfig {
    /// Side length of the (square) simulator map, in world units
    pub map_size: u32,
    /// Number of control nodes grown beyond the two seed nodes
    pub num_control_nodes: usize,
    /// Maximum turning offset per node, in integer degrees
    pub max_angle: i64,
    /// Distance between consecutive control nodes
    pub seg_length: f64,
    /// Spline samples per control segment
    pub num_spline_nodes: usize,
    /// Starting pose of the road: x, y, z, width
    pub initial_node: [f64; 4],
    /// Map boundary as min_x, min_y, max_x, max_y.
    /// Defaults to the map_size square when omitted.
    pub bbox: Option<[f64; 4]>,
    /// RNG seed; 0 uses random entropy
    pub seed: u64,
    /// Whole-chain restarts permitted before generation fails
    pub max_restart_attempts: u32,
}

impl RoadConfig {
    /// Boundary extents, falling back to the map_size square
    pub fn bbox_extents(&self) -> [f64; 4] {
        self.bbox
            .unwrap_or([0.0, 0.0, self.map_size as f64, self.map_size as f64])
    }
}

/// Simulator-facing network configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address the simulator connects to
    ///
    /// Examples:
    /// - `0.0.0.0:9091` - Bind to all interfaces on port 9091
    /// - `127.0.0.1:9091` - Localhost only
    pub bind_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout, stderr, or file path)
    pub output: String,
}

impl HarnessConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: HarnessConfig =
            toml::from_str(&contents).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration for the Udacity-style track simulator
    ///
    /// Suitable for testing and development. Production deployments
    /// should use a proper TOML configuration file.
    pub fn udacity_defaults() -> Self {
        Self {
            camera: CameraConfig {
                width: 320,
                height: 160,
                channels: 3,
            },
            episode: EpisodeConfig {
                max_cte_error: 3.0,
                reset_settle_ms: 1000,
                track_settle_ms: 500,
                observe_timeout_ms: 10_000,
                connect_timeout_ms: 60_000,
            },
            road: RoadConfig {
                map_size: 250,
                num_control_nodes: 8,
                max_angle: 270,
                seg_length: 25.0,
                num_spline_nodes: 20,
                initial_node: [125.0, 0.0, -28.0, 4.0],
                bbox: None,
                seed: 0,
                max_restart_attempts: 50,
            },
            network: NetworkConfig {
                bind_address: "0.0.0.0:9091".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::udacity_defaults()
    }
}
