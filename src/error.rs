//! Error types for marga-sim

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// marga-sim error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Road constraints could not be satisfied within the retry budget
    #[error("road constraints unsatisfiable after {attempts} generation restarts")]
    ConstraintUnsatisfiable {
        /// Number of whole-chain restarts consumed before giving up
        attempts: u32,
    },

    /// Timed out waiting for the simulator to connect or produce a frame
    #[error("timed out waiting for the simulator")]
    ConnectionTimeout,

    /// The simulator dropped the connection
    #[error("simulator disconnected")]
    Disconnected,

    /// Inbound telemetry was missing fields or carried an undecodable payload
    #[error("malformed telemetry: {0}")]
    MalformedTelemetry(String),

    /// Wire serialization or deserialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected at construction time
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A channel endpoint has been dropped
    #[error("channel closed")]
    ChannelClosed,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
