//! Result and Error types for the crate.
use thiserror::Error;

/// Result containing an error variant from this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Simulator error variants
#[derive(Error, Debug)]
pub enum Error {
    /// An action or query referenced a robot that does not exist.
    #[error("robot index {index} out of range ({count} robots)")]
    InvalidIndex { index: usize, count: usize },

    /// A synchronous state query is already waiting for its answer.
    #[error("another state query is already in flight")]
    QueryBusy,

    /// The simulation loop is gone, so nothing can answer.
    #[error("simulation loop is not running")]
    SimulationStopped,

    /// Arena or world setup that cannot be simulated.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON error, this wraps a [serde_json::Error]
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// IO error, this wraps a [std::io::Error]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
