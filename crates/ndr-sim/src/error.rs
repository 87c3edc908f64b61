//! Error types for the simulator

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// No model of that name in the database
    #[error("unknown radio model {0}")]
    UnknownModel(String),
}
