//! Error types
//!
//! Everything that can go wrong is caught when a scenario is built or when a
//! caller hands `step` a malformed action. Ticks themselves never fail.

use thiserror::Error;

/// Errors raised while building a scenario or stepping it.
#[derive(Debug, Error)]
pub enum SimError {
    /// A scenario value is out of range or inconsistent with another.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A JSON scenario could not be parsed (includes unknown variant tags).
    #[error("failed to parse scenario: {0}")]
    ConfigParse(#[from] serde_json::Error),
    /// No preset with this name exists.
    #[error("unknown scenario preset: {0}")]
    UnknownPreset(String),
    /// The action does not fit the scenario's controllable agents.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}
