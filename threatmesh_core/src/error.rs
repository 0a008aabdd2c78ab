//! Error types for the ThreatMesh engine.

use thiserror::Error;
use threatmesh_env::AgentId;

/// Errors surfaced by graph mutation and engine configuration.
///
/// None of these are raised mid-tick: validation happens before any
/// mutation, so a failed call leaves the graph unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Operation referenced an agent that is not in the graph
    #[error("Invalid reference: no agent with id {0}")]
    InvalidReference(AgentId),

    /// Role name outside {attacker, defender, observer}
    #[error("Invalid role: {0:?}")]
    InvalidRole(String),

    /// A probability, trait or rate outside [0, 1] (or not finite)
    #[error("Invalid parameter {name}: {value} is not in [0, 1]")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Relationship whose endpoints are the same agent
    #[error("Self loop on agent {0}")]
    SelfLoop(AgentId),

    /// Agent id already present in the graph
    #[error("Duplicate agent id {0}")]
    DuplicateAgent(AgentId),

    /// Automatic pacing needs a non-zero tick interval
    #[error("Tick interval must be greater than zero")]
    ZeroInterval,
}

impl EngineError {
    /// Creates an invalid parameter error.
    pub fn parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}

/// Checks that `value` is a finite number in [0, 1].
pub fn ensure_unit(name: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(EngineError::parameter(name, value))
    }
}
