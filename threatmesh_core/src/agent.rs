//! Agents, roles and relationships: the nodes and edges of the threat graph.

use crate::error::{ensure_unit, EngineError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use threatmesh_env::AgentId;

/// Clamps a value into [0, 1]. NaN maps to 0.
///
/// Every uncertainty write in the engine goes through this helper.
#[inline]
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Behavioral role of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Raises neighbor uncertainty, gated by aggressiveness
    Attacker,

    /// Lowers neighbor uncertainty, gated by vigilance
    Defender,

    /// No neighbor effect; may self-transition to another role
    Observer,
}

impl Role {
    /// All roles, in canonical order.
    pub const ALL: [Role; 3] = [Role::Attacker, Role::Defender, Role::Observer];

    /// Returns the role name.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Attacker => "attacker",
            Role::Defender => "defender",
            Role::Observer => "observer",
        }
    }

    /// Picks a role uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Role {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "attacker" => Ok(Role::Attacker),
            "defender" => Ok(Role::Defender),
            "observer" => Ok(Role::Observer),
            _ => Err(EngineError::InvalidRole(s.to_string())),
        }
    }
}

/// A node of the threat graph.
///
/// `id`, `aggressiveness` and `vigilance` are fixed at creation. `role` and
/// `uncertainty` only change through the engine, and uncertainty is clamped
/// on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    role: Role,
    uncertainty: f64,
    aggressiveness: f64,
    vigilance: f64,
}

impl Agent {
    /// Creates a new agent, validating every trait against [0, 1].
    pub fn new(
        id: AgentId,
        role: Role,
        uncertainty: f64,
        aggressiveness: f64,
        vigilance: f64,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            id,
            role,
            uncertainty: ensure_unit("uncertainty", uncertainty)?,
            aggressiveness: ensure_unit("aggressiveness", aggressiveness)?,
            vigilance: ensure_unit("vigilance", vigilance)?,
        })
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn uncertainty(&self) -> f64 {
        self.uncertainty
    }

    /// Probability that an attacker acts on a given edge.
    pub fn aggressiveness(&self) -> f64 {
        self.aggressiveness
    }

    /// Probability that a defender acts on a given edge.
    pub fn vigilance(&self) -> f64 {
        self.vigilance
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn set_uncertainty(&mut self, value: f64) {
        self.uncertainty = clamp01(value);
    }

    /// Adds `delta` to uncertainty (clamped) and returns the applied change.
    pub(crate) fn shift_uncertainty(&mut self, delta: f64) -> f64 {
        let before = self.uncertainty;
        self.set_uncertainty(before + delta);
        self.uncertainty - before
    }
}

/// An edge of the threat graph.
///
/// Diffusion flows from `source` to `target`; behavior actions treat the
/// edge as symmetric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    source: AgentId,
    target: AgentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    weight: Option<f64>,
}

impl Relationship {
    /// Creates a relationship. Endpoint existence is checked by the graph.
    pub fn new(source: AgentId, target: AgentId, weight: Option<f64>) -> Result<Self, EngineError> {
        if source == target {
            return Err(EngineError::SelfLoop(source));
        }
        let weight = weight.map(|w| ensure_unit("weight", w)).transpose()?;
        Ok(Self { source, target, weight })
    }

    pub fn source(&self) -> AgentId {
        self.source
    }

    pub fn target(&self) -> AgentId {
        self.target
    }

    /// Reserved for propagation scaling; not read by the engine.
    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Returns true if `id` is either endpoint.
    pub fn touches(&self, id: AgentId) -> bool {
        self.source == id || self.target == id
    }

    /// Returns the endpoint opposite `id`, if `id` is an endpoint.
    pub fn other(&self, id: AgentId) -> Option<AgentId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}
