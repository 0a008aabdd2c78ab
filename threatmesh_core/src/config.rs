//! Engine configuration.
//!
//! Defaults are the reference constants of the model. Every section is
//! `#[serde(default)]` so a config file only needs the values it overrides.

use crate::error::{ensure_unit, EngineError};
use serde::{Deserialize, Serialize};

/// Which behavior model the Behavior Engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorMode {
    /// Attackers/defenders act on neighbors across edges, gated by traits
    #[default]
    EdgeDirected,

    /// Attackers/defenders random-walk their own uncertainty
    SelfWalk,
}

/// Which way uncertainty flows over a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffusionDirection {
    /// Source influences target only
    #[default]
    OneWay,

    /// The rule is applied once per direction
    Bidirectional,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub behavior: BehaviorConfig,
    pub diffusion: DiffusionConfig,
    pub threat: ThreatConfig,
    pub critic: CriticConfig,
    pub probe: ProbeConfig,
    pub spawn: SpawnConfig,
}

/// Role-conditioned behavior parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub mode: BehaviorMode,

    /// Uncertainty an attacker adds to a neighbor per successful action
    pub attack_increment: f64,

    /// Uncertainty a defender removes from a neighbor per successful action
    pub defend_decrement: f64,

    /// Observers above this uncertainty may become defenders
    pub observer_high: f64,

    /// Observers below this uncertainty may become attackers
    pub observer_low: f64,

    /// Per-tick probability of an eligible observer self-transition
    pub observer_flip_probability: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            mode: BehaviorMode::EdgeDirected,
            attack_increment: 0.08,
            defend_decrement: 0.06,
            observer_high: 0.7,
            observer_low: 0.2,
            observer_flip_probability: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Fraction of source uncertainty pushed to the target per tick
    pub rate: f64,
    pub direction: DiffusionDirection,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            rate: 0.05,
            direction: DiffusionDirection::OneWay,
        }
    }
}

/// Weights of the threat score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Weight of mean uncertainty
    pub uncertainty_weight: f64,

    /// Weight of edge density (relationships per agent)
    pub density_weight: f64,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            uncertainty_weight: 0.5,
            density_weight: 0.5,
        }
    }
}

/// Meta-critic feedback parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriticConfig {
    /// Threat strictly above this value activates the critic
    pub threshold: f64,

    /// Per-observer conversion probability when active
    pub conversion_probability: f64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            conversion_probability: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Uncertainty added to the probed agent
    pub bump: f64,

    /// Fraction of the probed agent's uncertainty pushed to each neighbor
    pub spread: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            bump: 0.15,
            spread: 0.1,
        }
    }
}

/// Randomized initial state for new agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Initial uncertainty is drawn from [0, initial_uncertainty_max)
    pub initial_uncertainty_max: f64,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            initial_uncertainty_max: 0.4,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Checks every rate, weight and probability against [0, 1].
    pub fn validate(&self) -> Result<(), EngineError> {
        let b = &self.behavior;
        ensure_unit("behavior.attack_increment", b.attack_increment)?;
        ensure_unit("behavior.defend_decrement", b.defend_decrement)?;
        ensure_unit("behavior.observer_high", b.observer_high)?;
        ensure_unit("behavior.observer_low", b.observer_low)?;
        ensure_unit("behavior.observer_flip_probability", b.observer_flip_probability)?;
        // Overlapping thresholds would make both transitions eligible at once
        if b.observer_low > b.observer_high {
            return Err(EngineError::parameter("behavior.observer_low", b.observer_low));
        }

        ensure_unit("diffusion.rate", self.diffusion.rate)?;
        ensure_unit("threat.uncertainty_weight", self.threat.uncertainty_weight)?;
        ensure_unit("threat.density_weight", self.threat.density_weight)?;
        ensure_unit("critic.threshold", self.critic.threshold)?;
        ensure_unit("critic.conversion_probability", self.critic.conversion_probability)?;
        ensure_unit("probe.bump", self.probe.bump)?;
        ensure_unit("probe.spread", self.probe.spread)?;
        ensure_unit("spawn.initial_uncertainty_max", self.spawn.initial_uncertainty_max)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.behavior.mode, BehaviorMode::EdgeDirected);
        assert_eq!(config.diffusion.direction, DiffusionDirection::OneWay);
        assert_eq!(config.critic.threshold, 0.6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "threat": { "uncertainty_weight": 0.6, "density_weight": 0.4 },
                 "behavior": { "mode": "self_walk" } }"#,
        )
        .unwrap();

        assert_eq!(config.threat.uncertainty_weight, 0.6);
        assert_eq!(config.behavior.mode, BehaviorMode::SelfWalk);
        assert_eq!(config.behavior.attack_increment, 0.08);
        assert_eq!(config.diffusion.rate, 0.05);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.critic.conversion_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(EngineError::InvalidParameter { name: "critic.conversion_probability", .. })
        ));

        let mut config = EngineConfig::default();
        config.behavior.observer_low = 0.8;
        assert!(config.validate().is_err());
    }
}
