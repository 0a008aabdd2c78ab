//! SimWorld - the simulation harness container.

use crate::context::SimContext;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use threatmesh_core::error::ensure_unit;
use threatmesh_core::{AgentId, Engine, EngineConfig, EngineError, Scheduler, TickReport};
use threatmesh_env::EngineContext;
use tracing::debug;

/// RNG stream the engine draws from.
pub const ENGINE_STREAM: u64 = 0x7468_7265_6174;

/// Errors raised while loading or validating a simulation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] EngineError),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual time between ticks in milliseconds
    pub tick_interval_ms: u64,

    /// Random-role agents added on top of the attacker/defender/observer trio
    pub bootstrap_extra: usize,

    /// Per-tick probability of adding a linked attacker or observer
    pub growth_probability: f64,

    /// Engine parameters
    pub engine: EngineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_interval_ms: 1200,
            bootstrap_extra: 0,
            growth_probability: 0.0,
            engine: EngineConfig::default(),
        }
    }
}

impl SimConfig {
    /// Loads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_ms == 0 {
            return Err(EngineError::ZeroInterval);
        }
        ensure_unit("growth_probability", self.growth_probability)?;
        self.engine.validate()
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// The SimWorld - a scheduler on a virtual clock.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    scheduler: Scheduler,
}

impl SimWorld {
    /// Creates a new SimWorld with an empty graph.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let context = SimContext::shared(config.seed);
        let engine = Engine::new(config.engine.clone(), context.derive_rng(ENGINE_STREAM))?;

        Ok(Self {
            config,
            context,
            scheduler: Scheduler::new(engine),
        })
    }

    /// Seeds the graph with the attacker/defender/observer trio plus
    /// `bootstrap_extra` random agents.
    pub fn bootstrap(&mut self) -> Result<Vec<AgentId>, EngineError> {
        self.scheduler
            .engine_mut()
            .bootstrap(self.config.bootstrap_extra)
    }

    /// Advances the virtual clock by one interval, grows the graph, and
    /// runs one tick.
    pub fn tick(&mut self) -> Result<TickReport, EngineError> {
        self.context.advance_time(self.config.tick_interval());

        if let Some(agent) = self
            .scheduler
            .engine_mut()
            .maybe_grow(self.config.growth_probability)?
        {
            debug!(agent = %agent.id(), role = %agent.role(), "graph grew");
        }

        Ok(self.scheduler.step())
    }

    /// Runs `n` ticks.
    pub fn run(&mut self, n: u64) -> Result<Vec<TickReport>, EngineError> {
        (0..n).map(|_| self.tick()).collect()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Hands the scheduler to another pacer (e.g. a live driver). The
    /// configured growth carries over to its automatic ticks.
    pub fn into_scheduler(mut self) -> Result<Scheduler, EngineError> {
        self.scheduler
            .set_growth_probability(self.config.growth_probability)?;
        Ok(self.scheduler)
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.scheduler.tick_count()
    }

    /// Returns the number of agents in the graph.
    pub fn agent_count(&self) -> usize {
        self.scheduler.agents().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sim_world_bootstrap() {
        let config = SimConfig {
            bootstrap_extra: 4,
            ..Default::default()
        };

        let mut world = SimWorld::new(config).unwrap();
        let ids = world.bootstrap().unwrap();

        assert_eq!(ids.len(), 7);
        assert_eq!(world.agent_count(), 7);
    }

    #[test]
    fn test_sim_world_tick() {
        let config = SimConfig {
            tick_interval_ms: 500,
            ..Default::default()
        };

        let mut world = SimWorld::new(config).unwrap();
        world.bootstrap().unwrap();

        assert_eq!(world.tick_count(), 0);
        assert_eq!(world.time(), 0.0);

        world.tick().unwrap();

        assert_eq!(world.tick_count(), 1);
        assert_relative_eq!(world.time(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_sim_world_determinism() {
        let run = || {
            let mut world = SimWorld::new(SimConfig {
                bootstrap_extra: 3,
                growth_probability: 0.3,
                ..Default::default()
            })
            .unwrap();
            world.bootstrap().unwrap();
            world.run(40).unwrap();
            world.scheduler().engine().graph().clone()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_into_scheduler_keeps_growth() {
        let mut world = SimWorld::new(SimConfig {
            growth_probability: 1.0,
            ..Default::default()
        })
        .unwrap();
        world.bootstrap().unwrap();

        let mut scheduler = world.into_scheduler().unwrap();
        assert_eq!(scheduler.growth_probability(), 1.0);

        scheduler.start(Duration::from_millis(100)).unwrap();
        scheduler.advance(Duration::from_millis(500));
        assert_eq!(scheduler.tick_count(), 5);
        assert_eq!(scheduler.agents().len(), 8);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero = SimConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            SimWorld::new(zero),
            Err(ConfigError::Invalid(EngineError::ZeroInterval))
        ));

        let growth = SimConfig {
            growth_probability: 1.5,
            ..Default::default()
        };
        assert!(SimWorld::new(growth).is_err());
    }

    #[test]
    fn test_config_from_file() {
        let path = std::env::temp_dir().join(format!("threatmesh-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "seed": 9, "growth_probability": 0.2, "engine": { "critic": { "threshold": 0.65 } } }"#,
        )
        .unwrap();

        let config = SimConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.seed, 9);
        assert_eq!(config.tick_interval_ms, 1200);
        assert_eq!(config.engine.critic.threshold, 0.65);
        assert_eq!(config.engine.critic.conversion_probability, 0.2);
    }
}
