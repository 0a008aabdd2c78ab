//! Engine - owns the graph, the RNG and the configuration, and runs the
//! ordered tick pipeline.
//!
//! ```text
//! tick():  Behavior ──► Diffusion ──► Threat ──► Meta-Critic
//!           (snapshot)   (live, in     (pure)     (observers only)
//!                        edge order)
//! ```
//!
//! There is no ambient state: two engines built from the same seed, config
//! and sequence of calls end in identical states.

use crate::agent::{Agent, Relationship, Role};
use crate::behavior::{self, BehaviorOutcome};
use crate::config::EngineConfig;
use crate::critic;
use crate::diffusion;
use crate::error::{ensure_unit, EngineError};
use crate::graph::Graph;
use crate::threat::{self, GraphStats};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use threatmesh_env::AgentId;

/// Everything one pass of the pipeline produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub behavior: BehaviorOutcome,

    /// Total uncertainty added by diffusion
    pub diffused: f64,

    /// Threat computed after diffusion, fed to the critic
    pub threat: f64,

    /// Observers converted to defender by the critic
    pub converted: Vec<AgentId>,
}

/// The simulation engine.
#[derive(Debug, Clone)]
pub struct Engine {
    graph: Graph,
    rng: ChaCha8Rng,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with an empty graph.
    pub fn new(config: EngineConfig, rng: ChaCha8Rng) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            graph: Graph::new(),
            rng,
            config,
        })
    }

    /// Default configuration, RNG seeded from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            graph: Graph::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config: EngineConfig::default(),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        self.graph.agents()
    }

    pub fn relationships(&self) -> &[Relationship] {
        self.graph.relationships()
    }

    /// Adds an agent with randomized traits.
    ///
    /// Without `initial_uncertainty`, uncertainty is drawn from
    /// `[0, spawn.initial_uncertainty_max)`.
    pub fn add_agent(
        &mut self,
        role: Role,
        initial_uncertainty: Option<f64>,
    ) -> Result<Agent, EngineError> {
        let uncertainty = match initial_uncertainty {
            Some(u) => ensure_unit("uncertainty", u)?,
            None => self.rng.gen::<f64>() * self.config.spawn.initial_uncertainty_max,
        };
        let aggressiveness = self.rng.gen::<f64>();
        let vigilance = self.rng.gen::<f64>();
        self.add_agent_with_traits(role, uncertainty, aggressiveness, vigilance)
    }

    /// Adds an agent with every trait given explicitly.
    pub fn add_agent_with_traits(
        &mut self,
        role: Role,
        uncertainty: f64,
        aggressiveness: f64,
        vigilance: f64,
    ) -> Result<Agent, EngineError> {
        let agent = Agent::new(
            AgentId::from_rng(&mut self.rng),
            role,
            uncertainty,
            aggressiveness,
            vigilance,
        )?;
        self.graph.insert_agent(agent).cloned()
    }

    pub fn add_relationship(
        &mut self,
        source: AgentId,
        target: AgentId,
    ) -> Result<Relationship, EngineError> {
        self.graph.add_relationship(source, target, None)
    }

    pub fn add_weighted_relationship(
        &mut self,
        source: AgentId,
        target: AgentId,
        weight: f64,
    ) -> Result<Relationship, EngineError> {
        self.graph.add_relationship(source, target, Some(weight))
    }

    /// Removes an agent and its relationships.
    pub fn remove_agent(&mut self, id: AgentId) -> Result<Agent, EngineError> {
        self.graph.remove_agent(id)
    }

    /// Adds an agent with randomized traits and links it to a random
    /// existing agent (new agent is the source) with a random weight.
    pub fn add_linked_agent(
        &mut self,
        role: Role,
    ) -> Result<(Agent, Option<Relationship>), EngineError> {
        let existing = self.graph.agent_count();
        let agent = self.add_agent(role, None)?;
        if existing == 0 {
            return Ok((agent, None));
        }

        let target = self.graph.agents()[self.rng.gen_range(0..existing)].id();
        let weight = self.rng.gen::<f64>();
        let relationship = self.add_weighted_relationship(agent.id(), target, weight)?;
        Ok((agent, Some(relationship)))
    }

    /// Seeds the graph with one agent of each role plus `extra` agents of
    /// random role, each linked to an earlier agent.
    pub fn bootstrap(&mut self, extra: usize) -> Result<Vec<AgentId>, EngineError> {
        let mut ids = Vec::with_capacity(Role::ALL.len() + extra);
        for role in Role::ALL {
            ids.push(self.add_linked_agent(role)?.0.id());
        }
        for _ in 0..extra {
            let role = Role::random(&mut self.rng);
            ids.push(self.add_linked_agent(role)?.0.id());
        }
        Ok(ids)
    }

    /// With `probability`, adds a linked attacker or observer (even odds).
    pub fn maybe_grow(&mut self, probability: f64) -> Result<Option<Agent>, EngineError> {
        ensure_unit("growth_probability", probability)?;
        if !self.rng.gen_bool(probability) {
            return Ok(None);
        }
        let role = if self.rng.gen_bool(0.5) {
            Role::Attacker
        } else {
            Role::Observer
        };
        Ok(Some(self.add_linked_agent(role)?.0))
    }

    /// Raises an agent's uncertainty by `probe.bump` and spreads
    /// `probe.spread` of its new value to every neighbor.
    ///
    /// Returns the agent's new uncertainty. Unknown ids leave the graph
    /// unchanged.
    pub fn perturb(&mut self, id: AgentId) -> Result<f64, EngineError> {
        let bump = self.config.probe.bump;
        let spread = self.config.probe.spread;

        let agent = self
            .graph
            .agent_mut(id)
            .ok_or(EngineError::InvalidReference(id))?;
        agent.shift_uncertainty(bump);
        let level = agent.uncertainty();

        for neighbor in self.graph.neighbors(id) {
            if let Some(other) = self.graph.agent_mut(neighbor) {
                other.shift_uncertainty(level * spread);
            }
        }
        Ok(level)
    }

    /// Runs one ordered pass of the pipeline.
    pub fn tick(&mut self) -> TickOutcome {
        let behavior = behavior::apply(&mut self.graph, &mut self.rng, &self.config.behavior);
        let diffused = diffusion::diffuse(&mut self.graph, &self.config.diffusion);
        let threat = threat::predict(&self.graph, &self.config.threat);
        let converted = critic::evaluate(threat, &mut self.graph, &mut self.rng, &self.config.critic);

        TickOutcome {
            behavior,
            diffused,
            threat,
            converted,
        }
    }

    /// Threat score of the current graph.
    pub fn current_threat(&self) -> f64 {
        threat::predict(&self.graph, &self.config.threat)
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats::from_graph(&self.graph)
    }
}
