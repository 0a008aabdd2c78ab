//! Scenario runner - executes deterministic engine scenarios.

use crate::scenarios::ScenarioId;
use crate::world::{ConfigError, SimConfig, SimWorld};

use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use threatmesh_core::{AgentId, EngineError, Graph, Role, TickReport};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    #[serde(serialize_with = "serialize_scenario")]
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Threat score at the end of the run
    pub final_threat: f64,

    /// Number of agents at end
    pub final_agent_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

fn serialize_scenario<S: serde::Serializer>(id: &ScenarioId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(id.name())
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioMetrics {
    /// Successful attacker actions
    pub attacks: u64,

    /// Successful defender actions
    pub defenses: u64,

    /// Observer self-transitions
    pub role_changes: u64,

    /// Meta-critic conversions
    pub conversions: u64,

    /// Highest threat seen after any tick
    pub max_threat: f64,

    threat_sum: f64,
    ticks_observed: u64,

    /// Ticks that left a threat or uncertainty outside [0, 1]
    pub invariant_violations: u64,
}

impl ScenarioMetrics {
    fn record(&mut self, report: &TickReport, graph: &Graph) {
        self.attacks += u64::from(report.attacks);
        self.defenses += u64::from(report.defenses);
        self.role_changes += report.role_changes.len() as u64;
        self.conversions += report.converted.len() as u64;
        self.max_threat = self.max_threat.max(report.threat);
        self.threat_sum += report.threat;
        self.ticks_observed += 1;

        let in_unit = |x: f64| (0.0..=1.0).contains(&x);
        if !in_unit(report.threat) || graph.agents().iter().any(|a| !in_unit(a.uncertainty())) {
            self.invariant_violations += 1;
        }
    }

    /// Mean threat over observed ticks.
    pub fn mean_threat(&self) -> f64 {
        if self.ticks_observed == 0 {
            0.0
        } else {
            self.threat_sum / self.ticks_observed as f64
        }
    }

    pub fn ticks_observed(&self) -> u64 {
        self.ticks_observed
    }
}

/// Errors that stop a scenario before its assertions run.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Scenario setup failed: {0}")]
    Engine(#[from] EngineError),
}

/// Pass/fail decision for one run.
struct Verdict {
    passed: bool,
    failure_reason: Option<String>,
}

impl Verdict {
    fn check(passed: bool, reason: impl FnOnce() -> String) -> Self {
        Self {
            passed,
            failure_reason: (!passed).then(reason),
        }
    }
}

/// Runs engine scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Ticks per scenario (some scenarios enforce a minimum)
    ticks: u64,

    /// Base simulation config; the seed is always overridden
    config: SimConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ticks: 100,
            config: SimConfig::default(),
        }
    }

    /// Sets the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Sets the base configuration.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let outcome = match scenario {
            ScenarioId::Duel => self.run_duel(),
            ScenarioId::Empty => self.run_empty(),
            ScenarioId::Chain => self.run_chain(),
            ScenarioId::ObserverFlip => self.run_observer_flip(),
            ScenarioId::Bootstrap => self.run_bootstrap(),
            ScenarioId::Surge => self.run_surge(),
            ScenarioId::Growth => self.run_growth(),
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Scenario {} aborted: {}", scenario.name(), e);
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    final_threat: 0.0,
                    final_agent_count: 0,
                    failure_reason: Some(e.to_string()),
                    metrics: ScenarioMetrics::default(),
                }
            }
        }
    }

    // =========================================================================
    // Harness
    // =========================================================================

    /// Builds a world on the runner's config and attaches a metrics watcher.
    fn world(
        &self,
        tweak: impl FnOnce(&mut SimConfig),
    ) -> Result<(SimWorld, Arc<Mutex<ScenarioMetrics>>), ScenarioError> {
        let mut config = self.config.clone();
        config.seed = self.seed;
        tweak(&mut config);

        let mut world = SimWorld::new(config)?;
        let metrics = Arc::new(Mutex::new(ScenarioMetrics::default()));
        let sink = Arc::clone(&metrics);
        world
            .scheduler_mut()
            .subscribe(move |report: &TickReport, graph: &Graph| {
                if let Ok(mut m) = sink.lock() {
                    m.record(report, graph);
                }
            });

        Ok((world, metrics))
    }

    fn finish(
        &self,
        scenario: ScenarioId,
        world: &SimWorld,
        metrics: &Mutex<ScenarioMetrics>,
        verdict: Verdict,
    ) -> ScenarioResult {
        let metrics = metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());

        info!(
            "✓ {} complete: {} ticks, threat {:.3} (max {:.3}), {} agents",
            scenario.name(),
            world.tick_count(),
            world.scheduler().current_threat(),
            metrics.max_threat,
            world.agent_count()
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: verdict.passed && metrics.invariant_violations == 0,
            total_ticks: world.tick_count(),
            final_time_secs: world.time(),
            final_threat: world.scheduler().current_threat(),
            final_agent_count: world.agent_count(),
            failure_reason: verdict.failure_reason.or_else(|| {
                (metrics.invariant_violations > 0).then(|| {
                    format!("{} ticks left values outside [0, 1]", metrics.invariant_violations)
                })
            }),
            metrics,
        }
    }

    fn uncertainty_of(world: &SimWorld, id: AgentId) -> f64 {
        world
            .scheduler()
            .engine()
            .graph()
            .agent(id)
            .map_or(f64::NAN, |a| a.uncertainty())
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// TM-001: Duel - a fully aggressive attacker hits its defender every tick.
    ///
    /// **Assertion**: defender uncertainty == min(1, ticks * attack_increment),
    /// attacker stays at 0.
    fn run_duel(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-001: Duel");
        let (mut world, metrics) = self.world(|_| {})?;
        let ticks = self.ticks.max(1);

        let engine = world.scheduler_mut().engine_mut();
        let attacker = engine.add_agent_with_traits(Role::Attacker, 0.0, 1.0, 0.0)?.id();
        let defender = engine.add_agent_with_traits(Role::Defender, 0.0, 0.0, 0.0)?.id();
        engine.add_relationship(attacker, defender)?;
        let increment = engine.config().behavior.attack_increment;

        world.run(ticks)?;

        let expected = (ticks as f64 * increment).min(1.0);
        let hit = Self::uncertainty_of(&world, defender);
        let attacker_u = Self::uncertainty_of(&world, attacker);
        let verdict = Verdict::check((hit - expected).abs() < 1e-9 && attacker_u == 0.0, || {
            format!("defender at {:.4} (expected {:.4}), attacker at {:.4}", hit, expected, attacker_u)
        });

        Ok(self.finish(ScenarioId::Duel, &world, &metrics, verdict))
    }

    /// TM-002: Empty - ticking an empty graph is a no-op with zero threat.
    fn run_empty(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-002: Empty graph");
        let (mut world, metrics) = self.world(|_| {})?;

        let reports = world.run(self.ticks)?;

        let max = reports.iter().map(|r| r.threat).fold(0.0, f64::max);
        let verdict = Verdict::check(max == 0.0 && world.agent_count() == 0, || {
            format!("empty graph scored threat {:.4}", max)
        });

        Ok(self.finish(ScenarioId::Empty, &world, &metrics, verdict))
    }

    /// TM-003: Chain - diffusion reads live values in edge order, so a
    /// chain inserted head-first reaches its tail in a single tick.
    ///
    /// **Assertion**: after tick 1, tail == head * rate^2.
    fn run_chain(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-003: Observer chain");
        let (mut world, metrics) = self.world(|_| {})?;

        let engine = world.scheduler_mut().engine_mut();
        let head = engine.add_agent_with_traits(Role::Observer, 0.5, 0.0, 0.0)?.id();
        let middle = engine.add_agent_with_traits(Role::Observer, 0.0, 0.0, 0.0)?.id();
        let tail = engine.add_agent_with_traits(Role::Observer, 0.0, 0.0, 0.0)?.id();
        engine.add_relationship(head, middle)?;
        engine.add_relationship(middle, tail)?;
        let rate = engine.config().diffusion.rate;

        world.tick()?;
        let reached = Self::uncertainty_of(&world, tail);
        let expected = 0.5 * rate * rate;
        debug!("  tail after one tick: {:.6}", reached);

        world.run(self.ticks.saturating_sub(1))?;

        let verdict = Verdict::check(reached > 0.0 && (reached - expected).abs() < 1e-12, || {
            format!("tail reached {:.6} after one tick (expected {:.6})", reached, expected)
        });

        Ok(self.finish(ScenarioId::Chain, &world, &metrics, verdict))
    }

    /// TM-004: ObserverFlip - isolated high-uncertainty observers turn
    /// defender at the configured rate.
    ///
    /// **Assertion**: observed rate within 0.05 of the flip probability over
    /// 2000 trials.
    fn run_observer_flip(&self) -> Result<ScenarioResult, ScenarioError> {
        const TRIALS: usize = 2000;
        info!("TM-004: Observer flip ({} trials)", TRIALS);
        let (mut world, metrics) = self.world(|_| {})?;

        let engine = world.scheduler_mut().engine_mut();
        for _ in 0..TRIALS {
            engine.add_agent_with_traits(Role::Observer, 0.9, 0.0, 0.0)?;
        }
        let probability = engine.config().behavior.observer_flip_probability;

        let report = world.tick()?;

        let flipped = report
            .role_changes
            .iter()
            .filter(|(_, role)| *role == Role::Defender)
            .count();
        let rate = flipped as f64 / TRIALS as f64;
        let verdict = Verdict::check((rate - probability).abs() <= 0.05, || {
            format!("flip rate {:.3} vs configured {:.3}", rate, probability)
        });

        Ok(self.finish(ScenarioId::ObserverFlip, &world, &metrics, verdict))
    }

    /// TM-005: Bootstrap - a random bootstrapped graph keeps every value in
    /// range for the whole run.
    fn run_bootstrap(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-005: Bootstrap");
        let (mut world, metrics) = self.world(|c| c.bootstrap_extra = 10)?;

        world.bootstrap()?;
        world.run(self.ticks)?;

        let verdict = Verdict::check(world.agent_count() == 13, || {
            format!("bootstrap produced {} agents", world.agent_count())
        });

        Ok(self.finish(ScenarioId::Bootstrap, &world, &metrics, verdict))
    }

    /// TM-006: Surge - six attackers cross-linked to six observers push
    /// threat past the critic threshold. Observer self-transitions are
    /// disabled so only the critic moves observers.
    ///
    /// **Assertion**: the critic converted every observer and attackers stay
    /// attackers.
    fn run_surge(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-006: Attacker surge");
        let (mut world, metrics) =
            self.world(|c| c.engine.behavior.observer_flip_probability = 0.0)?;
        let ticks = self.ticks.max(50);

        let engine = world.scheduler_mut().engine_mut();
        let attackers = (0..6)
            .map(|_| Ok(engine.add_agent_with_traits(Role::Attacker, 0.5, 1.0, 0.0)?.id()))
            .collect::<Result<Vec<_>, EngineError>>()?;
        let observers = (0..6)
            .map(|_| Ok(engine.add_agent_with_traits(Role::Observer, 0.5, 0.0, 0.0)?.id()))
            .collect::<Result<Vec<_>, EngineError>>()?;
        for &a in &attackers {
            for &o in &observers {
                engine.add_relationship(a, o)?;
            }
        }

        world.run(ticks)?;

        let stats = world.scheduler().stats();
        let conversions = metrics.lock().map(|m| m.conversions).unwrap_or(0);
        let verdict = Verdict::check(
            stats.observers == 0
                && stats.attackers == attackers.len()
                && stats.defenders == observers.len()
                && conversions == observers.len() as u64,
            || {
                format!(
                    "ended with {} attackers, {} defenders, {} observers after {} conversions",
                    stats.attackers, stats.defenders, stats.observers, conversions
                )
            },
        );

        Ok(self.finish(ScenarioId::Surge, &world, &metrics, verdict))
    }

    /// TM-007: Growth - the graph grows by linked attackers and observers.
    ///
    /// **Assertion**: the graph grew, and stays a tree
    /// (relationships == agents - 1).
    fn run_growth(&self) -> Result<ScenarioResult, ScenarioError> {
        info!("TM-007: Growth");
        let (mut world, metrics) = self.world(|c| {
            c.bootstrap_extra = 0;
            c.growth_probability = 0.2;
        })?;
        let ticks = self.ticks.max(100);

        world.bootstrap()?;
        world.run(ticks)?;

        let agents = world.agent_count();
        let relationships = world.scheduler().relationships().len();
        let verdict = Verdict::check(agents > 3 && relationships + 1 == agents, || {
            format!("{} agents, {} relationships", agents, relationships)
        });

        Ok(self.finish(ScenarioId::Growth, &world, &metrics, verdict))
    }
}
