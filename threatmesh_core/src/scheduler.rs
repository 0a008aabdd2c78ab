//! Simulation Scheduler - sequences ticks and owns pacing state.
//!
//! The scheduler is a small state machine around an [`Engine`]:
//!
//! ```text
//!            start(interval)
//!   Idle ─────────────────────► Running ◄──── resume() ────┐
//!    ▲                            │                          │
//!    └──────── stop() ────────────┴──────── pause() ───► Paused
//! ```
//!
//! Manual [`Scheduler::step`] and [`Scheduler::run`] work in every state.
//! Automatic ticks are driven by [`Scheduler::advance`], which is handed the
//! elapsed time by whoever owns the clock (a real timer, a virtual clock, or
//! a test). Pause state is checked before every automatic tick, never in the
//! middle of one. Automatic ticks may also grow the graph first, see
//! [`Scheduler::set_growth_probability`].

use crate::agent::{Agent, Relationship, Role};
use crate::engine::{Engine, TickOutcome};
use crate::error::{ensure_unit, EngineError};
use crate::graph::Graph;
use crate::threat::GraphStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use threatmesh_env::AgentId;
use tracing::{debug, info, warn};

/// Interval between automatic ticks unless `start` says otherwise.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1200);

/// Pacing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Paused,
}

/// Summary of one completed tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: u64,

    /// Threat after this tick
    pub threat: f64,

    pub attacks: u32,
    pub defenses: u32,

    /// Total uncertainty added by diffusion
    pub diffused: f64,

    /// Observer self-transitions
    pub role_changes: Vec<(AgentId, Role)>,

    /// Observers converted to defender by the critic
    pub converted: Vec<AgentId>,
}

impl TickReport {
    fn new(tick: u64, outcome: TickOutcome) -> Self {
        Self {
            tick,
            threat: outcome.threat,
            attacks: outcome.behavior.attacks,
            defenses: outcome.behavior.defenses,
            diffused: outcome.diffused,
            role_changes: outcome.behavior.role_changes,
            converted: outcome.converted,
        }
    }
}

/// Notification hook fired after every completed tick.
///
/// Receives the tick report and the refreshed graph. Any
/// `FnMut(&TickReport, &Graph) + Send` closure is an observer.
pub trait TickObserver: Send {
    fn on_tick(&mut self, report: &TickReport, graph: &Graph);
}

impl<F> TickObserver for F
where
    F: FnMut(&TickReport, &Graph) + Send,
{
    fn on_tick(&mut self, report: &TickReport, graph: &Graph) {
        self(report, graph)
    }
}

/// Orchestrates tick ordering, pacing and the engine's mutation API.
pub struct Scheduler {
    engine: Engine,
    state: SchedulerState,

    /// Time between automatic ticks
    interval: Duration,

    /// Running time not yet consumed by a tick
    pending: Duration,

    /// Chance of adding a linked agent before each automatic tick
    growth_probability: f64,

    tick_count: u64,
    observers: Vec<Box<dyn TickObserver>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("interval", &self.interval)
            .field("tick_count", &self.tick_count)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Scheduler {
    /// Wraps an engine. The scheduler starts idle.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            state: SchedulerState::Idle,
            interval: DEFAULT_TICK_INTERVAL,
            pending: Duration::ZERO,
            growth_probability: 0.0,
            tick_count: 0,
            observers: Vec::new(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Time left on the clock before the next automatic tick is due.
    pub fn until_next_tick(&self) -> Duration {
        self.interval.saturating_sub(self.pending)
    }

    pub fn growth_probability(&self) -> f64 {
        self.growth_probability
    }

    /// Sets the per-tick growth chance for automatic ticks. Manual `step`,
    /// `run` and `probe` never grow the graph.
    pub fn set_growth_probability(&mut self, probability: f64) -> Result<(), EngineError> {
        self.growth_probability = ensure_unit("growth_probability", probability)?;
        Ok(())
    }

    /// Registers a tick observer.
    pub fn subscribe<O: TickObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    // =========================================================================
    // Tick execution
    // =========================================================================

    /// Runs exactly one ordered pass and notifies observers.
    pub fn step(&mut self) -> TickReport {
        let outcome = self.engine.tick();
        self.tick_count += 1;
        let report = TickReport::new(self.tick_count, outcome);

        debug!(
            tick = report.tick,
            threat = report.threat,
            attacks = report.attacks,
            defenses = report.defenses,
            converted = report.converted.len(),
            "tick complete"
        );

        let graph = self.engine.graph();
        for observer in self.observers.iter_mut() {
            observer.on_tick(&report, graph);
        }
        report
    }

    /// Runs `step()` exactly `n` times.
    pub fn run(&mut self, n: u64) -> Vec<TickReport> {
        (0..n).map(|_| self.step()).collect()
    }

    /// Feeds elapsed clock time to the pacer.
    ///
    /// Time only accumulates while running. One tick fires per whole
    /// interval, and the state is re-checked before each one. Returns the
    /// number of ticks fired.
    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        if self.state != SchedulerState::Running {
            return 0;
        }
        self.pending += elapsed;

        let mut fired = 0;
        while self.state == SchedulerState::Running && self.pending >= self.interval {
            self.pending -= self.interval;
            self.grow();
            self.step();
            fired += 1;
        }
        fired
    }

    fn grow(&mut self) {
        if self.growth_probability <= 0.0 {
            return;
        }
        match self.engine.maybe_grow(self.growth_probability) {
            Ok(Some(agent)) => debug!(agent = %agent.id(), role = %agent.role(), "graph grew"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "growth skipped"),
        }
    }

    // =========================================================================
    // Pacing controls
    // =========================================================================

    /// Enables automatic ticks every `interval`. From `Running` this only
    /// changes the interval.
    pub fn start(&mut self, interval: Duration) -> Result<(), EngineError> {
        if interval.is_zero() {
            return Err(EngineError::ZeroInterval);
        }
        info!(interval_ms = interval.as_millis() as u64, from = ?self.state, "scheduler started");
        self.interval = interval;
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// `Running -> Paused`. Returns false (and does nothing) otherwise.
    pub fn pause(&mut self) -> bool {
        if self.state != SchedulerState::Running {
            return false;
        }
        info!(tick = self.tick_count, "scheduler paused");
        self.state = SchedulerState::Paused;
        true
    }

    /// `Paused -> Running`. Returns false (and does nothing) otherwise.
    pub fn resume(&mut self) -> bool {
        if self.state != SchedulerState::Paused {
            return false;
        }
        info!(tick = self.tick_count, "scheduler resumed");
        self.state = SchedulerState::Running;
        true
    }

    /// Back to `Idle`, dropping any accumulated pacing time.
    pub fn stop(&mut self) {
        if self.state != SchedulerState::Idle {
            info!(tick = self.tick_count, "scheduler stopped");
        }
        self.state = SchedulerState::Idle;
        self.pending = Duration::ZERO;
    }

    // =========================================================================
    // Engine API for the presentation layer
    // =========================================================================

    pub fn agents(&self) -> &[Agent] {
        self.engine.agents()
    }

    pub fn relationships(&self) -> &[Relationship] {
        self.engine.relationships()
    }

    pub fn current_threat(&self) -> f64 {
        self.engine.current_threat()
    }

    pub fn stats(&self) -> GraphStats {
        self.engine.stats()
    }

    pub fn add_agent(
        &mut self,
        role: Role,
        uncertainty: Option<f64>,
    ) -> Result<Agent, EngineError> {
        self.engine.add_agent(role, uncertainty)
    }

    pub fn add_relationship(
        &mut self,
        source: AgentId,
        target: AgentId,
    ) -> Result<Relationship, EngineError> {
        self.engine.add_relationship(source, target)
    }

    pub fn remove_agent(&mut self, id: AgentId) -> Result<Agent, EngineError> {
        self.engine.remove_agent(id)
    }

    /// Bumps an agent's uncertainty, spreads it to neighbors, then runs one
    /// tick so the effect is visible immediately.
    pub fn probe(&mut self, id: AgentId) -> Result<TickReport, EngineError> {
        let level = self.engine.perturb(id)?;
        debug!(agent = %id, level, "probe");
        Ok(self.step())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn duel() -> (Scheduler, AgentId, AgentId) {
        let mut engine = Engine::seeded(42);
        let a = engine.add_agent_with_traits(Role::Attacker, 0.0, 1.0, 0.0).unwrap().id();
        let d = engine.add_agent_with_traits(Role::Defender, 0.0, 0.0, 0.0).unwrap().id();
        engine.add_relationship(a, d).unwrap();
        (Scheduler::new(engine), a, d)
    }

    #[test]
    fn test_state_transitions() {
        let (mut scheduler, _, _) = duel();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.pause());
        assert!(!scheduler.resume());

        scheduler.start(Duration::from_millis(100)).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(!scheduler.resume());

        assert!(scheduler.pause());
        assert_eq!(scheduler.state(), SchedulerState::Paused);
        assert!(scheduler.resume());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.start(Duration::ZERO), Err(EngineError::ZeroInterval));
    }

    #[test]
    fn test_advance_fires_per_interval() {
        let (mut scheduler, _, _) = duel();
        assert_eq!(scheduler.advance(Duration::from_secs(10)), 0);

        scheduler.start(Duration::from_millis(100)).unwrap();
        assert_eq!(scheduler.advance(Duration::from_millis(250)), 2);
        assert_eq!(scheduler.advance(Duration::from_millis(50)), 1);
        assert_eq!(scheduler.tick_count(), 3);
    }

    #[test]
    fn test_until_next_tick_counts_down_pending_time() {
        let (mut scheduler, _, _) = duel();
        scheduler.start(Duration::from_millis(100)).unwrap();
        assert_eq!(scheduler.until_next_tick(), Duration::from_millis(100));

        // Small slices add up instead of being dropped
        for _ in 0..3 {
            assert_eq!(scheduler.advance(Duration::from_millis(30)), 0);
        }
        assert_eq!(scheduler.until_next_tick(), Duration::from_millis(10));

        assert_eq!(scheduler.advance(Duration::from_millis(30)), 1);
        assert_eq!(scheduler.until_next_tick(), Duration::from_millis(80));

        scheduler.stop();
        assert_eq!(scheduler.until_next_tick(), Duration::from_millis(100));
    }

    #[test]
    fn test_automatic_ticks_grow_the_graph() {
        let (mut scheduler, _, _) = duel();
        assert_eq!(
            scheduler.set_growth_probability(1.5),
            Err(EngineError::parameter("growth_probability", 1.5))
        );
        scheduler.set_growth_probability(1.0).unwrap();

        scheduler.run(3);
        assert_eq!(scheduler.agents().len(), 2);

        scheduler.start(Duration::from_millis(100)).unwrap();
        assert_eq!(scheduler.advance(Duration::from_millis(300)), 3);
        assert_eq!(scheduler.agents().len(), 5);
        assert_eq!(scheduler.relationships().len(), 4);
    }

    #[test]
    fn test_pause_blocks_automatic_ticks_but_not_step() {
        let (mut scheduler, _, _) = duel();
        scheduler.start(Duration::from_millis(100)).unwrap();
        scheduler.pause();

        assert_eq!(scheduler.advance(Duration::from_secs(5)), 0);
        assert_eq!(scheduler.tick_count(), 0);

        let report = scheduler.step();
        assert_eq!(report.tick, 1);

        scheduler.resume();
        assert_eq!(scheduler.advance(Duration::from_millis(100)), 1);
        assert_eq!(scheduler.tick_count(), 2);
    }

    #[test]
    fn test_run_n_and_zero() {
        let (mut scheduler, _, _) = duel();
        let before = scheduler.engine().graph().clone();

        assert!(scheduler.run(0).is_empty());
        assert_eq!(scheduler.engine().graph(), &before);

        let reports = scheduler.run(5);
        assert_eq!(reports.len(), 5);
        assert_eq!(reports.last().map(|r| r.tick), Some(5));
    }

    #[test]
    fn test_observers_see_every_tick() {
        let (mut scheduler, _, _) = duel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scheduler.subscribe(move |report: &TickReport, graph: &Graph| {
            sink.lock().unwrap().push((report.tick, graph.agent_count()));
        });

        scheduler.run(3);

        assert_eq!(*seen.lock().unwrap(), vec![(1, 2), (2, 2), (3, 2)]);
    }

    #[test]
    fn test_probe_runs_a_tick() {
        let (mut scheduler, a, d) = duel();

        let report = scheduler.probe(a).unwrap();

        assert_eq!(report.tick, 1);
        // attacker: 0.15 bump; defender: 0.015 spread + 0.08 hit + 0.0075 flow
        let u = |id| scheduler.engine().graph().agent(id).unwrap().uncertainty();
        assert!((u(a) - 0.15).abs() < 1e-12);
        assert!((u(d) - (0.015 + 0.08 + 0.0075)).abs() < 1e-12);
    }

    #[test]
    fn test_probe_unknown_agent_is_rejected() {
        let (mut scheduler, _, _) = duel();
        let before = scheduler.engine().graph().clone();
        let ghost = AgentId::from_seed(404);

        assert_eq!(
            scheduler.probe(ghost).unwrap_err(),
            EngineError::InvalidReference(ghost)
        );
        assert_eq!(scheduler.engine().graph(), &before);
        assert_eq!(scheduler.tick_count(), 0);
    }
}
