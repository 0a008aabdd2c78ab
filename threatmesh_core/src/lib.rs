//! ThreatMesh Core - role-conditioned uncertainty simulation on an agent graph
//!
//! Agents hold an uncertainty level and a role (attacker, defender,
//! observer). Relationships carry uncertainty between them, a scalar threat
//! score summarizes the graph, and a meta-critic feeds that score back into
//! role composition.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Scheduler                           │
//! │   idle / running / paused  •  step()  •  run(n)  •  advance() │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                        Engine                          │  │
//! │  │  ┌──────────┐  ┌───────────┐  ┌────────┐  ┌────────┐   │  │
//! │  │  │ Behavior │─►│ Diffusion │─►│ Threat │─►│ Critic │   │  │
//! │  │  └──────────┘  └───────────┘  └────────┘  └────────┘   │  │
//! │  │        ▲             ▲             │           │        │  │
//! │  │        └─────────────┴──── Graph ──┴───────────┘        │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                 │ TickObserver::on_tick(report, graph)        │
//! └─────────────────┼────────────────────────────────────────────┘
//!                   ▼
//!           rendering / export
//! ```
//!
//! Every stochastic decision draws from the engine's `ChaCha8Rng`, so a run
//! is fully determined by its seed, config and call sequence.
//!
//! # Usage
//!
//! ```ignore
//! use threatmesh_core::{Engine, Role, Scheduler};
//!
//! let mut engine = Engine::seeded(42);
//! let a = engine.add_agent(Role::Attacker, None)?;
//! let d = engine.add_agent(Role::Defender, None)?;
//! engine.add_relationship(a.id(), d.id())?;
//!
//! let mut scheduler = Scheduler::new(engine);
//! scheduler.run(10);
//! println!("threat = {:.2}", scheduler.current_threat());
//! ```

pub mod agent;
pub mod behavior;
pub mod config;
pub mod critic;
pub mod diffusion;
pub mod engine;
pub mod error;
pub mod graph;
pub mod scheduler;
pub mod threat;

#[cfg(test)]
mod properties;

// Re-export key types for convenience
pub use agent::{clamp01, Agent, Relationship, Role};
pub use config::{BehaviorMode, DiffusionDirection, EngineConfig};
pub use engine::{Engine, TickOutcome};
pub use error::EngineError;
pub use graph::Graph;
pub use scheduler::{Scheduler, SchedulerState, TickObserver, TickReport, DEFAULT_TICK_INTERVAL};
pub use threat::GraphStats;
pub use threatmesh_env::AgentId;
