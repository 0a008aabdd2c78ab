//! ThreatMesh Deterministic Simulation Harness
//!
//! This crate runs the ThreatMesh engine under a controlled clock so every
//! run is reproducible from a single 64-bit seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: a virtual clock that only moves when a tick is taken
//! - **Randomness**: the engine RNG is derived from the master seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock + seeded RNG streams)      │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                            │                                │
//! │  ┌─────────────────────────▼────────────────────────────┐   │
//! │  │ Scheduler ─► Engine (behavior, diffusion, threat,    │   │
//! │  │                      meta-critic)                    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │          │ TickObserver                                     │
//! └──────────┼──────────────────────────────────────────────────┘
//!            ▼
//!   ScenarioMetrics / SimExport / SimulationDriver frames
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use threatmesh_sim::{SimConfig, SimWorld};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     bootstrap_extra: 6,
//!     growth_probability: 0.1,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! world.bootstrap()?;
//! world.run(100)?;
//! ```

mod context;
mod driver;
mod exporter;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use driver::{DriverError, GraphSnapshot, SimulationDriver, SimulationHandle};
pub use exporter::{AgentState, EdgeState, SimEvent, SimExport, SimFrame};
pub use runner::{ScenarioError, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{ConfigError, SimConfig, SimWorld, ENGINE_STREAM};
