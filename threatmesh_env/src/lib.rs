//! ThreatMesh Environment Abstraction Layer
//!
//! This crate lets the ThreatMesh engine run against either a **wall clock**
//! (tokio) or a **virtual clock** (deterministic simulation).
//!
//! # Core Concept
//!
//! The engine itself never touches time or entropy directly:
//! - Time (`now()`, `sleep()`) paces automatic ticks
//! - Randomness (`derive_rng()`) feeds every stochastic decision
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Example
//!
//! ```ignore
//! use threatmesh_env::EngineContext;
//!
//! async fn pace<Ctx: EngineContext>(ctx: &Ctx, interval: Duration) {
//!     loop {
//!         ctx.sleep(interval).await;
//!         scheduler.advance(interval);
//!     }
//! }
//! ```

mod context;
mod types;
mod tokio_impl;

pub use context::EngineContext;
pub use types::AgentId;
pub use tokio_impl::TokioContext;
