//! Threat Predictor - a scalar summary of systemic risk.
//!
//! # Formula
//! ```text
//! threat = clamp01(mean_uncertainty * w_u + edge_density * w_d)
//! mean_uncertainty = sum(u) / max(1, n)
//! edge_density     = |relationships| / max(1, n)
//! ```
//!
//! The `max(1, n)` floor makes the empty graph score 0 instead of dividing
//! by zero. Everything here is a pure function of the graph.

use crate::agent::{clamp01, Role};
use crate::config::ThreatConfig;
use crate::graph::Graph;
use serde::{Deserialize, Serialize};

fn denominator(graph: &Graph) -> f64 {
    graph.agent_count().max(1) as f64
}

/// Mean uncertainty over all agents (0 for the empty graph).
pub fn mean_uncertainty(graph: &Graph) -> f64 {
    let sum: f64 = graph.agents().iter().map(|a| a.uncertainty()).sum();
    sum / denominator(graph)
}

/// Relationships per agent (0 for the empty graph).
pub fn edge_density(graph: &Graph) -> f64 {
    graph.relationship_count() as f64 / denominator(graph)
}

/// Computes the threat score in [0, 1].
pub fn predict(graph: &Graph, config: &ThreatConfig) -> f64 {
    clamp01(
        mean_uncertainty(graph) * config.uncertainty_weight
            + edge_density(graph) * config.density_weight,
    )
}

/// Counters a rendering layer shows next to the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub agents: usize,
    pub relationships: usize,
    pub mean_uncertainty: f64,
    pub attackers: usize,
    pub defenders: usize,
    pub observers: usize,
}

impl GraphStats {
    pub fn from_graph(graph: &Graph) -> Self {
        let count = |role: Role| graph.agents().iter().filter(|a| a.role() == role).count();
        Self {
            agents: graph.agent_count(),
            relationships: graph.relationship_count(),
            mean_uncertainty: mean_uncertainty(graph),
            attackers: count(Role::Attacker),
            defenders: count(Role::Defender),
            observers: count(Role::Observer),
        }
    }
}
