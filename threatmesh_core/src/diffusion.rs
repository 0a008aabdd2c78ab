//! Diffusion Step - propagates uncertainty along relationships.
//!
//! For each relationship `(s, t)` in insertion order:
//!
//! ```text
//! flow = u(s) * rate
//! u(t) = clamp01(u(t) + flow)
//! ```
//!
//! Values are read live, so a chain inserted head-first carries uncertainty
//! its full length in one pass. In `Bidirectional` mode the rule is applied
//! once per direction for every relationship.

use crate::config::{DiffusionConfig, DiffusionDirection};
use crate::graph::Graph;

/// Runs one diffusion pass. Returns the total uncertainty added (after
/// clamping).
pub fn diffuse(graph: &mut Graph, config: &DiffusionConfig) -> f64 {
    let edges = graph.edge_indices();
    let agents = graph.agents_mut();
    let mut total = 0.0;

    let mut push = |from: usize, to: usize| {
        let flow = agents[from].uncertainty() * config.rate;
        total += agents[to].shift_uncertainty(flow);
    };

    for (s, t) in edges {
        push(s, t);
        if config.direction == DiffusionDirection::Bidirectional {
            push(t, s);
        }
    }

    total
}
