//! Behavior Engine - one role-conditioned update per agent per tick.
//!
//! Decisions are taken against a snapshot of the graph at tick start and
//! their effects are accumulated as per-agent deltas, applied once at the
//! end. An action taken by one agent this tick therefore never changes the
//! decision of another agent in the same tick, and the result does not
//! depend on iteration order (only the RNG draw order does).
//!
//! # Rules
//!
//! | Role     | Edge-directed mode                                   | Self-walk mode                  |
//! |----------|------------------------------------------------------|---------------------------------|
//! | Attacker | per edge, p = aggressiveness: neighbor += increment  | self += U(0,1) * increment      |
//! | Defender | per edge, p = vigilance: neighbor -= decrement       | self -= U(0,1) * decrement      |
//! | Observer | u > high: p -> defender; u < low: p -> attacker      | same                            |

use crate::agent::Role;
use crate::config::{BehaviorConfig, BehaviorMode};
use crate::graph::Graph;
use rand::Rng;
use threatmesh_env::AgentId;

/// What the behavior pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BehaviorOutcome {
    /// Successful attacker actions
    pub attacks: u32,

    /// Successful defender actions
    pub defenses: u32,

    /// Observer self-transitions as (agent, new role)
    pub role_changes: Vec<(AgentId, Role)>,
}

/// Frozen per-agent inputs for one tick.
#[derive(Debug, Clone, Copy)]
struct AgentView {
    role: Role,
    uncertainty: f64,
    aggressiveness: f64,
    vigilance: f64,
}

/// Applies one behavior pass to every agent.
pub fn apply<R: Rng + ?Sized>(
    graph: &mut Graph,
    rng: &mut R,
    config: &BehaviorConfig,
) -> BehaviorOutcome {
    let snapshot: Vec<AgentView> = graph
        .agents()
        .iter()
        .map(|a| AgentView {
            role: a.role(),
            uncertainty: a.uncertainty(),
            aggressiveness: a.aggressiveness(),
            vigilance: a.vigilance(),
        })
        .collect();

    // Edges are symmetric for behavior: each endpoint sees the other.
    // Lists keep relationship insertion order.
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); snapshot.len()];
    for (s, t) in graph.edge_indices() {
        adjacency[s].push(t);
        adjacency[t].push(s);
    }

    let mut deltas = vec![0.0_f64; snapshot.len()];
    let mut outcome = BehaviorOutcome::default();
    let mut new_roles: Vec<(usize, Role)> = Vec::new();

    for (i, view) in snapshot.iter().enumerate() {
        match (view.role, config.mode) {
            (Role::Attacker, BehaviorMode::EdgeDirected) => {
                for &other in &adjacency[i] {
                    if rng.gen_bool(view.aggressiveness) {
                        deltas[other] += config.attack_increment;
                        outcome.attacks += 1;
                    }
                }
            }
            (Role::Defender, BehaviorMode::EdgeDirected) => {
                for &other in &adjacency[i] {
                    if rng.gen_bool(view.vigilance) {
                        deltas[other] -= config.defend_decrement;
                        outcome.defenses += 1;
                    }
                }
            }
            (Role::Attacker, BehaviorMode::SelfWalk) => {
                deltas[i] += rng.gen::<f64>() * config.attack_increment;
                outcome.attacks += 1;
            }
            (Role::Defender, BehaviorMode::SelfWalk) => {
                deltas[i] -= rng.gen::<f64>() * config.defend_decrement;
                outcome.defenses += 1;
            }
            (Role::Observer, _) => {
                if let Some(role) = observer_transition(view.uncertainty, rng, config) {
                    new_roles.push((i, role));
                }
            }
        }
    }

    let agents = graph.agents_mut();
    for (agent, delta) in agents.iter_mut().zip(&deltas) {
        if *delta != 0.0 {
            agent.shift_uncertainty(*delta);
        }
    }
    for (i, role) in new_roles {
        agents[i].set_role(role);
        outcome.role_changes.push((agents[i].id(), role));
    }

    outcome
}

/// Observer self-transition. The two thresholds never overlap, so at most
/// one RNG draw is taken.
fn observer_transition<R: Rng + ?Sized>(
    uncertainty: f64,
    rng: &mut R,
    config: &BehaviorConfig,
) -> Option<Role> {
    if uncertainty > config.observer_high {
        rng.gen_bool(config.observer_flip_probability)
            .then_some(Role::Defender)
    } else if uncertainty < config.observer_low {
        rng.gen_bool(config.observer_flip_probability)
            .then_some(Role::Attacker)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn add(graph: &mut Graph, seed: u64, role: Role, u: f64, aggr: f64, vig: f64) -> AgentId {
        let id = AgentId::from_seed(seed);
        graph.insert_agent(Agent::new(id, role, u, aggr, vig).unwrap()).unwrap();
        id
    }

    #[test]
    fn test_certain_attacker_hits_every_neighbor() {
        let mut graph = Graph::new();
        let attacker = add(&mut graph, 1, Role::Attacker, 0.0, 1.0, 0.0);
        let d1 = add(&mut graph, 2, Role::Defender, 0.0, 0.0, 0.0);
        let d2 = add(&mut graph, 3, Role::Defender, 0.5, 0.0, 0.0);
        graph.add_relationship(attacker, d1, None).unwrap();
        graph.add_relationship(d2, attacker, None).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let outcome = apply(&mut graph, &mut rng, &BehaviorConfig::default());

        assert_eq!(outcome.attacks, 2);
        assert_eq!(outcome.defenses, 0);
        assert_relative_eq!(graph.agent(d1).unwrap().uncertainty(), 0.08, epsilon = 1e-12);
        assert_relative_eq!(graph.agent(d2).unwrap().uncertainty(), 0.58, epsilon = 1e-12);
        assert_eq!(graph.agent(attacker).unwrap().uncertainty(), 0.0);
    }

    #[test]
    fn test_effects_are_applied_from_snapshot() {
        // A defender at 0.0 next to a certain attacker: the attacker's hit and
        // the defender's counter-hit are both decided before either lands.
        let mut graph = Graph::new();
        let a = add(&mut graph, 1, Role::Attacker, 0.03, 1.0, 0.0);
        let d = add(&mut graph, 2, Role::Defender, 0.0, 0.0, 1.0);
        graph.add_relationship(a, d, None).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        apply(&mut graph, &mut rng, &BehaviorConfig::default());

        // 0.03 - 0.06 clamps to 0; defender rises by the full increment
        assert_eq!(graph.agent(a).unwrap().uncertainty(), 0.0);
        assert_relative_eq!(graph.agent(d).unwrap().uncertainty(), 0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_observer_in_middle_band_never_moves() {
        let mut graph = Graph::new();
        let o = add(&mut graph, 1, Role::Observer, 0.5, 1.0, 1.0);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let outcome = apply(&mut graph, &mut rng, &BehaviorConfig::default());
            assert!(outcome.role_changes.is_empty());
        }
        assert_eq!(graph.agent(o).unwrap().role(), Role::Observer);
    }

    #[test]
    fn test_observer_low_uncertainty_becomes_attacker() {
        let config = BehaviorConfig {
            observer_flip_probability: 1.0,
            ..Default::default()
        };
        let mut graph = Graph::new();
        let low = add(&mut graph, 1, Role::Observer, 0.1, 0.0, 0.0);
        let high = add(&mut graph, 2, Role::Observer, 0.9, 0.0, 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = apply(&mut graph, &mut rng, &config);

        assert_eq!(graph.agent(low).unwrap().role(), Role::Attacker);
        assert_eq!(graph.agent(high).unwrap().role(), Role::Defender);
        assert_eq!(outcome.role_changes.len(), 2);
    }

    #[test]
    fn test_self_walk_moves_own_uncertainty_only() {
        let config = BehaviorConfig {
            mode: BehaviorMode::SelfWalk,
            ..Default::default()
        };
        let mut graph = Graph::new();
        let a = add(&mut graph, 1, Role::Attacker, 0.5, 1.0, 0.0);
        let d = add(&mut graph, 2, Role::Defender, 0.5, 0.0, 1.0);
        let o = add(&mut graph, 3, Role::Observer, 0.5, 0.0, 0.0);
        graph.add_relationship(a, o, None).unwrap();
        graph.add_relationship(d, o, None).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        apply(&mut graph, &mut rng, &config);

        let ua = graph.agent(a).unwrap().uncertainty();
        let ud = graph.agent(d).unwrap().uncertainty();
        assert!((0.5..=0.58).contains(&ua));
        assert!((0.44..=0.5).contains(&ud));
        assert_eq!(graph.agent(o).unwrap().uncertainty(), 0.5);
    }
}
