//! Meta-Critic - feeds the global threat score back into role composition.
//!
//! When threat is strictly above the threshold, every observer independently
//! converts to defender with a fixed probability. Attackers, defenders and
//! uncertainty values are never touched.

use crate::agent::Role;
use crate::config::CriticConfig;
use crate::graph::Graph;
use rand::Rng;
use threatmesh_env::AgentId;

/// Runs the critic and returns the ids of converted observers.
pub fn evaluate<R: Rng + ?Sized>(
    threat: f64,
    graph: &mut Graph,
    rng: &mut R,
    config: &CriticConfig,
) -> Vec<AgentId> {
    if threat <= config.threshold {
        return Vec::new();
    }

    let mut converted = Vec::new();
    for agent in graph.agents_mut() {
        if agent.role() == Role::Observer && rng.gen_bool(config.conversion_probability) {
            agent.set_role(Role::Defender);
            converted.push(agent.id());
        }
    }
    converted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn mixed_graph() -> Graph {
        let mut graph = Graph::new();
        let roles = [Role::Attacker, Role::Defender, Role::Observer, Role::Observer];
        for (i, role) in roles.into_iter().enumerate() {
            let id = AgentId::from_seed(i as u64);
            graph.insert_agent(Agent::new(id, role, 0.5, 0.5, 0.5).unwrap()).unwrap();
        }
        graph
    }

    #[test]
    fn test_below_threshold_is_noop() {
        let mut graph = mixed_graph();
        let before = graph.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let converted = evaluate(0.6, &mut graph, &mut rng, &CriticConfig::default());

        assert!(converted.is_empty());
        assert_eq!(graph, before);
    }

    #[test]
    fn test_only_observers_convert() {
        let mut graph = mixed_graph();
        let config = CriticConfig {
            conversion_probability: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let converted = evaluate(0.9, &mut graph, &mut rng, &config);

        assert_eq!(converted, vec![AgentId::from_seed(2), AgentId::from_seed(3)]);
        let roles: Vec<Role> = graph.agents().iter().map(|a| a.role()).collect();
        assert_eq!(roles, vec![Role::Attacker, Role::Defender, Role::Defender, Role::Defender]);
        assert!(graph.agents().iter().all(|a| a.uncertainty() == 0.5));
    }
}
