//! Graph Store - the authoritative set of agents and relationships.
//!
//! The store has no behavior of its own. It only guarantees that:
//! - agent ids are unique
//! - every relationship's endpoints exist
//! - iteration order is insertion order (so seeded runs are reproducible)
//!
//! Removing an agent cascades: its relationships are removed with it.

use crate::agent::{Agent, Relationship};
use crate::error::EngineError;
use std::collections::HashMap;
use threatmesh_env::AgentId;

/// Agents plus relationships.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Graph {
    /// Agents in insertion order
    agents: Vec<Agent>,

    /// AgentId -> position in `agents`
    index: HashMap<AgentId, usize>,

    /// Relationships in insertion order
    relationships: Vec<Relationship>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an agent. Fails if the id is already present.
    pub fn insert_agent(&mut self, agent: Agent) -> Result<&Agent, EngineError> {
        let id = agent.id();
        if self.index.contains_key(&id) {
            return Err(EngineError::DuplicateAgent(id));
        }
        let position = self.agents.len();
        self.agents.push(agent);
        self.index.insert(id, position);
        Ok(&self.agents[position])
    }

    /// Adds a relationship between two existing agents.
    pub fn add_relationship(
        &mut self,
        source: AgentId,
        target: AgentId,
        weight: Option<f64>,
    ) -> Result<Relationship, EngineError> {
        for id in [source, target] {
            if !self.contains(id) {
                return Err(EngineError::InvalidReference(id));
            }
        }
        let relationship = Relationship::new(source, target, weight)?;
        self.relationships.push(relationship.clone());
        Ok(relationship)
    }

    /// Removes an agent and every relationship touching it.
    pub fn remove_agent(&mut self, id: AgentId) -> Result<Agent, EngineError> {
        let position = self
            .index
            .get(&id)
            .copied()
            .ok_or(EngineError::InvalidReference(id))?;

        let removed = self.agents.remove(position);
        self.relationships.retain(|r| !r.touches(id));
        self.reindex();
        Ok(removed)
    }

    fn reindex(&mut self) {
        self.index = self
            .agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id(), i))
            .collect();
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub(crate) fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        match self.index.get(&id) {
            Some(&i) => self.agents.get_mut(i),
            None => None,
        }
    }

    /// Position of an agent in [`Graph::agents`].
    pub fn index_of(&self, id: AgentId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Endpoints opposite `id` over every relationship touching it.
    ///
    /// Repeated edges yield repeated neighbors.
    pub fn neighbors(&self, id: AgentId) -> Vec<AgentId> {
        self.relationships
            .iter()
            .filter_map(|r| r.other(id))
            .collect()
    }

    /// Relationship endpoints as positions into [`Graph::agents`].
    pub fn edge_indices(&self) -> Vec<(usize, usize)> {
        self.relationships
            .iter()
            .filter_map(|r| Some((self.index_of(r.source())?, self.index_of(r.target())?)))
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Role;

    fn agent(seed: u64, role: Role) -> Agent {
        Agent::new(AgentId::from_seed(seed), role, 0.1, 0.5, 0.5).unwrap()
    }

    #[test]
    fn test_relationship_requires_existing_endpoints() {
        let mut graph = Graph::new();
        graph.insert_agent(agent(1, Role::Attacker)).unwrap();

        let missing = AgentId::from_seed(9);
        let err = graph
            .add_relationship(AgentId::from_seed(1), missing, None)
            .unwrap_err();

        assert_eq!(err, EngineError::InvalidReference(missing));
        assert_eq!(graph.relationship_count(), 0);
    }

    #[test]
    fn test_duplicate_agent_rejected() {
        let mut graph = Graph::new();
        graph.insert_agent(agent(1, Role::Attacker)).unwrap();

        let err = graph.insert_agent(agent(1, Role::Defender)).unwrap_err();
        assert_eq!(err, EngineError::DuplicateAgent(AgentId::from_seed(1)));
        assert_eq!(graph.agent_count(), 1);
    }

    #[test]
    fn test_remove_agent_cascades_relationships() {
        let mut graph = Graph::new();
        for seed in 1..=3 {
            graph.insert_agent(agent(seed, Role::Observer)).unwrap();
        }
        let (a, b, c) = (AgentId::from_seed(1), AgentId::from_seed(2), AgentId::from_seed(3));
        graph.add_relationship(a, b, None).unwrap();
        graph.add_relationship(b, c, None).unwrap();
        graph.add_relationship(a, c, None).unwrap();

        graph.remove_agent(b).unwrap();

        assert_eq!(graph.agent_count(), 2);
        assert_eq!(graph.relationship_count(), 1);
        assert_eq!(graph.index_of(c), Some(1));
        assert_eq!(graph.edge_indices(), vec![(0, 1)]);
        assert!(graph.remove_agent(b).is_err());
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let mut graph = Graph::new();
        for seed in 1..=3 {
            graph.insert_agent(agent(seed, Role::Observer)).unwrap();
        }
        let (a, b, c) = (AgentId::from_seed(1), AgentId::from_seed(2), AgentId::from_seed(3));
        graph.add_relationship(a, b, None).unwrap();
        graph.add_relationship(c, a, None).unwrap();

        assert_eq!(graph.neighbors(a), vec![b, c]);
        assert_eq!(graph.neighbors(b), vec![a]);
    }
}
