//! Common types for the ThreatMesh environment abstraction.

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an agent in the threat graph.
///
/// Ids are only minted from an RNG or a fixed seed, never from OS entropy,
/// so a seeded run always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    /// Creates an AgentId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Draws a v4 UUID from the given RNG.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let bytes: [u8; 16] = rng.gen();
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }

    /// Creates a deterministic AgentId from a seed (for fixtures).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_agent_id_from_rng_is_reproducible() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);

        assert_eq!(AgentId::from_rng(&mut rng1), AgentId::from_rng(&mut rng2));
        assert_ne!(AgentId::from_rng(&mut rng1), AgentId::from_seed(7));
    }

    #[test]
    fn test_agent_id_from_rng_is_a_v4_uuid() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let ids: Vec<AgentId> = (0..16).map(|_| AgentId::from_rng(&mut rng)).collect();

        let mut replay = ChaCha8Rng::seed_from_u64(99);
        for id in &ids {
            assert_eq!(id.as_uuid().get_version_num(), 4);
            assert_eq!(*id, AgentId::from_rng(&mut replay));
        }
    }

    #[test]
    fn test_agent_id_display_is_short() {
        let id = AgentId::from_seed(1);
        assert_eq!(id.to_string().len(), 8);
    }
}
