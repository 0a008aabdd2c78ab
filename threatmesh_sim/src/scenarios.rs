//! Deterministic scenarios exercising the engine's observable behavior.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// TM-001: One attacker hits one defender
    Duel,

    /// TM-002: Ticking an empty graph
    Empty,

    /// TM-003: Diffusion along an observer chain
    Chain,

    /// TM-004: Observer self-transition rate
    ObserverFlip,

    /// TM-005: Bootstrapped random graph stays in bounds
    Bootstrap,

    /// TM-006: Attacker surge drives the meta-critic
    Surge,

    /// TM-007: Stochastic graph growth
    Growth,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Duel,
            ScenarioId::Empty,
            ScenarioId::Chain,
            ScenarioId::ObserverFlip,
            ScenarioId::Bootstrap,
            ScenarioId::Surge,
            ScenarioId::Growth,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Duel => "duel",
            ScenarioId::Empty => "empty",
            ScenarioId::Chain => "chain",
            ScenarioId::ObserverFlip => "observer_flip",
            ScenarioId::Bootstrap => "bootstrap",
            ScenarioId::Surge => "surge",
            ScenarioId::Growth => "growth",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Duel => "Fully aggressive attacker vs. defender: one hit per tick",
            ScenarioId::Empty => "Empty graph ticks without error and scores zero threat",
            ScenarioId::Chain => "Uncertainty flows down an observer chain in edge order",
            ScenarioId::ObserverFlip => "High-uncertainty observers become defenders at the configured rate",
            ScenarioId::Bootstrap => "Random bootstrap graph keeps every value in [0, 1]",
            ScenarioId::Surge => "Cross-linked attackers push threat past the critic threshold",
            ScenarioId::Growth => "Graph grows one linked agent at a time",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duel" | "tm-001" => Ok(ScenarioId::Duel),
            "empty" | "tm-002" => Ok(ScenarioId::Empty),
            "chain" | "tm-003" => Ok(ScenarioId::Chain),
            "observer_flip" | "observerflip" | "tm-004" => Ok(ScenarioId::ObserverFlip),
            "bootstrap" | "tm-005" => Ok(ScenarioId::Bootstrap),
            "surge" | "tm-006" => Ok(ScenarioId::Surge),
            "growth" | "tm-007" => Ok(ScenarioId::Growth),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert_eq!("TM-006".parse::<ScenarioId>(), Ok(ScenarioId::Surge));
        assert!("nope".parse::<ScenarioId>().is_err());
    }
}
