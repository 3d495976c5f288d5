//! Synthetic tracking scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: Straight chains with a rotating displacement axis
    Chains,

    /// SIM-002: Gaussian random walks with frame gaps
    RandomWalk,

    /// SIM-003: Tracks merging and splitting again
    MergeSplit,

    /// SIM-004: Random edits, some of them aborted
    Churn,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Chains,
            ScenarioId::RandomWalk,
            ScenarioId::MergeSplit,
            ScenarioId::Churn,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Chains => "chains",
            ScenarioId::RandomWalk => "random_walk",
            ScenarioId::MergeSplit => "merge_split",
            ScenarioId::Churn => "churn",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Chains => {
                "Straight chains, one unit per frame; move one spot and check local recomputation"
            }
            ScenarioId::RandomWalk => "Gaussian random walks with skipped frames, gaps and speeds",
            ScenarioId::MergeSplit => "Merge two tracks, split them again, verify track id stability",
            ScenarioId::Churn => "Random spot/edge edits in update scopes, 1 in 4 rolled back",
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
            "chains" | "sim-001" => Ok(ScenarioId::Chains),
            "random_walk" | "randomwalk" | "sim-002" => Ok(ScenarioId::RandomWalk),
            "merge_split" | "mergesplit" | "sim-003" => Ok(ScenarioId::MergeSplit),
            "churn" | "sim-004" => Ok(ScenarioId::Churn),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("SIM-003".parse::<ScenarioId>(), Ok(ScenarioId::MergeSplit));
        assert_eq!("RandomWalk".parse::<ScenarioId>(), Ok(ScenarioId::RandomWalk));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }
}
