use serde::{Deserialize, Serialize};

/// Response to a kingdom failing its daily upkeep payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpkeepPolicy {
    /// The kingdom enters the falling state and is dissolved if nobody
    /// reclaims it within 24 hours. Canonical policy.
    Falling,
    /// Legacy policy: claims farthest from home are dropped until the
    /// remaining upkeep is affordable. Falls back to `Falling` when the
    /// kingdom is down to its home region and still cannot pay.
    Shrink,
}

/// Operator-tunable engine parameters. Fixed game constants live in
/// [`crate::defines`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cost of founding a kingdom, in bronze.
    pub creation_cost: i64,
    /// Treasury cost of declaring a war, in bronze.
    pub war_declaration_cost: i64,
    /// Fee for a personal claim inside kingdom territory, in bronze.
    pub personal_claim_cost: i64,
    /// Personal claims allowed per player.
    pub max_personal_claims: usize,
    /// Personal claim lifetime in days; 0 means permanent.
    pub personal_claim_duration_days: u32,
    pub upkeep_policy: UpkeepPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            creation_cost: 10_000,
            war_declaration_cost: 50_000,
            personal_claim_cost: 200,
            max_personal_claims: 5,
            personal_claim_duration_days: 30,
            upkeep_policy: UpkeepPolicy::Falling,
        }
    }
}

impl EngineConfig {
    pub fn personal_claim_duration_ms(&self) -> Option<i64> {
        match self.personal_claim_duration_days {
            0 => None,
            days => Some(days as i64 * 24 * 60 * 60 * 1000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.creation_cost, 10_000);
        assert_eq!(config.upkeep_policy, UpkeepPolicy::Falling);
        assert_eq!(
            config.personal_claim_duration_ms(),
            Some(30 * 24 * 60 * 60 * 1000)
        );
    }

    #[test]
    fn test_zero_duration_means_permanent() {
        let config = EngineConfig {
            personal_claim_duration_days: 0,
            ..Default::default()
        };
        assert_eq!(config.personal_claim_duration_ms(), None);
    }
}
