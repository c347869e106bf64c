use serde::{Deserialize, Serialize};

/// Tunables of a matching session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Iteration cap of the unification finisher. Residual constraint
    /// solving that has not stabilized after this many rounds is a failure.
    pub retry_budget: usize,
    /// Maximum number of delta unfoldings in one unification problem.
    pub unfold_fuel: u32,
    /// Run the higher-order pass when the first-order pass finds nothing.
    pub higher_order_fallback: bool,
    /// Type-check the abstracted context when the matched subterm's type is known.
    pub check_dependent: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            retry_budget: 10,
            unfold_fuel: 256,
            higher_order_fallback: true,
            check_dependent: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid match configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl MatchConfig {
    /// Read a configuration from JSON; absent fields keep their defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
