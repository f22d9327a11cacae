//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables shared by every engine built from one machine definition.
///
/// Hosts typically embed this in their own configuration file; every field
/// has a default, so partial documents are accepted.
///
/// # Example
///
/// ```rust
/// use strata::config::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "history_limit": 8 }"#).unwrap();
/// assert_eq!(config.history_limit, 8);
/// assert!(config.enter_on_start);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run enter hooks for the initial state's whole chain on start.
    /// Attach hooks always run.
    pub enter_on_start: bool,

    /// Number of transitions kept in the engine history (0 disables it).
    pub history_limit: usize,

    /// Upper bound on upgrade steps while restoring an outdated state.
    pub max_upgrade_steps: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enter_on_start: true,
            history_limit: 64,
            max_upgrade_steps: 16,
        }
    }
}
