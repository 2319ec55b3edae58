use serde::{Deserialize, Serialize};

use crate::base::DEFAULT_PREFIX;

/// Serializable defaults for a [`Stow`](crate::cache::Stow) factory.
///
/// Missing fields fall back to their defaults, so the struct can be embedded
/// in an application's own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StowConfig {
    /// Prepended to every key; empty means no namespacing.
    pub prefix: String,
    /// Bypass restore and persistence entirely.
    pub skip_cache: bool,
}

impl Default for StowConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            skip_cache: false,
        }
    }
}
