/// Tunable settings for the new tab page
///
/// Stored as JSON under `newtabSettings`; every field has a default so a
/// partial or missing object still yields a complete config.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::host::KeyValueStore;
use crate::storage::SETTINGS_KEY;

pub const DEFAULT_ICON: &str = "icons/default-favicon.svg";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTabConfig {
    /// How many most-visited sites to show
    pub most_visited_limit: usize,
    pub favicon: FaviconConfig,
    pub warmer: WarmerConfig,
}

impl Default for NewTabConfig {
    fn default() -> Self {
        NewTabConfig {
            most_visited_limit: 12,
            favicon: FaviconConfig::default(),
            warmer: WarmerConfig::default(),
        }
    }
}

impl NewTabConfig {
    /// Read settings from storage, falling back to defaults on any problem
    pub async fn load<S: KeyValueStore>(store: &S) -> NewTabConfig {
        match crate::storage::load_json::<NewTabConfig, S>(store, SETTINGS_KEY).await {
            Ok(Some(config)) => config,
            Ok(None) => NewTabConfig::default(),
            Err(e) => {
                warn!("Ignoring unreadable settings: {}", e);
                NewTabConfig::default()
            }
        }
    }
}

/// Interactive favicon resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaviconConfig {
    /// Give up on every candidate after this long
    pub timeout_ms: u64,
    /// Images must be strictly larger than this in both dimensions
    pub min_dimension: u32,
    pub default_icon: String,
}

impl Default for FaviconConfig {
    fn default() -> Self {
        FaviconConfig {
            timeout_ms: 5000,
            min_dimension: 2,
            default_icon: DEFAULT_ICON.to_string(),
        }
    }
}

impl FaviconConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Background favicon warming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmerConfig {
    /// Bookmarks fetched in parallel per batch
    pub batch_size: usize,
    /// Responses shorter than this are treated as empty placeholders
    pub min_icon_bytes: usize,
    /// Failures whose message contains one of these are not logged
    pub quiet_error_patterns: Vec<String>,
}

impl Default for WarmerConfig {
    fn default() -> Self {
        WarmerConfig {
            batch_size: 5,
            min_icon_bytes: 100,
            quiet_error_patterns: vec!["CORS".to_string()],
        }
    }
}

impl WarmerConfig {
    pub fn is_quiet(&self, message: &str) -> bool {
        self.quiet_error_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && message.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = NewTabConfig::default();

        assert_eq!(config.most_visited_limit, 12);
        assert_eq!(config.favicon.timeout(), Duration::from_secs(5));
        assert_eq!(config.warmer.batch_size, 5);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let host = MemoryHost::new();
        host.put_value(SETTINGS_KEY, json!({"favicon": {"timeout_ms": 1500}}));

        let config = block_on(NewTabConfig::load(&host));

        assert_eq!(config.favicon.timeout_ms, 1500);
        assert_eq!(config.favicon.min_dimension, 2);
        assert_eq!(config.most_visited_limit, 12);
    }

    #[test]
    fn test_malformed_settings_fall_back() {
        let host = MemoryHost::new();
        host.put_value(SETTINGS_KEY, json!({"most_visited_limit": "lots"}));

        let config = block_on(NewTabConfig::load(&host));

        assert_eq!(config, NewTabConfig::default());
    }

    #[test]
    fn test_quiet_patterns() {
        let mut warmer = WarmerConfig::default();

        assert!(warmer.is_quiet("TypeError: blocked by CORS policy"));
        assert!(!warmer.is_quiet("HTTP 404"));

        warmer.quiet_error_patterns.clear();
        assert!(!warmer.is_quiet("blocked by CORS policy"));
    }
}
