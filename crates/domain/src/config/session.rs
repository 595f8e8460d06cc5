use serde::{Deserialize, Serialize};

/// Per-session configuration (spec.md §3 `SessionConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "d_max_iterations")]
    pub max_iterations: u32,
    /// Names of tools offered to the LLM for this session.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub provider_overrides: ProviderOverrides,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: d_max_iterations(),
            tools: Vec::new(),
            provider_overrides: ProviderOverrides::default(),
        }
    }
}

/// Per-call overrides layered on top of a provider's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderOverrides {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn d_max_iterations() -> u32 {
    10
}

/// Idle-eviction policy for the in-memory session store (supplemented
/// ambient feature; spec.md §4.3 allows "evicted by store policy").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStoreConfig {
    /// Sessions idle longer than this are eligible for eviction.
    /// `None` disables idle eviction.
    #[serde(default = "d_idle_minutes")]
    pub idle_eviction_minutes: Option<u64>,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            idle_eviction_minutes: d_idle_minutes(),
        }
    }
}

fn d_idle_minutes() -> Option<u64> {
    Some(120)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_iterations_is_ten() {
        assert_eq!(SessionConfig::default().max_iterations, 10);
    }

    #[test]
    fn default_store_config_has_idle_eviction() {
        assert_eq!(SessionStoreConfig::default().idle_eviction_minutes, Some(120));
    }

    #[test]
    fn deserialize_empty_session_config_uses_defaults() {
        let cfg: SessionConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.max_iterations, 10);
        assert!(cfg.tools.is_empty());
    }
}
