use serde::{Deserialize, Serialize};

/// Structured-logging configuration, read once at process bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "d_log_level")]
    pub log_level: String,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: d_log_level(),
            json_logs: false,
        }
    }
}

fn d_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_observability_config() {
        let cfg = ObservabilityConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.json_logs);
    }
}
