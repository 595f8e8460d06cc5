mod llm;
mod observability;
mod server;
mod session;
mod tools;

pub use llm::{AuthConfig, LlmConfig, ProviderConfig, ProviderKind};
pub use observability::ObservabilityConfig;
pub use server::{CorsConfig, ServerConfig};
pub use session::{ProviderOverrides, SessionConfig, SessionStoreConfig};
pub use tools::{DirectToolConfig, RemoteToolServerConfig, ToolCatalogConfig};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The process-wide configuration, loaded once at startup (spec.md §4.6
/// "statically built from configuration at process start").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolCatalogConfig,
    #[serde(default)]
    pub session_store: SessionStoreConfig,
    #[serde(default)]
    pub default_session: SessionConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. Empty vec
    /// means the config is ready to serve.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.llm.providers.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.providers".into(),
                message: "no LLM providers configured".into(),
            });
        }

        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: "provider id must not be empty".into(),
                });
            }
            if provider.base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].base_url"),
                    message: "provider base_url must not be empty".into(),
                });
            }
            if !provider.id.is_empty() && !seen_ids.insert(&provider.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("llm.providers[{i}].id"),
                    message: format!("duplicate provider id \"{}\"", provider.id),
                });
            }
        }

        if let Some(direct) = &self.tools.direct {
            if direct.device_base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "tools.direct.device_base_url".into(),
                    message: "device_base_url must not be empty".into(),
                });
            }
            if direct.search_base_url.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: "tools.direct.search_base_url".into(),
                    message: "search_base_url must not be empty".into(),
                });
            }
        }

        let mut seen_server_ids: HashSet<&str> = HashSet::new();
        for (i, server) in self.tools.remote_servers.iter().enumerate() {
            if server.endpoint.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("tools.remote_servers[{i}].endpoint"),
                    message: "endpoint must not be empty".into(),
                });
            }
            if !server.id.is_empty() && !seen_server_ids.insert(&server.id) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("tools.remote_servers[{i}].id"),
                    message: format!("duplicate server id \"{}\"", server.id),
                });
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_errors_only_the_no_providers_warning() {
        let errors = Config::default().validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].severity, ConfigSeverity::Warning);
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn duplicate_provider_ids_are_an_error() {
        let mut cfg = Config::default();
        cfg.llm.providers.push(ProviderConfig {
            id: "a".into(),
            kind: ProviderKind::Anthropic,
            base_url: "https://api.anthropic.com".into(),
            auth: AuthConfig { env: Some("KEY".into()), key: None },
            default_model: Some("claude".into()),
            default_temperature: None,
            default_max_tokens: None,
        });
        cfg.llm.providers.push(ProviderConfig {
            id: "a".into(),
            kind: ProviderKind::Anthropic,
            base_url: "https://api.anthropic.com".into(),
            auth: AuthConfig { env: Some("KEY".into()), key: None },
            default_model: Some("claude".into()),
            default_temperature: None,
            default_max_tokens: None,
        });
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("duplicate provider id")));
    }
}
