//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup
//! the registry reads the [`LlmConfig`], resolves authentication, and
//! instantiates the adapter matching each configured provider's `kind`.
//! A provider that fails to initialize is logged and skipped rather than
//! aborting the whole process; its failure is recorded for reporting
//! rather than surfaced eagerly.

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use cueso_domain::config::{LlmConfig, ProviderKind};
use cueso_domain::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    init_errors: Vec<ProviderInitError>,
}

#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    /// Error message with any API-key-shaped substrings masked.
    pub error: String,
}

/// Mask substrings that look like API keys so they never leak into logs.
fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

impl ProviderRegistry {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut init_errors = Vec::new();

        for pc in &config.providers {
            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::Anthropic => {
                    AnthropicProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    let safe_error = mask_secrets(&e.to_string());
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %safe_error,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push(ProviderInitError {
                        provider_id: pc.id.clone(),
                        error: safe_error,
                    });
                }
            }
        }

        Ok(Self { providers, init_errors })
    }

    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Ids of providers that initialized successfully, for a readiness probe.
    pub fn ready_ids(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_secrets_redacts_long_token_like_words() {
        let msg = "auth failed for key sk-ant-REDACTED";
        let masked = mask_secrets(msg);
        assert!(!masked.contains("ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789"));
        assert!(masked.starts_with("auth failed for key"));
    }

    #[test]
    fn mask_secrets_leaves_short_words_alone() {
        let msg = "provider anthropic-main timed out";
        assert_eq!(mask_secrets(msg), msg);
    }

    #[test]
    fn from_config_with_no_providers_is_empty() {
        let cfg = LlmConfig::default();
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert!(registry.is_empty());
        assert!(registry.init_errors().is_empty());
    }

    #[test]
    fn from_config_skips_provider_missing_auth() {
        let cfg = LlmConfig {
            providers: vec![cueso_domain::config::ProviderConfig {
                id: "anthropic-main".into(),
                kind: ProviderKind::Anthropic,
                base_url: "https://api.anthropic.com".into(),
                auth: Default::default(),
                default_model: None,
                default_temperature: None,
                default_max_tokens: None,
            }],
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert!(registry.get("anthropic-main").is_none());
        assert_eq!(registry.init_errors().len(), 1);
        assert!(registry.ready_ids().is_empty());
    }
}
