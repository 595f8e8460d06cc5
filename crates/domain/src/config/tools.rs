use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool registry configuration (C3, C7)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Describes the full catalog the gateway's tool registry assembles:
/// a direct Roku-ECP executor plus zero or more remote tool-servers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolCatalogConfig {
    #[serde(default)]
    pub direct: Option<DirectToolConfig>,
    #[serde(default)]
    pub remote_servers: Vec<RemoteToolServerConfig>,
}

/// The in-process Roku-ECP executor (spec.md C3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectToolConfig {
    /// `http://<roku-ip>:8060` — no scheme/port assumed beyond this field.
    pub device_base_url: String,
    /// Base URL of the external content-search provider `find_content`
    /// calls. Distinct from the Roku device itself — never ECP.
    pub search_base_url: String,
    #[serde(default = "d_direct_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn d_direct_timeout_ms() -> u64 {
    5_000
}

/// A remote tool-server this gateway connects to as a client (spec.md C3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteToolServerConfig {
    pub id: String,
    pub endpoint: String,
    #[serde(default = "d_remote_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn d_remote_timeout_ms() -> u64 {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_catalog_has_no_servers() {
        let cfg = ToolCatalogConfig::default();
        assert!(cfg.direct.is_none());
        assert!(cfg.remote_servers.is_empty());
    }

    #[test]
    fn direct_config_deserializes_with_default_timeout() {
        let json = r#"{"device_base_url":"http://192.168.1.50:8060","search_base_url":"http://search.internal"}"#;
        let cfg: DirectToolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.request_timeout_ms, 5_000);
    }
}
