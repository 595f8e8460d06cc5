//! Manages connections to all configured remote tool-servers and
//! orchestrates tool discovery + dispatch (spec.md C3.2).

use crate::protocol::{self, RemoteToolDef, ToolCallResult, ToolsListResult};
use crate::transport::{HttpTransport, TransportError};
use async_trait::async_trait;
use cueso_domain::config::RemoteToolServerConfig;
use cueso_domain::executor::ToolExecutor;
use cueso_domain::tool::{ToolCall, ToolDefinition, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub struct RemoteServer {
    pub id: String,
    pub tools: Vec<RemoteToolDef>,
    transport: HttpTransport,
}

impl RemoteServer {
    async fn initialize(config: &RemoteToolServerConfig) -> Result<Self, ToolServerError> {
        let transport = HttpTransport::new(
            config.endpoint.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
        .map_err(ToolServerError::Transport)?;

        let init_params = protocol::initialize_params();
        let params_value = serde_json::to_value(&init_params)
            .map_err(|e| ToolServerError::Protocol(format!("failed to serialize initialize params: {e}")))?;

        let resp = transport
            .send_request("initialize", Some(params_value))
            .await
            .map_err(ToolServerError::Transport)?;

        if resp.is_error() {
            return Err(ToolServerError::Protocol(format!(
                "initialize failed: {}",
                resp.error.unwrap()
            )));
        }

        transport
            .send_notification("notifications/initialized")
            .await
            .map_err(ToolServerError::Transport)?;

        let tools_resp = transport
            .send_request("tools/list", None)
            .await
            .map_err(ToolServerError::Transport)?;

        let tools = if tools_resp.is_error() {
            tracing::warn!(server_id = %config.id, "tools/list returned error, server will have no tools");
            Vec::new()
        } else {
            let result_value = tools_resp.result.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolsListResult>(result_value) {
                Ok(r) => r.tools,
                Err(e) => {
                    tracing::warn!(server_id = %config.id, error = %e, "failed to parse tools/list result");
                    Vec::new()
                }
            }
        };

        tracing::info!(server_id = %config.id, tool_count = tools.len(), "remote tool-server initialized");

        Ok(Self {
            id: config.id.clone(),
            tools,
            transport,
        })
    }

    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult, ToolServerError> {
        let params = serde_json::json!({ "name": tool_name, "arguments": arguments });
        let resp = self
            .transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(ToolServerError::Transport)?;

        if resp.is_error() {
            return Err(ToolServerError::Protocol(format!(
                "tools/call failed: {}",
                resp.error.unwrap()
            )));
        }

        let result_value = resp.result.unwrap_or(Value::Null);
        serde_json::from_value::<ToolCallResult>(result_value)
            .map_err(|e| ToolServerError::Protocol(format!("failed to parse tools/call result: {e}")))
    }
}

pub struct ToolServerManager {
    servers: HashMap<String, RemoteServer>,
    configs: Vec<RemoteToolServerConfig>,
}

impl ToolServerManager {
    pub fn empty() -> Self {
        Self { servers: HashMap::new(), configs: Vec::new() }
    }

    /// Initialize from config. Servers that fail the handshake are logged
    /// and skipped rather than failing the whole manager.
    pub async fn from_config(configs: &[RemoteToolServerConfig]) -> Self {
        let servers = Self::connect_all(configs).await;
        Self { servers, configs: configs.to_vec() }
    }

    /// Re-runs the handshake against every configured server and returns a
    /// fresh manager reflecting current reachability. A server that comes
    /// back online after being dropped at startup is picked up here; one
    /// taken down reports no tools on the next catalog build. Callers swap
    /// the gateway's `ToolRegistry` to pick up the result — the registry
    /// itself stays read-only for the lifetime of a built catalog.
    pub async fn reconnect(&self) -> Self {
        let servers = Self::connect_all(&self.configs).await;
        Self { servers, configs: self.configs.clone() }
    }

    async fn connect_all(configs: &[RemoteToolServerConfig]) -> HashMap<String, RemoteServer> {
        let mut servers = HashMap::new();
        for cfg in configs {
            tracing::info!(server_id = %cfg.id, endpoint = %cfg.endpoint, "initializing remote tool-server");
            match RemoteServer::initialize(cfg).await {
                Ok(server) => {
                    servers.insert(cfg.id.clone(), server);
                }
                Err(e) => {
                    tracing::warn!(server_id = %cfg.id, error = %e, "failed to initialize remote tool-server, skipping");
                }
            }
        }
        servers
    }

    pub fn list_tools(&self) -> Vec<(&str, &RemoteToolDef)> {
        self.servers
            .values()
            .flat_map(|server| server.tools.iter().map(move |tool| (server.id.as_str(), tool)))
            .collect()
    }

    /// Find which server owns a tool name and dispatch the call to it.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<ToolCallResult, ToolServerError> {
        let server = self
            .servers
            .values()
            .find(|s| s.tools.iter().any(|t| t.name == tool_name))
            .ok_or_else(|| ToolServerError::ToolNotFound(tool_name.to_string()))?;

        server.call_tool(tool_name, arguments).await
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn tool_count(&self) -> usize {
        self.servers.values().map(|s| s.tools.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolServerManager {
    fn catalog(&self) -> Vec<ToolDefinition> {
        self.list_tools()
            .into_iter()
            .map(|(_, def)| ToolDefinition {
                name: def.name.clone(),
                description: def.description.clone(),
                input_schema: def.input_schema.clone(),
                pause_after: false,
            })
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> cueso_domain::error::Result<ToolResult> {
        if !self.list_tools().iter().any(|(_, def)| def.name == call.name) {
            return Err(cueso_domain::error::Error::Tool {
                tool: call.name.clone(),
                message: "not served by any remote tool-server".into(),
            });
        }

        match self.call_tool(&call.name, call.arguments.clone()).await {
            Ok(result) => {
                let text = result
                    .content
                    .into_iter()
                    .map(|c| c.text)
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(if result.is_error {
                    ToolResult::err(call.id.clone(), text)
                } else {
                    ToolResult::ok(call.id.clone(), text)
                })
            }
            Err(e) => Ok(ToolResult::err(call.id.clone(), e.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolServerError {
    #[error("tool-server transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("tool-server protocol error: {0}")]
    Protocol(String),
    #[error("no remote server serves tool: {0}")]
    ToolNotFound(String),
}

impl From<ToolServerError> for cueso_domain::error::Error {
    fn from(e: ToolServerError) -> Self {
        cueso_domain::error::Error::Tool {
            tool: "remote".into(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_manager_has_no_servers() {
        let manager = ToolServerManager::empty();
        assert!(manager.is_empty());
        assert_eq!(manager.tool_count(), 0);
    }

    #[tokio::test]
    async fn reconnecting_an_empty_manager_stays_empty() {
        let manager = ToolServerManager::empty();
        let reconnected = manager.reconnect().await;
        assert!(reconnected.is_empty());
    }
}
