//! The direct Roku-ECP tool executor (spec.md C3.1).
//!
//! Validates arguments against each tool's JSON Schema before dispatching to
//! the device, and turns both validation failures and ECP-level errors into
//! `ToolResult{error: true}` rather than propagating them — only an unknown
//! tool name is a hard `Err`.

use crate::roku::RokuClient;
use crate::search::SearchClient;
use async_trait::async_trait;
use cueso_domain::error::{Error, Result};
use cueso_domain::executor::ToolExecutor;
use cueso_domain::tool::{ToolCall, ToolDefinition, ToolResult};
use serde_json::json;
use std::time::Duration;

pub struct DirectToolExecutor {
    client: RokuClient,
    search: SearchClient,
}

impl DirectToolExecutor {
    pub fn new(
        device_base_url: impl Into<String>,
        search_base_url: impl Into<String>,
        request_timeout_ms: u64,
    ) -> Result<Self> {
        let timeout = Duration::from_millis(request_timeout_ms);
        Ok(Self {
            client: RokuClient::new(device_base_url, timeout)?,
            search: SearchClient::new(search_base_url, timeout)?,
        })
    }

    async fn dispatch(&self, call: &ToolCall) -> std::result::Result<String, String> {
        let args = &call.arguments;
        match call.name.as_str() {
            "find_content" => {
                let title = args.get("title").and_then(|v| v.as_str()).ok_or("missing 'title'")?;
                let media_type = args.get("media_type").and_then(|v| v.as_str());
                let season = args.get("season").and_then(|v| v.as_i64());
                let episode = args.get("episode").and_then(|v| v.as_i64());
                let matches = self
                    .search
                    .find_content(title, media_type, season, episode)
                    .await
                    .map_err(|e| e.to_string())?;
                serde_json::to_string(&json!({ "success": true, "matches": matches }))
                    .map_err(|e| e.to_string())
            }
            "launch_content" => {
                let channel_id = args.get("channel_id").and_then(|v| v.as_i64()).ok_or("missing 'channel_id'")?;
                let content_id =
                    args.get("content_id").and_then(|v| v.as_str()).ok_or("missing 'content_id'")?;
                let media_type =
                    args.get("media_type").and_then(|v| v.as_str()).ok_or("missing 'media_type'")?;
                self.client
                    .launch_content(channel_id, content_id, media_type)
                    .await
                    .map(|_| format!("launched channel {channel_id}"))
                    .map_err(|e| e.to_string())
            }
            "get_device_info" => self.client.get_device_info().await.map_err(|e| e.to_string()),
            "get_active_app" => self.client.get_active_app().await.map_err(|e| e.to_string()),
            "send_key" => {
                let key = args.get("key").and_then(|v| v.as_str()).ok_or("missing 'key'")?;
                self.client
                    .send_key(key)
                    .await
                    .map(|_| format!("sent key {key}"))
                    .map_err(|e| e.to_string())
            }
            other => return Err(format!("unknown tool {other}")),
        }
    }
}

#[async_trait]
impl ToolExecutor for DirectToolExecutor {
    fn catalog(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "find_content".into(),
                description: "Search for playable content by title via the external search provider.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "media_type": { "type": "string", "enum": ["movie", "tv", "episode"] },
                        "season": { "type": "integer" },
                        "episode": { "type": "integer" }
                    },
                    "required": ["title"]
                }),
                pause_after: true,
            },
            ToolDefinition {
                name: "launch_content".into(),
                description: "Launch specific content on the Roku by channel id.".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "channel_id": { "type": "integer" },
                        "content_id": { "type": "string" },
                        "media_type": { "type": "string" }
                    },
                    "required": ["channel_id", "content_id", "media_type"]
                }),
                pause_after: false,
            },
            ToolDefinition {
                name: "get_device_info".into(),
                description: "Fetch the device's model, serial, and firmware descriptor.".into(),
                input_schema: json!({ "type": "object", "properties": {} }),
                pause_after: false,
            },
            ToolDefinition {
                name: "get_active_app".into(),
                description: "Fetch the currently foregrounded app.".into(),
                input_schema: json!({ "type": "object", "properties": {} }),
                pause_after: false,
            },
            ToolDefinition {
                name: "send_key".into(),
                description: "Inject a remote-control keypress (e.g. Home, Select, Play).".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": { "key": { "type": "string" } },
                    "required": ["key"]
                }),
                pause_after: false,
            },
        ]
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let def = self
            .catalog()
            .into_iter()
            .find(|d| d.name == call.name)
            .ok_or_else(|| Error::Tool {
                tool: call.name.clone(),
                message: "not served by the direct executor".into(),
            })?;

        if let Ok(validator) = jsonschema::validator_for(&def.input_schema) {
            if let Err(first) = validator.validate(&call.arguments) {
                return Ok(ToolResult::err(
                    call.id.clone(),
                    format!("argument validation failed: {first}"),
                ));
            }
        }

        match self.dispatch(call).await {
            Ok(content) => Ok(ToolResult::ok(call.id.clone(), content)),
            Err(message) => Ok(ToolResult::err(call.id.clone(), message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_executor() -> DirectToolExecutor {
        DirectToolExecutor::new("http://127.0.0.1:8060", "http://127.0.0.1:9090", 1000).unwrap()
    }

    #[tokio::test]
    async fn unknown_tool_name_is_an_error() {
        let executor = test_executor();
        let call = ToolCall {
            id: "c1".into(),
            name: "reboot_universe".into(),
            arguments: json!({}),
        };
        assert!(executor.execute(&call).await.is_err());
    }

    #[tokio::test]
    async fn missing_required_argument_yields_error_result_not_dispatch() {
        let executor = test_executor();
        let call = ToolCall {
            id: "c1".into(),
            name: "find_content".into(),
            arguments: json!({}),
        };
        let result = executor.execute(&call).await.unwrap();
        assert!(result.error);
        assert_eq!(result.tool_call_id, "c1");
    }

    #[test]
    fn catalog_marks_find_content_as_pause_after() {
        let executor = test_executor();
        let find = executor.catalog().into_iter().find(|d| d.name == "find_content").unwrap();
        assert!(find.pause_after);
    }

    #[test]
    fn catalog_does_not_pause_after_launch_content() {
        let executor = test_executor();
        let launch = executor.catalog().into_iter().find(|d| d.name == "launch_content").unwrap();
        assert!(!launch.pause_after);
    }
}
