//! Anthropic Messages API adapter.
//!
//! Anthropic puts system messages in a top-level `system` field, represents
//! tool calls as `tool_use` content blocks, and streams tool-call arguments
//! as incremental `input_json_delta` fragments keyed by content-block index.
//! This module absorbs all of that into the normalized [`ProviderEvent`]
//! contract.

use crate::traits::{ChatRequest, LlmProvider};
use crate::util::{from_reqwest, resolve_api_key};
use cueso_domain::config::ProviderConfig;
use cueso_domain::error::{Error, Result};
use cueso_domain::stream::{BoxStream, FinishReason, ProviderEvent};
use cueso_domain::tool::{Message, Role, ToolDefinition};
use serde_json::Value;
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg
                .default_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            client,
        })
    }

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    fn build_messages_body(&self, req: &ChatRequest) -> Value {
        let model = req.model.clone().unwrap_or_else(|| self.default_model.clone());

        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages: Vec<Value> = Vec::new();

        for msg in &req.messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.clone()),
                Role::User => api_messages.push(user_msg_to_anthropic(msg)),
                Role::Assistant => api_messages.push(assistant_msg_to_anthropic(msg)),
                Role::Tool => api_messages.push(tool_result_to_anthropic(msg)),
            }
        }

        let mut body = serde_json::json!({
            "model": model,
            "messages": api_messages,
            "stream": true,
            "max_tokens": req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if !system_parts.is_empty() {
            body["system"] = Value::String(system_parts.join("\n\n"));
        }
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req.tools.iter().map(tool_to_anthropic).collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(temp) = req.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        body
    }
}

fn user_msg_to_anthropic(msg: &Message) -> Value {
    serde_json::json!({ "role": "user", "content": msg.content })
}

fn assistant_msg_to_anthropic(msg: &Message) -> Value {
    let mut content: Vec<Value> = Vec::new();
    if !msg.content.is_empty() {
        content.push(serde_json::json!({ "type": "text", "text": msg.content }));
    }
    for tc in &msg.tool_calls {
        content.push(serde_json::json!({
            "type": "tool_use",
            "id": tc.id,
            "name": tc.name,
            "input": tc.arguments,
        }));
    }
    serde_json::json!({ "role": "assistant", "content": content })
}

fn tool_result_to_anthropic(msg: &Message) -> Value {
    let tool_use_id = msg.tool_call_id.clone().unwrap_or_default();
    serde_json::json!({
        "role": "user",
        "content": [{
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": msg.content,
        }],
    })
}

fn tool_to_anthropic(tool: &ToolDefinition) -> Value {
    serde_json::json!({
        "name": tool.name,
        "description": tool.description,
        "input_schema": tool.input_schema,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Streaming
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Tracks open `tool_use` content blocks by their Anthropic block index,
/// remapped to the driver-facing positional `index` used in `ProviderEvent`.
struct StreamState {
    open: HashMap<u64, usize>,
    next_index: usize,
    end_emitted: bool,
}

impl StreamState {
    fn new() -> Self {
        Self {
            open: HashMap::new(),
            next_index: 0,
            end_emitted: false,
        }
    }
}

fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" => FinishReason::EndTurn,
        "tool_use" => FinishReason::ToolUse,
        "max_tokens" => FinishReason::Length,
        "stop_sequence" => FinishReason::StopSequence,
        _ => FinishReason::EndTurn,
    }
}

fn parse_anthropic_sse(data: &str, state: &mut StreamState) -> Vec<Result<ProviderEvent>> {
    let mut events = Vec::new();

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(Error::Json(e))],
    };

    let event_type = v.get("type").and_then(Value::as_str).unwrap_or("");

    match event_type {
        "content_block_start" => {
            let block_idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some(block) = v.get("content_block") {
                if block.get("type").and_then(Value::as_str) == Some("tool_use") {
                    let id = block.get("id").and_then(Value::as_str).unwrap_or("").to_string();
                    let name = block.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                    let index = state.next_index;
                    state.next_index += 1;
                    state.open.insert(block_idx, index);
                    events.push(Ok(ProviderEvent::ToolCallStart { index, id, name }));
                }
            }
        }

        "content_block_delta" => {
            let block_idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some(delta) = v.get("delta") {
                match delta.get("type").and_then(Value::as_str).unwrap_or("") {
                    "text_delta" => {
                        if let Some(text) = delta.get("text").and_then(Value::as_str) {
                            if !text.is_empty() {
                                events.push(Ok(ProviderEvent::ContentDelta { text: text.to_string() }));
                            }
                        }
                    }
                    "input_json_delta" => {
                        if let Some(partial) = delta.get("partial_json").and_then(Value::as_str) {
                            if let Some(&index) = state.open.get(&block_idx) {
                                events.push(Ok(ProviderEvent::ToolCallArgDelta {
                                    index,
                                    json_fragment: partial.to_string(),
                                }));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }

        "content_block_stop" => {
            let block_idx = v.get("index").and_then(Value::as_u64).unwrap_or(0);
            if let Some(index) = state.open.remove(&block_idx) {
                events.push(Ok(ProviderEvent::ToolCallEnd { index }));
            }
        }

        "message_delta" => {
            if let Some(reason) = v.get("delta").and_then(|d| d.get("stop_reason")).and_then(Value::as_str) {
                state.end_emitted = true;
                events.push(Ok(ProviderEvent::MessageEnd { finish_reason: map_stop_reason(reason) }));
            }
        }

        "message_stop" => {
            if !state.end_emitted {
                state.end_emitted = true;
                events.push(Ok(ProviderEvent::MessageEnd { finish_reason: FinishReason::EndTurn }));
            }
        }

        "error" => {
            let msg = v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("unknown anthropic error");
            state.end_emitted = true;
            events.push(Err(Error::Provider {
                provider: "anthropic".into(),
                message: msg.to_string(),
            }));
        }

        _ => {}
    }

    events
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn stream(&self, req: ChatRequest) -> Result<BoxStream<'static, Result<ProviderEvent>>> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_messages_body(&req);

        tracing::debug!(provider = %self.id, %url, "anthropic stream request");

        let resp = self.authed_post(&url).json(&body).send().await.map_err(from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(from_reqwest)?;
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), text),
            });
        }

        let mut state = StreamState::new();
        Ok(crate::sse::sse_response_stream(resp, move |data| {
            parse_anthropic_sse(data, &mut state)
        }))
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_stop_reason_covers_known_values() {
        assert_eq!(map_stop_reason("end_turn"), FinishReason::EndTurn);
        assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolUse);
        assert_eq!(map_stop_reason("max_tokens"), FinishReason::Length);
        assert_eq!(map_stop_reason("stop_sequence"), FinishReason::StopSequence);
    }

    #[test]
    fn content_block_start_assigns_sequential_indices() {
        let mut state = StreamState::new();
        let data = r#"{"type":"content_block_start","index":3,"content_block":{"type":"tool_use","id":"call_1","name":"find_content"}}"#;
        let events = parse_anthropic_sse(data, &mut state);
        match &events[0] {
            Ok(ProviderEvent::ToolCallStart { index, id, name }) => {
                assert_eq!(*index, 0);
                assert_eq!(id, "call_1");
                assert_eq!(name, "find_content");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn text_delta_emits_content_delta() {
        let mut state = StreamState::new();
        let data = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"hi"}}"#;
        let events = parse_anthropic_sse(data, &mut state);
        assert!(matches!(&events[0], Ok(ProviderEvent::ContentDelta { text }) if text == "hi"));
    }

    #[test]
    fn message_delta_with_stop_reason_emits_message_end() {
        let mut state = StreamState::new();
        let data = r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"}}"#;
        let events = parse_anthropic_sse(data, &mut state);
        assert!(matches!(
            &events[0],
            Ok(ProviderEvent::MessageEnd { finish_reason: FinishReason::ToolUse })
        ));
        assert!(state.end_emitted);
    }

    #[test]
    fn error_event_surfaces_as_provider_error() {
        let mut state = StreamState::new();
        let data = r#"{"type":"error","error":{"message":"overloaded"}}"#;
        let events = parse_anthropic_sse(data, &mut state);
        match &events[0] {
            Err(Error::Provider { message, .. }) => assert_eq!(message, "overloaded"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
