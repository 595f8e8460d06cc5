//! Wire event schema (spec.md §6): the JSON shapes exchanged with clients
//! over the WebSocket streaming bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server. Unknown fields are ignored by serde's default
/// (non-`deny_unknown_fields`) behavior.
#[derive(Debug, Deserialize)]
pub struct ClientTurn {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "session_created")]
    SessionCreated { session_id: String },

    #[serde(rename = "content_delta")]
    ContentDelta { content: String, role: &'static str },

    #[serde(rename = "tool_call_delta")]
    ToolCallDelta { tool_call: WireToolCallDelta },

    #[serde(rename = "message_complete")]
    MessageComplete {
        content: String,
        tool_calls: Vec<String>,
        finish_reason: cueso_domain::stream::FinishReason,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_name: String,
        tool_call_id: String,
        result: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        error: bool,
    },

    #[serde(rename = "final")]
    Final {
        content: String,
        session_id: String,
        iteration_count: u32,
        paused: bool,
        tool_calls: Vec<String>,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct WireToolCallDelta {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_json: Option<String>,
}

/// Translates one driver event into its wire counterpart. `session_id` is
/// threaded in because `Final` carries it but `DriverEvent::Final` doesn't
/// (the session is implicit for the whole connection in this bridge).
pub fn translate(event: cueso_driver::event::DriverEvent, session_id: &str) -> WireEvent {
    use cueso_driver::event::DriverEvent as D;
    match event {
        D::ContentDelta { text } => WireEvent::ContentDelta { content: text, role: "assistant" },
        D::ToolCallDelta { id, name, input_fragment } => WireEvent::ToolCallDelta {
            tool_call: WireToolCallDelta { id, name, input_json: input_fragment },
        },
        D::MessageComplete { content, tool_call_names, finish_reason } => {
            WireEvent::MessageComplete { content, tool_calls: tool_call_names, finish_reason }
        }
        D::ToolResult { tool_call_id, tool_name, result, error } => {
            WireEvent::ToolResult { tool_name, tool_call_id, result, error }
        }
        D::Final { content, tool_call_names, iteration_count, paused } => WireEvent::Final {
            content,
            session_id: session_id.to_string(),
            iteration_count,
            paused,
            tool_calls: tool_call_names,
        },
    }
}

/// Unused in JSON shapes above, kept to document that unknown inbound
/// fields are intentionally tolerated rather than rejected.
#[allow(dead_code)]
fn _unknown_fields_are_ignored(_: Value) {}

#[cfg(test)]
mod tests {
    use super::*;
    use cueso_domain::stream::FinishReason;
    use cueso_driver::event::DriverEvent;

    #[test]
    fn client_turn_ignores_unknown_fields() {
        let parsed: ClientTurn =
            serde_json::from_str(r#"{"message":"hi","session_id":"s1","bogus":123}"#).unwrap();
        assert_eq!(parsed.message, "hi");
        assert_eq!(parsed.session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn content_delta_translates_with_assistant_role() {
        let event = translate(DriverEvent::ContentDelta { text: "hi".into() }, "s1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "content_delta");
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn final_event_carries_session_id() {
        let event = translate(
            DriverEvent::Final {
                content: "done".into(),
                tool_call_names: vec![],
                iteration_count: 2,
                paused: false,
            },
            "s42",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["session_id"], "s42");
        assert_eq!(json["iteration_count"], 2);
    }

    #[test]
    fn tool_result_error_field_omitted_when_false() {
        let event = translate(
            DriverEvent::ToolResult {
                tool_call_id: "c1".into(),
                tool_name: "send_key".into(),
                result: "ok".into(),
                error: false,
            },
            "s1",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("error").is_none());
        let _ = FinishReason::EndTurn;
    }
}
