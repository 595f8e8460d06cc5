use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A boxed async stream, used for LLM streaming responses.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events emitted during LLM streaming, normalized across vendors.
///
/// A provider's `stream()` call produces a lazy, finite sequence of these
/// that always terminates with exactly one [`ProviderEvent::MessageEnd`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ProviderEvent {
    /// A text fragment of the current assistant turn.
    #[serde(rename = "content_delta")]
    ContentDelta { text: String },

    /// A new tool call announced at a positional slot. `id` is authoritative.
    #[serde(rename = "tool_call_start")]
    ToolCallStart {
        index: usize,
        id: String,
        name: String,
    },

    /// Appends bytes to the JSON arguments of the tool call at `index`.
    /// Individual fragments need not be valid JSON; only the full
    /// concatenation is required to parse once [`ProviderEvent::ToolCallEnd`]
    /// arrives.
    #[serde(rename = "tool_call_arg_delta")]
    ToolCallArgDelta {
        index: usize,
        json_fragment: String,
    },

    /// The call at `index` is complete; its argument buffer is ready to be
    /// parsed as JSON by the driver.
    #[serde(rename = "tool_call_end")]
    ToolCallEnd { index: usize },

    /// Terminal event. Exactly one per `stream()` call.
    #[serde(rename = "message_end")]
    MessageEnd { finish_reason: FinishReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    EndTurn,
    ToolUse,
    Length,
    StopSequence,
    Error,
}
