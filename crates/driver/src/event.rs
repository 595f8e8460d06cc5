//! Events the driver loop emits, translated verbatim to wire events by
//! the streaming bridge (spec.md §4.4, §6).

use cueso_domain::stream::FinishReason;

#[derive(Debug, Clone)]
pub enum DriverEvent {
    ContentDelta {
        text: String,
    },
    /// Emitted once per tool-call start (`input_fragment: None`) and once
    /// per argument fragment (`input_fragment: Some(_)`).
    ToolCallDelta {
        id: String,
        name: String,
        input_fragment: Option<String>,
    },
    MessageComplete {
        content: String,
        tool_call_names: Vec<String>,
        finish_reason: FinishReason,
    },
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        result: String,
        error: bool,
    },
    /// Terminal. Exactly one per `run` call, always last.
    Final {
        content: String,
        tool_call_names: Vec<String>,
        iteration_count: u32,
        paused: bool,
    },
}
