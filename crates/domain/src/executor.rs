use crate::error::Result;
use crate::tool::{ToolCall, ToolDefinition, ToolResult};
use async_trait::async_trait;

/// Something that can execute a single tool call and produce its result
/// (spec.md C3: both the direct Roku-ECP executor and the remote
/// tool-server client implement this).
///
/// Implementations never propagate tool-level failures as `Err` — a failed
/// invocation (device unreachable, bad remote-server status) is a
/// `ToolResult{error: true}`, not an executor error. `Err` is reserved for
/// calls to tools this executor does not own.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// The tool definitions this executor can serve.
    fn catalog(&self) -> Vec<ToolDefinition>;

    /// Execute one call. Returns `Err` only if `call.name` is not in
    /// [`Self::catalog`].
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;
}
