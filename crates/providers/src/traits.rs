use cueso_domain::error::Result;
use cueso_domain::stream::{BoxStream, ProviderEvent};
use cueso_domain::tool::{Message, ToolDefinition};

/// A provider-agnostic chat completion request (spec.md §4.1).
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

/// Trait every LLM adapter implements.
///
/// Implementations translate between [`Message`]/[`ToolDefinition`] and a
/// vendor's wire format, normalizing streaming output to [`ProviderEvent`].
/// A single operation covers both tool-using and plain turns: streaming is
/// the only mode spec.md requires.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start a streaming chat completion. The returned stream always
    /// terminates with exactly one `ProviderEvent::MessageEnd`.
    async fn stream(&self, req: ChatRequest) -> Result<BoxStream<'static, Result<ProviderEvent>>>;

    /// A unique identifier for this provider instance, as configured.
    fn provider_id(&self) -> &str;
}
