pub mod config;
pub mod error;
pub mod executor;
pub mod stream;
pub mod tool;

pub use error::{Error, Result};
pub use executor::ToolExecutor;
pub use stream::{BoxStream, FinishReason, ProviderEvent};
pub use tool::{Message, Role, ToolCall, ToolDefinition, ToolResult};
