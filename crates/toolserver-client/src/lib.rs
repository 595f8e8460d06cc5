//! Client for remote tool-servers speaking a JSON-RPC protocol modeled on
//! MCP (spec.md C3.2).

pub mod manager;
pub mod protocol;
pub mod transport;

pub use manager::{RemoteServer, ToolServerError, ToolServerManager};
pub use protocol::RemoteToolDef;
