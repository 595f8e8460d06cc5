//! Shared application state passed to all handlers.

use cueso_domain::config::Config;
use cueso_driver::registry::ToolRegistry;
use cueso_providers::ProviderRegistry;
use cueso_sessions::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: Arc<SessionStore>,
}
