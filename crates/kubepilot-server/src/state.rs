use std::sync::Arc;

use kubepilot::tools::ToolRegistry;

use crate::configuration::AgentSettings;

/// Shared application state. The registry is built once at startup and read
/// concurrently by every request; provider handles are per-request and never
/// stored here.
#[derive(Clone)]
pub struct AppState {
    pub agent_settings: AgentSettings,
    pub registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(agent_settings: AgentSettings) -> Self {
        Self {
            agent_settings,
            registry: Arc::new(ToolRegistry::with_defaults()),
        }
    }
}
