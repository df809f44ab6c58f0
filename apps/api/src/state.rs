use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::CompletionClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Upstream completion backend. Injected at construction so tests can
    /// substitute a mock upstream.
    pub llm: Arc<dyn CompletionClient>,
    pub config: Config,
}
