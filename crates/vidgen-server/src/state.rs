use std::sync::Arc;

use vidgen_core::app::AppHandle;

use crate::config::ServerConfig;

/// Shared application state available to all handlers.
///
/// Cheaply cloneable: everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Store, uploads and run queue of the generation core.
    pub app: AppHandle,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
