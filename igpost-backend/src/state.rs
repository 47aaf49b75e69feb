use std::sync::Arc;

use igpost_client::InstagramApi;
use igpost_config::Config;
use igpost_session::SessionStore;

/// Shared application state passed to every route handler.
pub struct AppState {
    pub config: Arc<Config>,
    pub client: Arc<dyn InstagramApi>,
    pub sessions: Arc<SessionStore>,
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            client: Arc::clone(&self.client),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl AppState {
    /// Build a fully initialised state container from its constituent parts.
    pub fn new(config: Config, client: Arc<dyn InstagramApi>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
