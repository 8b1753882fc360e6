use std::sync::Arc;

use crate::auth::{IdentityProvider, SessionKeys, StateSigner};
use crate::config::AppConfig;
use crate::database::WorkoutStore;
use crate::revalidate::Revalidator;

/// Shared handles injected into every handler. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn WorkoutStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionKeys,
    pub oauth_state: StateSigner,
    pub revalidator: Revalidator,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn WorkoutStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let sessions = SessionKeys::new(
            &config.security.session_secret,
            config.security.session_expiry_hours,
        );
        let oauth_state = StateSigner::new(&config.security.session_secret);

        Self {
            config: Arc::new(config),
            store,
            identity,
            sessions,
            oauth_state,
            revalidator: Revalidator::new(),
        }
    }
}
