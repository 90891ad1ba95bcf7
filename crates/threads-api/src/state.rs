use std::sync::Arc;

use tracing::error;

use crate::error::ApiError;
use crate::notifier::Notifier;
use crate::service::EngagementService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: EngagementService,
    pub notifier: Notifier,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(service: EngagementService, jwt_secret: String) -> AppState {
        Arc::new(Self {
            service,
            notifier: Notifier::new(),
            jwt_secret,
        })
    }
}

/// Run a service call off the async runtime. Store access is blocking.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&EngagementService) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.service))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("worker task failed".into())
        })?
}
