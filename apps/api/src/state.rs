use std::sync::Arc;

use wipeout_application::WipeoutService;
use wipeout_domain::BrandRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub brand_registry: Arc<BrandRegistry>,
    /// `None` when the cloud clients could not be constructed at startup.
    pub wipeout_service: Option<WipeoutService>,
}
