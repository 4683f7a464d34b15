//! Shared application state for the API handlers.

use domain_push::{ClientRegistry, PushService, TokenResolver};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Producer-side fan-out service.
    pub service: Arc<PushService>,
    /// Vendor clients, for the synchronous endpoint.
    pub registry: Arc<ClientRegistry>,
    /// Device-token store.
    pub resolver: Arc<dyn TokenResolver>,
}
