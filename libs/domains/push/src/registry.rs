//! Process-wide app id to vendor client mapping.
//!
//! Built once at startup from the vendor credential maps; read-only and
//! shared via `Arc` afterwards. A missing app id is an explicit
//! `ConfigMissing` error at dispatch time, never a panic.

use crate::config::PushConfig;
use crate::error::PushResult;
use crate::vendors::{ApnsClient, ApnsConfig, FcmClient, VendorClient};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// App id -> vendor client, immutable after construction.
pub struct ClientRegistry {
    clients: HashMap<String, Arc<dyn VendorClient>>,
}

impl ClientRegistry {
    /// An empty registry; used by tests and as the base for `insert`.
    pub fn empty() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    /// Build every vendor client declared in the configuration.
    ///
    /// APNs clients come from `apple_push_config.items` (keyed by bundle
    /// id), FCM clients from `firebase_push_config.items` (keyed by package
    /// name). A bad credential set fails startup with the offending app id.
    pub fn from_config(config: &PushConfig) -> PushResult<Self> {
        let mut registry = Self::empty();

        for (bundle_id, item) in &config.apple_push_config.items {
            let client = ApnsClient::new(
                ApnsConfig {
                    bundle_id: bundle_id.clone(),
                    auth_key: item.auth_key.clone(),
                    key_id: item.key_id.clone(),
                    team_id: item.team_id.clone(),
                },
                &config.mode,
            )?;
            registry.insert(bundle_id.clone(), Arc::new(client));
        }

        for (package_name, item) in &config.firebase_push_config.items {
            let client =
                FcmClient::from_service_account_json(package_name, &item.service_account_file_content)?;
            registry.insert(package_name.clone(), Arc::new(client));
        }

        for orphan in config.unmatched_client_ids() {
            warn!(app_id = %orphan, "client_config entry has no vendor credentials");
        }

        info!(clients = registry.len(), "Built vendor client registry");
        Ok(registry)
    }

    /// Register a client under an app id.
    pub fn insert(&mut self, app_id: impl Into<String>, client: Arc<dyn VendorClient>) {
        self.clients.insert(app_id.into(), client);
    }

    /// Look up the client for an app id.
    pub fn lookup(&self, app_id: &str) -> Option<Arc<dyn VendorClient>> {
        self.clients.get(app_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Registered app ids, for startup logs.
    pub fn app_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }
}
