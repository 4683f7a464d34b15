//! Vendor client implementations.
//!
//! `VendorClient` is the seam between the dispatcher and the upstream push
//! services; one implementation per vendor.

mod apns;
mod fcm;

pub use apns::{ApnsClient, ApnsConfig};
pub use fcm::{FcmClient, FcmConfig};

use crate::error::PushResult;
use crate::models::PushJob;
use async_trait::async_trait;

/// Upstream vendor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorKind {
    Apple,
    Fcm,
}

impl std::fmt::Display for VendorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorKind::Apple => write!(f, "apple"),
            VendorKind::Fcm => write!(f, "firebase"),
        }
    }
}

/// A delivery accepted by the vendor.
#[derive(Debug, Clone)]
pub struct VendorReceipt {
    /// Vendor-assigned id for the accepted notification, when provided.
    pub message_id: Option<String>,
}

/// Trait for vendor push clients.
///
/// Implementations must be safe for concurrent use; one instance serves
/// every worker task for the process lifetime.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// Deliver one job to the vendor.
    async fn push(&self, job: &PushJob) -> PushResult<VendorReceipt>;

    /// Which vendor this client talks to.
    fn kind(&self) -> VendorKind;

    /// Client name for logging.
    fn name(&self) -> &'static str;
}
