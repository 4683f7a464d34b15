//! Connection helpers for the service's two backends: Redis (the work
//! queue) and PostgreSQL (the device-token store).
//!
//! Both connectors verify the connection at startup and offer a retrying
//! variant for use during process boot, where the backend may still be
//! coming up.
//!
//! ```ignore
//! let redis =
//!     database::redis::connect_with_retry(&cfg.redis_url(), cfg.response_timeout(), None).await?;
//! let db = database::postgres::connect_with_retry(&pg_cfg, None).await?;
//! ```

pub mod error;
pub mod postgres;
pub mod redis;
pub mod retry;

pub use error::{DatabaseError, DatabaseResult};
pub use retry::RetryConfig;
