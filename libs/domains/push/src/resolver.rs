//! Device-token resolution.
//!
//! The resolver turns a submission selector into the set of concrete
//! (app id, device token, user id) triples to deliver to. The production
//! implementation queries the relational token store; the static one backs
//! tests and local development.

use crate::entity;
use crate::error::PushResult;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::BTreeSet;
use tracing::debug;

/// A concrete delivery target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DeviceBinding {
    pub app_id: String,
    pub token: String,
    pub user_id: Option<String>,
}

/// What a submission item selects: one app, addressed either by a device
/// token or by a user id. `user_id` wins when both are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSelector {
    pub app_id: String,
    pub token: Option<String>,
    pub user_id: Option<String>,
}

/// External collaborator interface over the device-token store.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Resolve one selector into its delivery targets.
    async fn resolve(&self, selector: &TokenSelector) -> PushResult<Vec<DeviceBinding>>;

    /// Resolve every known target for an app id.
    async fn resolve_app(&self, app_id: &str) -> PushResult<Vec<DeviceBinding>>;
}

/// Resolver over the `user_platform_tokens` table.
pub struct SqlTokenResolver {
    db: DatabaseConnection,
}

impl SqlTokenResolver {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenResolver for SqlTokenResolver {
    async fn resolve(&self, selector: &TokenSelector) -> PushResult<Vec<DeviceBinding>> {
        let mut query =
            entity::Entity::find().filter(entity::Column::AppId.eq(&selector.app_id));

        if let Some(user_id) = &selector.user_id {
            query = query.filter(entity::Column::UserId.eq(user_id));
        } else if let Some(token) = &selector.token {
            query = query.filter(entity::Column::Token.eq(token));
        }

        let models = query.all(&self.db).await?;
        let bindings = distinct(models.into_iter().map(Into::into));

        debug!(
            app_id = %selector.app_id,
            count = bindings.len(),
            "Resolved device bindings"
        );
        Ok(bindings)
    }

    async fn resolve_app(&self, app_id: &str) -> PushResult<Vec<DeviceBinding>> {
        let models = entity::Entity::find()
            .filter(entity::Column::AppId.eq(app_id))
            .all(&self.db)
            .await?;
        Ok(distinct(models.into_iter().map(Into::into)))
    }
}

/// In-memory resolver for tests and local development.
#[derive(Default)]
pub struct StaticTokenResolver {
    bindings: Vec<DeviceBinding>,
}

impl StaticTokenResolver {
    pub fn new(bindings: Vec<DeviceBinding>) -> Self {
        Self { bindings }
    }
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
    async fn resolve(&self, selector: &TokenSelector) -> PushResult<Vec<DeviceBinding>> {
        let matches = self
            .bindings
            .iter()
            .filter(|b| b.app_id == selector.app_id)
            .filter(|b| {
                if let Some(user_id) = &selector.user_id {
                    b.user_id.as_deref() == Some(user_id)
                } else if let Some(token) = &selector.token {
                    b.token == *token
                } else {
                    false
                }
            })
            .cloned();
        Ok(distinct(matches))
    }

    async fn resolve_app(&self, app_id: &str) -> PushResult<Vec<DeviceBinding>> {
        Ok(distinct(
            self.bindings.iter().filter(|b| b.app_id == app_id).cloned(),
        ))
    }
}

/// Distinct triples, in a stable order.
fn distinct(bindings: impl Iterator<Item = DeviceBinding>) -> Vec<DeviceBinding> {
    bindings.collect::<BTreeSet<_>>().into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(app_id: &str, token: &str, user_id: Option<&str>) -> DeviceBinding {
        DeviceBinding {
            app_id: app_id.to_string(),
            token: token.to_string(),
            user_id: user_id.map(String::from),
        }
    }

    fn resolver() -> StaticTokenResolver {
        StaticTokenResolver::new(vec![
            binding("com.x.y", "tok1", Some("u1")),
            binding("com.x.y", "tok2", Some("u1")),
            binding("com.x.y", "tok3", Some("u2")),
            binding("com.other", "tok4", Some("u1")),
            // duplicate row in the store
            binding("com.x.y", "tok1", Some("u1")),
        ])
    }

    #[tokio::test]
    async fn test_resolve_by_user_id() {
        let resolver = resolver();
        let bindings = resolver
            .resolve(&TokenSelector {
                app_id: "com.x.y".to_string(),
                token: None,
                user_id: Some("u1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.user_id.as_deref() == Some("u1")));
    }

    #[tokio::test]
    async fn test_resolve_by_token() {
        let resolver = resolver();
        let bindings = resolver
            .resolve(&TokenSelector {
                app_id: "com.x.y".to_string(),
                token: Some("tok3".to_string()),
                user_id: None,
            })
            .await
            .unwrap();

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].token, "tok3");
    }

    #[tokio::test]
    async fn test_user_id_takes_precedence_over_token() {
        let resolver = resolver();
        let bindings = resolver
            .resolve(&TokenSelector {
                app_id: "com.x.y".to_string(),
                token: Some("tok3".to_string()),
                user_id: Some("u1".to_string()),
            })
            .await
            .unwrap();

        // selector user u1 owns tok1/tok2, not tok3
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.token != "tok3"));
    }

    #[tokio::test]
    async fn test_resolve_app_is_distinct() {
        let resolver = resolver();
        let bindings = resolver.resolve_app("com.x.y").await.unwrap();
        assert_eq!(bindings.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_unknown_app_is_empty() {
        let resolver = resolver();
        assert!(resolver.resolve_app("unknown").await.unwrap().is_empty());
    }
}
