//! Sea-ORM entity for the device-token store.

use crate::resolver::DeviceBinding;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One registered device token for a (user, app) pair.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_platform_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Token platform discriminator (1 = FCM, 2 = APNs device token).
    pub platform: i16,
    pub user_id: String,
    pub device_id: String,
    pub token: String,
    pub app_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DeviceBinding {
    fn from(model: Model) -> Self {
        Self {
            app_id: model.app_id,
            token: model.token,
            user_id: if model.user_id.is_empty() {
                None
            } else {
                Some(model.user_id)
            },
        }
    }
}
