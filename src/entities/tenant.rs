//! Tenant entity - one row per business-owner account.
//!
//! Carries the activation expiry granted by activation codes and the flag that
//! records whether the cached dashboard summary has been bootstrapped.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Tenant database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    /// Account identifier issued by the authentication provider
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Business name shown in the UI
    pub display_name: String,
    /// Account access is granted until this instant, None if never activated
    pub activation_expires_at: Option<DateTimeUtc>,
    /// Set once the summary cache has been fully recomputed for this tenant
    pub summary_migrated: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Tenant and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One tenant has many clients
    #[sea_orm(has_many = "super::client::Entity")]
    Clients,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
