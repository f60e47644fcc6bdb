//! Activation code entity - single-use codes that grant account access.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Activation code database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_codes")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Uppercase alphanumeric code handed to the customer
    #[sea_orm(unique)]
    pub code: String,
    /// Days of access granted on redemption
    pub validity_days: i32,
    /// Whether the code has been consumed
    pub is_used: bool,
    /// Tenant that consumed the code
    pub used_by: Option<String>,
    /// When the code was consumed
    pub used_at: Option<DateTimeUtc>,
    /// When the code was issued
    pub created_at: DateTimeUtc,
}

/// `ActivationCode` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
