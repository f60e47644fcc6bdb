//! User summary entity - cached dashboard totals, one row per tenant.
//!
//! The row is derived data and can always be rebuilt from the client tree.
//! Every write bumps `version`, which the bootstrap recompute uses as a
//! compare-and-swap guard.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User summary database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_summaries")]
pub struct Model {
    /// Tenant this summary belongs to
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    /// Sum of all service costs
    pub total_revenue: f64,
    /// Number of clients
    pub total_clients: i64,
    /// Number of service records
    pub total_services: i64,
    /// Incremented by every write to the summary caches
    pub version: i64,
    /// When the summary was last written
    pub updated_at: DateTimeUtc,
}

/// `UserSummary` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
