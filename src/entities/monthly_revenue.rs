//! Monthly revenue entity - revenue recognized per calendar month, per tenant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Monthly revenue bucket database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_revenue")]
pub struct Model {
    /// Owning tenant
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    /// Bucket key, `YYYY-MM`
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: String,
    /// Sum of service costs whose start date falls in the month
    pub revenue: f64,
    /// When the bucket was last written
    pub updated_at: DateTimeUtc,
}

/// `MonthlyRevenue` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
