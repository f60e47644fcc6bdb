//! Client growth entity - clients added per calendar month, per tenant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Client growth bucket database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "client_growth")]
pub struct Model {
    /// Owning tenant
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: String,
    /// Bucket key, `YYYY-MM`
    #[sea_orm(primary_key, auto_increment = false)]
    pub month: String,
    /// Clients created in that month
    pub clients: i64,
}

/// `ClientGrowth` has no navigable relationships
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
