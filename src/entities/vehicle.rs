//! Vehicle entity - a car owned by a client.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vehicle database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    /// Unique identifier for the vehicle
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub tenant_id: String,
    /// Owning client
    pub client_id: i64,
    /// Manufacturer (e.g., "Toyota")
    pub make: String,
    /// Model name (e.g., "Corolla")
    #[sea_orm(column_name = "model")]
    pub model_name: String,
    /// Model year, if known
    pub year: Option<i32>,
    /// License plate, if known
    pub license_plate: Option<String>,
    /// When the vehicle was added
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Vehicle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each vehicle belongs to one client
    #[sea_orm(
        belongs_to = "super::client::Entity",
        from = "Column::ClientId",
        to = "super::client::Column::Id"
    )]
    Client,
    /// One vehicle has many service records
    #[sea_orm(has_many = "super::service_record::Entity")]
    ServiceRecords,
}

impl Related<super::client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Client.def()
    }
}

impl Related<super::service_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
