//! Service record entity - one detailing job performed on a vehicle.
//!
//! `expiration_date` is derived from `start_date` plus the duration whenever either
//! of them is written, and is the only value expiration logic reads.
//! `client_id` is denormalized from the owning vehicle so that tenant-wide queries
//! do not need joins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_records")]
pub struct Model {
    /// Unique identifier for the service record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning tenant
    pub tenant_id: String,
    /// Client who owns the serviced vehicle
    pub client_id: i64,
    /// Serviced vehicle
    pub vehicle_id: i64,
    /// Kind of service (e.g., "Ceramic coating")
    pub service_type: String,
    /// Free-text notes
    pub notes: Option<String>,
    /// Reference to an uploaded photo
    pub image_ref: Option<String>,
    /// Price charged, never negative
    pub cost: f64,
    /// When the service was performed; drives the monthly revenue histogram
    pub start_date: DateTimeUtc,
    /// Length of the protection period, in `duration_unit`
    pub duration_value: i32,
    /// `"days"` or `"months"`
    pub duration_unit: String,
    /// `start_date` plus the duration, as of the last write
    pub expiration_date: DateTimeUtc,
    /// Whether the client already renewed this service
    pub is_renewed: bool,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ServiceRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each service record belongs to one vehicle
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
