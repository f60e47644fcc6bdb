//! Vehicle business logic - Handles all vehicle-related operations.
//!
//! Vehicles always belong to a client of the same tenant. Deleting a vehicle removes
//! its service history and takes those services out of the summary caches.

use crate::{
    core::{
        client,
        counters::{self, SummaryDelta},
    },
    entities::{ServiceRecord, Vehicle, service_record, vehicle},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fields entered when adding a vehicle.
#[derive(Debug, Clone, Default)]
pub struct NewVehicle {
    /// Manufacturer, required
    pub make: String,
    /// Model name, required
    pub model: String,
    /// Model year
    pub year: Option<i32>,
    /// License plate
    pub license_plate: Option<String>,
}

/// Vehicle edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct VehicleChanges {
    /// New make
    pub make: Option<String>,
    /// New model name
    pub model: Option<String>,
    /// New year, `Some(None)` clears it
    pub year: Option<Option<i32>>,
    /// New plate, `Some(None)` clears it
    pub license_plate: Option<Option<String>>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: format!("Vehicle {field} cannot be empty"),
        });
    }
    Ok(trimmed.to_string())
}

fn normalize_plate(plate: Option<String>) -> Option<String> {
    plate
        .map(|p| p.trim().to_uppercase())
        .filter(|p| !p.is_empty())
}

/// Adds a vehicle to one of the tenant's clients.
pub async fn create_vehicle(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
    new_vehicle: NewVehicle,
    now: DateTime<Utc>,
) -> Result<vehicle::Model> {
    let make = required("make", &new_vehicle.make)?;
    let model = required("model", &new_vehicle.model)?;

    client::get_client(db, tenant_id, client_id)
        .await?
        .ok_or(Error::ClientNotFound { id: client_id })?;

    let vehicle = vehicle::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        client_id: Set(client_id),
        make: Set(make),
        model_name: Set(model),
        year: Set(new_vehicle.year),
        license_plate: Set(normalize_plate(new_vehicle.license_plate)),
        created_at: Set(now),
        ..Default::default()
    };

    vehicle.insert(db).await.map_err(Into::into)
}

/// Finds a vehicle of the tenant by id.
pub async fn get_vehicle<C>(
    db: &C,
    tenant_id: &str,
    vehicle_id: i64,
) -> Result<Option<vehicle::Model>>
where
    C: ConnectionTrait,
{
    Vehicle::find_by_id(vehicle_id)
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists a client's vehicles in the order they were added.
pub async fn list_vehicles_for_client(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
) -> Result<Vec<vehicle::Model>> {
    Vehicle::find()
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .filter(vehicle::Column::ClientId.eq(client_id))
        .order_by_asc(vehicle::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies edits to a vehicle.
pub async fn update_vehicle(
    db: &DatabaseConnection,
    tenant_id: &str,
    vehicle_id: i64,
    changes: VehicleChanges,
) -> Result<vehicle::Model> {
    let existing = get_vehicle(db, tenant_id, vehicle_id)
        .await?
        .ok_or(Error::VehicleNotFound { id: vehicle_id })?;

    let mut active: vehicle::ActiveModel = existing.into();
    if let Some(make) = changes.make {
        active.make = Set(required("make", &make)?);
    }
    if let Some(model) = changes.model {
        active.model_name = Set(required("model", &model)?);
    }
    if let Some(year) = changes.year {
        active.year = Set(year);
    }
    if let Some(plate) = changes.license_plate {
        active.license_plate = Set(normalize_plate(plate));
    }

    active.update(db).await.map_err(Into::into)
}

/// Deletes a vehicle and its service history. Returns the number of services removed.
pub async fn delete_vehicle(
    db: &DatabaseConnection,
    tenant_id: &str,
    vehicle_id: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    let txn = db.begin().await?;

    let vehicle = get_vehicle(&txn, tenant_id, vehicle_id)
        .await?
        .ok_or(Error::VehicleNotFound { id: vehicle_id })?;

    let services = ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::VehicleId.eq(vehicle_id))
        .all(&txn)
        .await?;

    let mut delta = SummaryDelta::default();
    delta.remove_services(&services);

    let removed = ServiceRecord::delete_many()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::VehicleId.eq(vehicle_id))
        .exec(&txn)
        .await?
        .rows_affected;
    vehicle.delete(&txn).await?;

    counters::apply(&txn, tenant_id, &delta, now).await?;

    txn.commit().await?;
    Ok(removed)
}
