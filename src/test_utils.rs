//! Shared test utilities for `DetailBook`.
//!
//! This module provides common helper functions for setting up test databases,
//! creating test entities with sensible defaults and building in-memory models for
//! the pure functions.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        client::{self, NewClient},
        service::{self, NewService, ServiceDuration},
        tenant,
        vehicle::{self, NewVehicle},
    },
    entities,
    errors::Result,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// The fixed "now" used across tests: 2024-01-01 00:00 UTC.
#[must_use]
pub fn test_now() -> DateTime<Utc> {
    date("2024-01-01")
}

/// Midnight UTC of a `YYYY-MM-DD` date.
#[must_use]
pub fn date(ymd: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(ymd, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Creates a test tenant whose display name is its id.
pub async fn create_test_tenant(db: &DatabaseConnection, id: &str) -> Result<entities::TenantModel> {
    tenant::create_tenant(db, id.to_string(), id.to_string(), test_now()).await
}

/// Creates a test client with sensible defaults.
///
/// # Defaults
/// * `email`: `"{name}@example.com"` in lowercase
/// * `phone`: `"555-0100"`
/// * created at [`test_now`]
pub async fn create_test_client(
    db: &DatabaseConnection,
    tenant_id: &str,
    name: &str,
) -> Result<entities::ClientModel> {
    client::create_client(
        db,
        tenant_id,
        NewClient {
            name: name.to_string(),
            email: Some(format!("{}@example.com", name.to_lowercase())),
            phone: Some("555-0100".to_string()),
        },
        test_now(),
    )
    .await
}

/// Creates a Toyota Corolla for a client.
pub async fn create_test_vehicle(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
) -> Result<entities::VehicleModel> {
    vehicle::create_vehicle(
        db,
        tenant_id,
        client_id,
        NewVehicle {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: Some(2020),
            license_plate: None,
        },
        test_now(),
    )
    .await
}

/// Creates a test service with the given cost.
///
/// # Defaults
/// * `service_type`: `"Full detail"`
/// * starts at [`test_now`] and lasts 12 months
pub async fn create_test_service(
    db: &DatabaseConnection,
    tenant_id: &str,
    vehicle_id: i64,
    cost: f64,
) -> Result<entities::ServiceRecordModel> {
    service::create_service(
        db,
        tenant_id,
        vehicle_id,
        NewService {
            service_type: "Full detail".to_string(),
            notes: None,
            image_ref: None,
            cost,
            start_date: test_now(),
            duration: ServiceDuration::Months(12),
        },
        test_now(),
    )
    .await
}

/// Sets up a database with one tenant, a client named `"Test Client"` and one vehicle.
pub async fn setup_with_vehicle(
    tenant_id: &str,
) -> Result<(DatabaseConnection, entities::VehicleModel)> {
    let db = setup_test_db().await?;
    create_test_tenant(&db, tenant_id).await?;
    let client = create_test_client(&db, tenant_id, "Test Client").await?;
    let vehicle = create_test_vehicle(&db, tenant_id, client.id).await?;
    Ok((db, vehicle))
}

/// In-memory client of tenant `"t1"`, created on the given `YYYY-MM-DD` date.
#[must_use]
pub fn client_model(id: i64, name: &str, created: &str) -> entities::ClientModel {
    entities::ClientModel {
        id,
        tenant_id: "t1".to_string(),
        name: name.to_string(),
        email: None,
        phone: Some("555-0100".to_string()),
        created_at: date(created),
        updated_at: date(created),
    }
}

/// In-memory vehicle of tenant `"t1"`.
#[must_use]
pub fn vehicle_model(id: i64, client_id: i64, make: &str, model: &str) -> entities::VehicleModel {
    entities::VehicleModel {
        id,
        tenant_id: "t1".to_string(),
        client_id,
        make: make.to_string(),
        model_name: model.to_string(),
        year: None,
        license_plate: None,
        created_at: test_now(),
    }
}

/// In-memory service of tenant `"t1"` with explicit start and expiration dates.
#[must_use]
pub fn service_model(
    id: i64,
    vehicle_id: i64,
    client_id: i64,
    cost: f64,
    start: &str,
    expiration: &str,
) -> entities::ServiceRecordModel {
    let start_date = date(start);
    let expiration_date = date(expiration);
    entities::ServiceRecordModel {
        id,
        tenant_id: "t1".to_string(),
        client_id,
        vehicle_id,
        service_type: "Full detail".to_string(),
        notes: None,
        image_ref: None,
        cost,
        start_date,
        duration_value: i32::try_from((expiration_date - start_date).num_days()).unwrap_or(0),
        duration_unit: "days".to_string(),
        expiration_date,
        is_renewed: false,
        created_at: start_date,
    }
}
