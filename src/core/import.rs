//! Import of client documents exported from the hosted document database.
//!
//! The export is a JSON object of the shape
//!
//! ```json
//! {"clients": [{"name": "..", "createdAt": {"seconds": 1700000000},
//!   "vehicles": [{"make": "..", "model": "..",
//!     "serviceHistory": [{"serviceType": "..", "cost": "150", "date": "2024-01-01",
//!       "duration": 12, "durationUnit": "months"}]}]}]}
//! ```
//!
//! Timestamps go through [`to_date`] with the epoch as fallback. Numbers may be JSON
//! numbers or numeric strings. A stored `expirationDate` is kept as is; it is only
//! derived when the document has none. Documents that cannot be imported are skipped
//! and counted. Everything that can be imported is written in one transaction, after
//! which the tenant's summary is marked stale so the next dashboard load rebuilds it.

use crate::{
    core::{
        dates::{epoch, to_date},
        service::{NewService, ServiceDuration, ValidatedService},
        tenant,
    },
    entities::{client, vehicle},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// What an import wrote and what it skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Clients inserted
    pub clients: u64,
    /// Vehicles inserted
    pub vehicles: u64,
    /// Service records inserted
    pub services: u64,
    /// Client documents without a usable name
    pub skipped_clients: u64,
    /// Vehicle documents without a make or model
    pub skipped_vehicles: u64,
    /// Service documents that failed validation
    pub skipped_services: u64,
}

#[derive(Debug)]
struct ImportedClient {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    vehicles: Vec<ImportedVehicle>,
}

#[derive(Debug)]
struct ImportedVehicle {
    make: String,
    model: String,
    year: Option<i32>,
    license_plate: Option<String>,
    services: Vec<(ValidatedService, bool)>,
}

fn field<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.get(name).filter(|v| !v.is_null())
}

fn text(doc: &Value, name: &str) -> Option<String> {
    let value = match field(doc, name)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// Reads a number from a JSON number or a numeric string.
fn number(doc: &Value, name: &str) -> Option<f64> {
    match field(doc, name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn array<'a>(doc: &'a Value, name: &str) -> &'a [Value] {
    field(doc, name)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked
fn whole(value: f64, max: f64) -> Option<u32> {
    (value.is_finite() && value >= 0.0 && value <= max).then(|| value.round() as u32)
}

fn parse_duration(doc: &Value) -> Option<ServiceDuration> {
    let value = whole(number(doc, "duration")?, f64::from(i32::MAX))?;
    match text(doc, "durationUnit").as_deref().map(str::to_lowercase).as_deref() {
        Some("days" | "day") => Some(ServiceDuration::Days(value)),
        Some("months" | "month") | None => Some(ServiceDuration::Months(value)),
        Some(_) => None,
    }
}

fn parse_service(doc: &Value) -> Option<ValidatedService> {
    let start_date = to_date(
        field(doc, "date")
            .or_else(|| field(doc, "startDate"))
            .unwrap_or(&Value::Null),
        epoch(),
    );
    let stored_expiration = field(doc, "expirationDate").map(|v| to_date(v, epoch()));

    let duration = match (parse_duration(doc), stored_expiration) {
        (Some(duration), _) => duration,
        (None, Some(expiration)) => {
            let days = (expiration - start_date).num_days().max(0);
            ServiceDuration::Days(u32::try_from(days).ok()?)
        }
        (None, None) => return None,
    };

    let new_service = NewService {
        service_type: text(doc, "serviceType")?,
        notes: text(doc, "notes"),
        image_ref: text(doc, "imageUrl"),
        cost: match field(doc, "cost") {
            Some(_) => number(doc, "cost")?,
            None => 0.0,
        },
        start_date,
        duration,
    };

    let validated = new_service.validate().ok()?;
    Some(match stored_expiration {
        Some(expiration) => validated.with_expiration(expiration),
        None => validated,
    })
}

fn parse_vehicle(doc: &Value, report: &mut ImportReport) -> Option<ImportedVehicle> {
    let (Some(make), Some(model)) = (text(doc, "make"), text(doc, "model")) else {
        report.skipped_vehicles += 1;
        report.skipped_services += array(doc, "serviceHistory").len() as u64;
        return None;
    };

    let mut services = Vec::new();
    for service_doc in array(doc, "serviceHistory") {
        match parse_service(service_doc) {
            Some(service) => {
                let is_renewed = field(service_doc, "isRenewed")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                services.push((service, is_renewed));
            }
            None => {
                warn!(vehicle = %format!("{make} {model}"), "Skipping invalid service document");
                report.skipped_services += 1;
            }
        }
    }

    Some(ImportedVehicle {
        year: number(doc, "year")
            .and_then(|y| whole(y, 9999.0))
            .and_then(|y| i32::try_from(y).ok()),
        license_plate: text(doc, "licensePlate").map(|p| p.to_uppercase()),
        make,
        model,
        services,
    })
}

fn parse_client(doc: &Value, report: &mut ImportReport) -> Option<ImportedClient> {
    let Some(name) = text(doc, "name") else {
        warn!("Skipping client document without a name");
        report.skipped_clients += 1;
        return None;
    };

    let vehicles = array(doc, "vehicles")
        .iter()
        .filter_map(|v| parse_vehicle(v, report))
        .collect();

    Some(ImportedClient {
        name,
        email: text(doc, "email"),
        phone: text(doc, "phone"),
        created_at: to_date(field(doc, "createdAt").unwrap_or(&Value::Null), epoch()),
        vehicles,
    })
}

/// Imports an export document into a tenant.
pub async fn import_documents(
    db: &DatabaseConnection,
    tenant_id: &str,
    export: &Value,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let clients: Vec<ImportedClient> = array(export, "clients")
        .iter()
        .filter_map(|doc| parse_client(doc, &mut report))
        .collect();

    let txn = db.begin().await?;
    tenant::require_tenant(&txn, tenant_id).await?;

    for imported in clients {
        let client = client::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            name: Set(imported.name),
            email: Set(imported.email),
            phone: Set(imported.phone),
            created_at: Set(imported.created_at),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        report.clients += 1;

        for imported_vehicle in imported.vehicles {
            let vehicle = vehicle::ActiveModel {
                tenant_id: Set(tenant_id.to_string()),
                client_id: Set(client.id),
                make: Set(imported_vehicle.make),
                model_name: Set(imported_vehicle.model),
                year: Set(imported_vehicle.year),
                license_plate: Set(imported_vehicle.license_plate),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            report.vehicles += 1;

            for (service, is_renewed) in imported_vehicle.services {
                service
                    .into_active_model(tenant_id, client.id, vehicle.id, is_renewed, now)
                    .insert(&txn)
                    .await?;
                report.services += 1;
            }
        }
    }

    tenant::set_summary_migrated(&txn, tenant_id, false).await?;
    txn.commit().await?;

    info!(
        tenant_id,
        clients = report.clients,
        vehicles = report.vehicles,
        services = report.services,
        skipped = report.skipped_clients + report.skipped_vehicles + report.skipped_services,
        "Import finished"
    );
    Ok(report)
}
