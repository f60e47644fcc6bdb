//! Service record business logic - Handles all service-related operations.
//!
//! The expiration date of a service is derived here, on every write that touches the
//! start date or the duration, and stored. Reads never recompute it. Cost and
//! duration are validated before anything reaches the database, and every create,
//! edit or delete moves the summary caches in the same transaction.

use crate::{
    core::{
        aggregate::{AggregatedService, aggregate_services},
        counters::{self, SummaryDelta},
        page::Page,
        tree, vehicle,
    },
    entities::{ServiceRecord, service_record},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Months, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};

const UNIT_DAYS: &str = "days";
const UNIT_MONTHS: &str = "months";

/// Protection period of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceDuration {
    /// A number of days
    Days(u32),
    /// A number of calendar months
    Months(u32),
}

impl ServiceDuration {
    /// Stored unit name.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Days(_) => UNIT_DAYS,
            Self::Months(_) => UNIT_MONTHS,
        }
    }

    /// Number of units.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Days(v) | Self::Months(v) => v,
        }
    }

    /// Rebuilds a duration from its stored columns.
    pub fn from_parts(value: i32, unit: &str) -> Result<Self> {
        let value = u32::try_from(value)?;
        match unit {
            UNIT_DAYS => Ok(Self::Days(value)),
            UNIT_MONTHS => Ok(Self::Months(value)),
            other => Err(Error::Config {
                message: format!("Unknown duration unit: {other}"),
            }),
        }
    }

    /// Value as stored in the `duration_value` column.
    pub fn stored_value(self) -> Result<i32> {
        i32::try_from(self.value()).map_err(|_| Error::InvalidDuration {
            value: self.value(),
        })
    }

    /// `start` plus this duration.
    pub fn expiration_from(self, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let end = match self {
            Self::Days(days) => start.checked_add_signed(Duration::days(i64::from(days))),
            Self::Months(months) => start.checked_add_months(Months::new(months)),
        };
        end.ok_or(Error::InvalidDuration {
            value: self.value(),
        })
    }
}

/// Fields entered when recording a service.
#[derive(Debug, Clone)]
pub struct NewService {
    /// Kind of service, required
    pub service_type: String,
    /// Free-text notes
    pub notes: Option<String>,
    /// Photo reference
    pub image_ref: Option<String>,
    /// Price charged
    pub cost: f64,
    /// When the service was performed
    pub start_date: DateTime<Utc>,
    /// Protection period
    pub duration: ServiceDuration,
}

/// Validates a cost: finite and not negative.
pub fn validate_cost(cost: f64) -> Result<f64> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(Error::InvalidAmount { amount: cost });
    }
    Ok(cost)
}

fn validate_service_type(service_type: &str) -> Result<String> {
    let trimmed = service_type.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: "Service type cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A validated service, ready to be written.
#[derive(Debug, Clone)]
pub struct ValidatedService {
    service_type: String,
    notes: Option<String>,
    image_ref: Option<String>,
    cost: f64,
    start_date: DateTime<Utc>,
    duration_value: i32,
    duration_unit: &'static str,
    expiration_date: DateTime<Utc>,
}

impl ValidatedService {
    /// Derived expiration date.
    #[must_use]
    pub const fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    /// Keeps an expiration date recorded elsewhere instead of the derived one.
    #[must_use]
    pub(crate) const fn with_expiration(mut self, expiration_date: DateTime<Utc>) -> Self {
        self.expiration_date = expiration_date;
        self
    }

    pub(crate) fn into_active_model(
        self,
        tenant_id: &str,
        client_id: i64,
        vehicle_id: i64,
        is_renewed: bool,
        now: DateTime<Utc>,
    ) -> service_record::ActiveModel {
        service_record::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            client_id: Set(client_id),
            vehicle_id: Set(vehicle_id),
            service_type: Set(self.service_type),
            notes: Set(self.notes),
            image_ref: Set(self.image_ref),
            cost: Set(self.cost),
            start_date: Set(self.start_date),
            duration_value: Set(self.duration_value),
            duration_unit: Set(self.duration_unit.to_string()),
            expiration_date: Set(self.expiration_date),
            is_renewed: Set(is_renewed),
            created_at: Set(now),
            ..Default::default()
        }
    }
}

impl NewService {
    /// Checks every field and derives the expiration date.
    pub fn validate(self) -> Result<ValidatedService> {
        Ok(ValidatedService {
            service_type: validate_service_type(&self.service_type)?,
            notes: clean_optional(self.notes),
            image_ref: clean_optional(self.image_ref),
            cost: validate_cost(self.cost)?,
            start_date: self.start_date,
            duration_value: self.duration.stored_value()?,
            duration_unit: self.duration.unit(),
            expiration_date: self.duration.expiration_from(self.start_date)?,
        })
    }
}

/// Service edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    /// New service type
    pub service_type: Option<String>,
    /// New notes, `Some(None)` clears them
    pub notes: Option<Option<String>>,
    /// New photo reference, `Some(None)` clears it
    pub image_ref: Option<Option<String>>,
    /// New cost
    pub cost: Option<f64>,
    /// New start date
    pub start_date: Option<DateTime<Utc>>,
    /// New duration
    pub duration: Option<ServiceDuration>,
    /// New renewal flag
    pub is_renewed: Option<bool>,
}

/// Records a service on one of the tenant's vehicles.
///
/// The input is validated before any query runs. The vehicle must belong to the
/// tenant; the service inherits its client. The expiration date is derived from
/// the start date and the duration and stored with the row. The summary caches
/// gain one service and its cost in the month of the start date.
///
/// # Arguments
/// * `tenant_id` - Tenant that owns the vehicle
/// * `vehicle_id` - Vehicle the service was performed on
/// * `new_service` - Service type, cost, start date and duration
/// * `now` - Timestamp recorded on the row and the summary
///
/// # Returns
/// The inserted service, or `VehicleNotFound` when the vehicle is missing or
/// belongs to another tenant.
pub async fn create_service(
    db: &DatabaseConnection,
    tenant_id: &str,
    vehicle_id: i64,
    new_service: NewService,
    now: DateTime<Utc>,
) -> Result<service_record::Model> {
    let validated = new_service.validate()?;

    // The row and the summary counters commit together
    let txn = db.begin().await?;

    let vehicle = vehicle::get_vehicle(&txn, tenant_id, vehicle_id)
        .await?
        .ok_or(Error::VehicleNotFound { id: vehicle_id })?;

    // Client comes from the vehicle, never from the caller
    let service = validated
        .into_active_model(tenant_id, vehicle.client_id, vehicle.id, false, now)
        .insert(&txn)
        .await?;

    let mut delta = SummaryDelta::default();
    delta.add_service(service.cost, service.start_date);
    counters::apply(&txn, tenant_id, &delta, now).await?;

    txn.commit().await?;
    Ok(service)
}

/// Finds a service of the tenant by id.
pub async fn get_service<C>(
    db: &C,
    tenant_id: &str,
    service_id: i64,
) -> Result<Option<service_record::Model>>
where
    C: ConnectionTrait,
{
    ServiceRecord::find_by_id(service_id)
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies edits to a service.
///
/// The expiration date is derived again when the start date or the duration
/// changes. Cost or start date changes move the summary caches.
pub async fn update_service(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: i64,
    changes: ServiceChanges,
    now: DateTime<Utc>,
) -> Result<service_record::Model> {
    let new_cost = changes.cost.map(validate_cost).transpose()?;
    let new_type = changes
        .service_type
        .as_deref()
        .map(validate_service_type)
        .transpose()?;

    let txn = db.begin().await?;

    let existing = get_service(&txn, tenant_id, service_id)
        .await?
        .ok_or(Error::ServiceNotFound { id: service_id })?;

    let old_cost = existing.cost;
    let old_start = existing.start_date;
    let start_date = changes.start_date.unwrap_or(existing.start_date);
    let duration = match changes.duration {
        Some(duration) => duration,
        None => ServiceDuration::from_parts(existing.duration_value, &existing.duration_unit)?,
    };
    let schedule_changed = changes.start_date.is_some() || changes.duration.is_some();

    let mut active: service_record::ActiveModel = existing.into();
    if let Some(service_type) = new_type {
        active.service_type = Set(service_type);
    }
    if let Some(notes) = changes.notes {
        active.notes = Set(clean_optional(notes));
    }
    if let Some(image_ref) = changes.image_ref {
        active.image_ref = Set(clean_optional(image_ref));
    }
    if let Some(cost) = new_cost {
        active.cost = Set(cost);
    }
    if let Some(is_renewed) = changes.is_renewed {
        active.is_renewed = Set(is_renewed);
    }
    if schedule_changed {
        active.start_date = Set(start_date);
        active.duration_value = Set(duration.stored_value()?);
        active.duration_unit = Set(duration.unit().to_string());
        active.expiration_date = Set(duration.expiration_from(start_date)?);
    }

    let updated = active.update(&txn).await?;

    if updated.cost != old_cost || updated.start_date != old_start {
        let mut delta = SummaryDelta::default();
        delta.remove_service(old_cost, old_start);
        delta.add_service(updated.cost, updated.start_date);
        counters::apply(&txn, tenant_id, &delta, now).await?;
    }

    txn.commit().await?;
    Ok(updated)
}

/// Marks a service as renewed so the renewals view stops listing it.
pub async fn mark_renewed(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: i64,
    now: DateTime<Utc>,
) -> Result<service_record::Model> {
    update_service(
        db,
        tenant_id,
        service_id,
        ServiceChanges {
            is_renewed: Some(true),
            ..ServiceChanges::default()
        },
        now,
    )
    .await
}

/// Deletes a service and takes it out of the summary caches.
pub async fn delete_service(
    db: &DatabaseConnection,
    tenant_id: &str,
    service_id: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    let txn = db.begin().await?;

    let service = get_service(&txn, tenant_id, service_id)
        .await?
        .ok_or(Error::ServiceNotFound { id: service_id })?;

    let mut delta = SummaryDelta::default();
    delta.remove_service(service.cost, service.start_date);

    service.delete(&txn).await?;
    counters::apply(&txn, tenant_id, &delta, now).await?;

    txn.commit().await?;
    Ok(())
}

/// Lists every service of the tenant, most recent start date first.
pub async fn list_services(
    db: &DatabaseConnection,
    tenant_id: &str,
    page: u64,
    page_size: u64,
) -> Result<Page<AggregatedService>> {
    let trees = tree::load_client_trees(db, tenant_id).await?;
    let mut rows = aggregate_services(&trees);
    rows.sort_by(|a, b| b.service.start_date.cmp(&a.service.start_date));
    Ok(Page::from_vec(rows, page, page_size))
}
