//! Dashboard view - cached totals plus the nearest upcoming expirations.
//!
//! The first load for a tenant bootstraps the summary caches. Every load after
//! that reads the caches and runs two bounded queries; the full client tree is
//! never scanned again.

use crate::{
    config::settings::Settings,
    core::{
        aggregate::AggregatedService,
        expiration::{ClassifiedService, Horizon, classify},
        summary::{self, MonthCount, MonthRevenue, SummaryTotals},
    },
    entities::{Client, ServiceRecord, Vehicle, client, service_record, vehicle},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Cached totals
    pub totals: SummaryTotals,
    /// Clients added per month, ascending
    pub client_growth: Vec<MonthCount>,
    /// Revenue per month, ascending
    pub monthly_revenue: Vec<MonthRevenue>,
    /// Nearest services that have not expired yet
    pub upcoming: Vec<ClassifiedService>,
    /// Services expiring inside the dashboard horizon
    pub expiring_soon_count: u64,
}

/// Loads the dashboard for a tenant, bootstrapping its summary if needed.
pub async fn load_dashboard(
    db: &DatabaseConnection,
    tenant_id: &str,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<DashboardView> {
    summary::ensure_summary(db, tenant_id, now).await?;

    let totals = summary::get_cached_summary(db, tenant_id)
        .await?
        .map(|row| SummaryTotals {
            total_revenue: row.total_revenue,
            total_clients: row.total_clients,
            total_services: row.total_services,
        })
        .unwrap_or_default();
    let client_growth = summary::get_client_growth(db, tenant_id).await?;
    let monthly_revenue = summary::get_monthly_revenue(db, tenant_id).await?;

    let horizon = Horizon::Days(settings.dashboard.horizon_days);
    let upcoming = upcoming_services(db, tenant_id, now, settings.dashboard.upcoming_limit)
        .await?
        .into_iter()
        .map(|item| ClassifiedService {
            classification: classify(item.expiration_date(), now, horizon),
            item,
        })
        .collect();
    let expiring_soon_count = count_expiring_soon(db, tenant_id, now, horizon).await?;

    Ok(DashboardView {
        totals,
        client_growth,
        monthly_revenue,
        upcoming,
        expiring_soon_count,
    })
}

/// Unrenewed services expiring at or after `now`, nearest first.
///
/// Ties on the expiration date are broken by service id, matching
/// [`crate::core::expiration::upcoming`] over the loaded tree.
pub async fn upcoming_services(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
    limit: u64,
) -> Result<Vec<AggregatedService>> {
    let services = ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::IsRenewed.eq(false))
        .filter(service_record::Column::ExpirationDate.gte(now))
        .order_by_asc(service_record::Column::ExpirationDate)
        .order_by_asc(service_record::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    if services.is_empty() {
        return Ok(Vec::new());
    }

    let vehicle_ids: Vec<i64> = services.iter().map(|s| s.vehicle_id).collect();
    let client_ids: Vec<i64> = services.iter().map(|s| s.client_id).collect();

    let vehicles: HashMap<i64, vehicle::Model> = Vehicle::find()
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .filter(vehicle::Column::Id.is_in(vehicle_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();
    let clients: HashMap<i64, client::Model> = Client::find()
        .filter(client::Column::TenantId.eq(tenant_id))
        .filter(client::Column::Id.is_in(client_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    Ok(services
        .into_iter()
        .filter_map(|service| {
            let vehicle = vehicles.get(&service.vehicle_id)?;
            let client = clients.get(&service.client_id)?;
            Some(AggregatedService {
                client_id: client.id,
                client_name: client.name.clone(),
                client_phone: client.phone.clone(),
                vehicle_id: vehicle.id,
                vehicle_make: vehicle.make.clone(),
                vehicle_model: vehicle.model_name.clone(),
                service,
            })
        })
        .collect())
}

/// Number of unrenewed services whose expiration falls in `[now, horizon end)`.
pub async fn count_expiring_soon(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
    horizon: Horizon,
) -> Result<u64> {
    ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::IsRenewed.eq(false))
        .filter(service_record::Column::ExpirationDate.gte(now))
        .filter(service_record::Column::ExpirationDate.lt(horizon.end(now)))
        .count(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::{
        aggregate::aggregate_services,
        expiration::{self, ExpirationState},
        service::{self, NewService, ServiceDuration},
        tenant,
    };
    use crate::test_utils::*;

    async fn add_service(
        db: &DatabaseConnection,
        vehicle_id: i64,
        start: &str,
        days: u32,
        cost: f64,
    ) -> Result<service_record::Model> {
        service::create_service(
            db,
            "t1",
            vehicle_id,
            NewService {
                service_type: format!("Detail {start}"),
                notes: None,
                image_ref: None,
                cost,
                start_date: date(start),
                duration: ServiceDuration::Days(days),
            },
            test_now(),
        )
        .await
    }

    #[tokio::test]
    async fn test_first_load_bootstraps_summary() -> Result<()> {
        let (db, vehicle) = setup_with_vehicle("t1").await?;
        add_service(&db, vehicle.id, "2023-12-01", 10, 50.0).await?;
        add_service(&db, vehicle.id, "2023-12-20", 20, 70.0).await?;

        assert!(!tenant::require_tenant(&db, "t1").await?.summary_migrated);

        let view = load_dashboard(&db, "t1", &Settings::default(), test_now()).await?;
        assert!(tenant::require_tenant(&db, "t1").await?.summary_migrated);
        assert_eq!(view.totals.total_clients, 1);
        assert_eq!(view.totals.total_services, 2);
        assert_eq!(view.totals.total_revenue, 120.0);
        assert_eq!(view.monthly_revenue.len(), 1);
        assert_eq!(view.monthly_revenue[0].month, "2023-12");

        // Counters keep the cache current after the bootstrap
        add_service(&db, vehicle.id, "2024-01-01", 5, 30.0).await?;
        let view = load_dashboard(&db, "t1", &Settings::default(), test_now()).await?;
        assert_eq!(view.totals.total_services, 3);
        assert_eq!(view.totals.total_revenue, 150.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_upcoming_and_expiring_soon() -> Result<()> {
        let (db, vehicle) = setup_with_vehicle("t1").await?;
        // Expired 2023-12-11
        add_service(&db, vehicle.id, "2023-12-01", 10, 10.0).await?;
        // Expires 2024-01-09
        add_service(&db, vehicle.id, "2023-12-20", 20, 10.0).await?;
        // Expires 2024-03-01
        add_service(&db, vehicle.id, "2024-01-01", 60, 10.0).await?;
        // Expires 2024-01-05 but already renewed
        let renewed = add_service(&db, vehicle.id, "2023-12-31", 5, 10.0).await?;
        service::mark_renewed(&db, "t1", renewed.id, test_now()).await?;

        let view = load_dashboard(&db, "t1", &Settings::default(), test_now()).await?;

        let expirations: Vec<DateTime<Utc>> = view
            .upcoming
            .iter()
            .map(|c| c.item.expiration_date())
            .collect();
        assert_eq!(expirations, vec![date("2024-01-09"), date("2024-03-01")]);
        assert_eq!(
            view.upcoming[0].classification.state,
            ExpirationState::ExpiringSoon
        );
        assert_eq!(view.upcoming[1].classification.state, ExpirationState::Future);
        assert_eq!(view.upcoming[0].item.client_name, "Test Client");
        assert_eq!(view.expiring_soon_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_upcoming_respects_limit() -> Result<()> {
        let (db, vehicle) = setup_with_vehicle("t1").await?;
        for days in [40, 10, 30, 20] {
            add_service(&db, vehicle.id, "2024-01-01", days, 1.0).await?;
        }

        let rows = upcoming_services(&db, "t1", test_now(), 2).await?;
        let expirations: Vec<DateTime<Utc>> =
            rows.iter().map(AggregatedService::expiration_date).collect();
        assert_eq!(expirations, vec![date("2024-01-11"), date("2024-01-21")]);

        Ok(())
    }

    #[tokio::test]
    async fn test_upcoming_ties_match_tree_order() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        let first = create_test_client(&db, "t1", "Ana").await?;
        let second = create_test_client(&db, "t1", "Bruno").await?;
        let first_vehicle = create_test_vehicle(&db, "t1", first.id).await?;
        let second_vehicle = create_test_vehicle(&db, "t1", second.id).await?;

        // Same expiration; the tree lists Ana's service first, Bruno's has the lower id
        let early = add_service(&db, second_vehicle.id, "2024-01-01", 15, 1.0).await?;
        let late = add_service(&db, first_vehicle.id, "2024-01-01", 15, 1.0).await?;

        let from_db: Vec<i64> = upcoming_services(&db, "t1", test_now(), 10)
            .await?
            .iter()
            .map(|s| s.service.id)
            .collect();
        let trees = crate::core::tree::load_client_trees(&db, "t1").await?;
        let from_tree: Vec<i64> = expiration::upcoming(aggregate_services(&trees), test_now(), 10)
            .iter()
            .map(|s| s.service.id)
            .collect();

        assert_eq!(from_db, vec![early.id, late.id]);
        assert_eq!(from_tree, from_db);

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_tenant() -> Result<()> {
        let db = setup_test_db().await?;
        let result = load_dashboard(&db, "ghost", &Settings::default(), test_now()).await;
        assert!(matches!(
            result,
            Err(crate::errors::Error::TenantNotFound { .. })
        ));
        Ok(())
    }
}
