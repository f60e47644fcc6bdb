//! Summary recomputation - derives the cached dashboard summary from the client tree.
//!
//! [`recompute`] is a pure function over the materialized tree. [`ensure_summary`]
//! runs it lazily, once per tenant, the first time the dashboard is opened, and
//! persists the result together with the tenant's `summary_migrated` flag in a single
//! database transaction. Once the flag is set, dashboards read the cached rows and
//! steady-state mutations keep them current through [`crate::core::counters`].
//!
//! Both writers bump `user_summaries.version`. The recompute only commits if the
//! version it observed before taking its snapshot is unchanged, so a counter update
//! that lands mid-recompute forces a fresh snapshot instead of being overwritten.

use crate::{
    core::{aggregate::aggregate_services, dates::month_key, tenant, tree::ClientTree},
    entities::{
        ClientGrowth, MonthlyRevenue, Tenant, UserSummary, client_growth, monthly_revenue,
        tenant as tenant_entity, user_summary,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// How many fresh snapshots the bootstrap takes before giving up on a busy tenant.
pub const MAX_RECOMPUTE_ATTEMPTS: u32 = 3;

/// Clients added in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM`
    pub month: String,
    /// Clients created in that month
    pub clients: i64,
}

/// Revenue recognized in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthRevenue {
    /// `YYYY-MM`
    pub month: String,
    /// Sum of costs of services started in that month
    pub revenue: f64,
}

/// Tenant-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SummaryTotals {
    /// Sum of all service costs
    pub total_revenue: f64,
    /// Number of clients
    pub total_clients: i64,
    /// Number of service records
    pub total_services: i64,
}

/// Everything the summary caches hold, computed from one tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SummarySnapshot {
    /// Tenant-wide totals
    pub totals: SummaryTotals,
    /// Client growth histogram, ascending by month
    pub client_growth: Vec<MonthCount>,
    /// Monthly revenue histogram, ascending by month
    pub monthly_revenue: Vec<MonthRevenue>,
}

/// Computes the summary of a tenant's full client tree.
#[must_use]
pub fn recompute(clients: &[ClientTree]) -> SummarySnapshot {
    let mut growth: BTreeMap<String, i64> = BTreeMap::new();
    for tree in clients {
        *growth.entry(month_key(tree.client.created_at)).or_insert(0) += 1;
    }

    let mut revenue: BTreeMap<String, f64> = BTreeMap::new();
    let mut totals = SummaryTotals {
        total_clients: i64::try_from(clients.len()).unwrap_or(i64::MAX),
        ..SummaryTotals::default()
    };
    for row in aggregate_services(clients) {
        totals.total_services += 1;
        totals.total_revenue += row.service.cost;
        *revenue
            .entry(month_key(row.service.start_date))
            .or_insert(0.0) += row.service.cost;
    }

    SummarySnapshot {
        totals,
        client_growth: growth
            .into_iter()
            .map(|(month, clients)| MonthCount { month, clients })
            .collect(),
        monthly_revenue: revenue
            .into_iter()
            .map(|(month, revenue)| MonthRevenue { month, revenue })
            .collect(),
    }
}

/// Returns the tenant's cached summary row, if one exists.
pub async fn get_cached_summary<C>(db: &C, tenant_id: &str) -> Result<Option<user_summary::Model>>
where
    C: ConnectionTrait,
{
    UserSummary::find_by_id(tenant_id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Cached client growth histogram, ascending by month.
pub async fn get_client_growth(db: &DatabaseConnection, tenant_id: &str) -> Result<Vec<MonthCount>> {
    let rows = ClientGrowth::find()
        .filter(client_growth::Column::TenantId.eq(tenant_id))
        .order_by_asc(client_growth::Column::Month)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| MonthCount {
            month: row.month,
            clients: row.clients,
        })
        .collect())
}

/// Cached monthly revenue histogram, ascending by month.
pub async fn get_monthly_revenue(
    db: &DatabaseConnection,
    tenant_id: &str,
) -> Result<Vec<MonthRevenue>> {
    let rows = MonthlyRevenue::find()
        .filter(monthly_revenue::Column::TenantId.eq(tenant_id))
        .order_by_asc(monthly_revenue::Column::Month)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| MonthRevenue {
            month: row.month,
            revenue: row.revenue,
        })
        .collect())
}

/// Makes sure the tenant has a summary row and returns its current version.
///
/// The row is created with zero totals at version 0. Creating it before the
/// snapshot is taken means every counter update from then on bumps the version.
pub async fn ensure_summary_row(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    if let Some(existing) = get_cached_summary(db, tenant_id).await? {
        return Ok(existing.version);
    }

    let row = user_summary::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        total_revenue: Set(0.0),
        total_clients: Set(0),
        total_services: Set(0),
        version: Set(0),
        updated_at: Set(now),
    };

    match UserSummary::insert(row).exec_without_returning(db).await {
        Ok(_) => Ok(0),
        // Another request created it first
        Err(err) => get_cached_summary(db, tenant_id)
            .await?
            .map(|existing| existing.version)
            .ok_or(Error::Database(err)),
    }
}

/// Writes a snapshot over the tenant's summary caches and sets the migration flag.
///
/// The summary row is only overwritten if its version still equals
/// `expected_version`; otherwise nothing is written and
/// [`Error::SummaryConflict`] is returned. Returns the new version.
pub async fn persist_snapshot(
    db: &DatabaseConnection,
    tenant_id: &str,
    snapshot: &SummarySnapshot,
    expected_version: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let txn = db.begin().await?;

    let updated = UserSummary::update_many()
        .col_expr(
            user_summary::Column::TotalRevenue,
            Expr::value(snapshot.totals.total_revenue),
        )
        .col_expr(
            user_summary::Column::TotalClients,
            Expr::value(snapshot.totals.total_clients),
        )
        .col_expr(
            user_summary::Column::TotalServices,
            Expr::value(snapshot.totals.total_services),
        )
        .col_expr(user_summary::Column::Version, Expr::value(expected_version + 1))
        .col_expr(user_summary::Column::UpdatedAt, Expr::value(now))
        .filter(user_summary::Column::TenantId.eq(tenant_id))
        .filter(user_summary::Column::Version.eq(expected_version))
        .exec(&txn)
        .await?;

    if updated.rows_affected == 0 {
        // Dropping the transaction rolls it back
        return Err(Error::SummaryConflict {
            tenant_id: tenant_id.to_string(),
        });
    }

    ClientGrowth::delete_many()
        .filter(client_growth::Column::TenantId.eq(tenant_id))
        .exec(&txn)
        .await?;
    if !snapshot.client_growth.is_empty() {
        let rows = snapshot
            .client_growth
            .iter()
            .map(|bucket| client_growth::ActiveModel {
                tenant_id: Set(tenant_id.to_string()),
                month: Set(bucket.month.clone()),
                clients: Set(bucket.clients),
            });
        ClientGrowth::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    MonthlyRevenue::delete_many()
        .filter(monthly_revenue::Column::TenantId.eq(tenant_id))
        .exec(&txn)
        .await?;
    if !snapshot.monthly_revenue.is_empty() {
        let rows = snapshot
            .monthly_revenue
            .iter()
            .map(|bucket| monthly_revenue::ActiveModel {
                tenant_id: Set(tenant_id.to_string()),
                month: Set(bucket.month.clone()),
                revenue: Set(bucket.revenue),
                updated_at: Set(now),
            });
        MonthlyRevenue::insert_many(rows)
            .exec_without_returning(&txn)
            .await?;
    }

    Tenant::update_many()
        .col_expr(tenant_entity::Column::SummaryMigrated, Expr::value(true))
        .filter(tenant_entity::Column::Id.eq(tenant_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(expected_version + 1)
}

/// Bootstraps the summary caches if the tenant has not been migrated yet.
///
/// This is the lazy path taken on every dashboard load. Once the tenant's
/// `summary_migrated` flag is set it returns immediately and the cached rows are
/// served as they are. Otherwise it snapshots the full client tree, recomputes and
/// writes the result with a compare-and-swap on the summary version.
///
/// A counter update that commits between the snapshot and the write makes the
/// swap fail. The whole snapshot is then retaken, up to
/// [`MAX_RECOMPUTE_ATTEMPTS`] times, before giving up with
/// [`Error::SummaryConflict`]. Any failure leaves the flag unset so the next load
/// starts over.
///
/// # Arguments
/// * `db` - Database connection
/// * `tenant_id` - Tenant whose summary should exist
/// * `now` - Timestamp recorded on the written rows
///
/// # Returns
/// `true` if a recompute was committed by this call, `false` if the tenant was
/// already migrated
pub async fn ensure_summary(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let mut attempt = 0;
    loop {
        attempt += 1;

        if tenant::require_tenant(db, tenant_id).await?.summary_migrated {
            debug!(tenant_id, "Summary already migrated");
            return Ok(false);
        }

        // The row must exist before the snapshot so later counter writes bump its version
        let expected_version = ensure_summary_row(db, tenant_id, now).await?;
        let trees = crate::core::tree::load_client_trees(db, tenant_id).await?;
        let snapshot = recompute(&trees);

        match persist_snapshot(db, tenant_id, &snapshot, expected_version, now).await {
            Ok(version) => {
                info!(
                    tenant_id,
                    version,
                    clients = snapshot.totals.total_clients,
                    services = snapshot.totals.total_services,
                    months = snapshot.monthly_revenue.len(),
                    "Summary recomputed"
                );
                return Ok(true);
            }
            Err(Error::SummaryConflict { .. }) if attempt < MAX_RECOMPUTE_ATTEMPTS => {
                warn!(tenant_id, attempt, "Summary changed during recompute, retrying");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Clears the migration flag and recomputes, repairing any drift in the caches.
pub async fn rebuild_summary(
    db: &DatabaseConnection,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    tenant::set_summary_migrated(db, tenant_id, false).await?;
    ensure_summary(db, tenant_id, now).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::tree::assemble;
    use crate::entities::ServiceRecord;
    use crate::test_utils::*;
    use proptest::prelude::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    fn reference_tree() -> Vec<ClientTree> {
        assemble(
            vec![client_model(1, "Ana", "2023-01-20")],
            vec![vehicle_model(10, 1, "Mazda", "3")],
            vec![
                service_model(100, 10, 1, 500.0, "2023-10-15", "2024-10-15"),
                service_model(101, 10, 1, 300.0, "2023-10-15", "2024-10-15"),
            ],
        )
    }

    #[test]
    fn test_recompute_reference_scenario() {
        let snapshot = recompute(&reference_tree());

        assert_eq!(snapshot.totals.total_revenue, 800.0);
        assert_eq!(snapshot.totals.total_services, 2);
        assert_eq!(snapshot.totals.total_clients, 1);
        assert_eq!(
            snapshot.monthly_revenue,
            vec![MonthRevenue {
                month: "2023-10".to_string(),
                revenue: 800.0
            }]
        );
        assert_eq!(
            snapshot.client_growth,
            vec![MonthCount {
                month: "2023-01".to_string(),
                clients: 1
            }]
        );
    }

    #[test]
    fn test_recompute_orders_buckets_by_month() {
        let trees = assemble(
            vec![
                client_model(1, "Ana", "2023-05-01"),
                client_model(2, "Ben", "2022-12-31"),
                client_model(3, "Cy", "2023-05-20"),
            ],
            vec![vehicle_model(10, 1, "Mazda", "3")],
            vec![
                service_model(100, 10, 1, 10.0, "2023-11-02", "2024-11-02"),
                service_model(101, 10, 1, 20.0, "2023-02-02", "2024-02-02"),
            ],
        );
        let snapshot = recompute(&trees);

        let growth: Vec<(&str, i64)> = snapshot
            .client_growth
            .iter()
            .map(|b| (b.month.as_str(), b.clients))
            .collect();
        assert_eq!(growth, vec![("2022-12", 1), ("2023-05", 2)]);

        let months: Vec<&str> = snapshot
            .monthly_revenue
            .iter()
            .map(|b| b.month.as_str())
            .collect();
        assert_eq!(months, vec!["2023-02", "2023-11"]);
    }

    #[test]
    fn test_recompute_empty() {
        assert_eq!(recompute(&[]), SummarySnapshot::default());
    }

    proptest! {
        #[test]
        fn prop_recompute_is_idempotent_and_conserves_revenue(
            costs in proptest::collection::vec((0u32..100_000, 0u32..36), 0..40),
        ) {
            let services = costs
                .iter()
                .enumerate()
                .map(|(i, (cents, month_offset))| {
                    let year = 2022 + i32::try_from(month_offset / 12).unwrap();
                    let month = month_offset % 12 + 1;
                    let start = format!("{year}-{month:02}-10");
                    service_model(
                        i64::try_from(i).unwrap(),
                        10,
                        1,
                        f64::from(*cents) / 100.0,
                        &start,
                        "2030-01-01",
                    )
                })
                .collect();
            let trees = assemble(
                vec![client_model(1, "Ana", "2023-01-20")],
                vec![vehicle_model(10, 1, "Mazda", "3")],
                services,
            );

            let first = recompute(&trees);
            let second = recompute(&trees);
            prop_assert_eq!(&first, &second);

            let bucket_sum: f64 = first.monthly_revenue.iter().map(|b| b.revenue).sum();
            prop_assert!((bucket_sum - first.totals.total_revenue).abs() < 1e-6);
            prop_assert_eq!(first.totals.total_services, i64::try_from(costs.len()).unwrap());
        }
    }

    #[tokio::test]
    async fn test_ensure_summary_bootstraps_once() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        let client = create_test_client(&db, "t1", "Ana").await?;
        let vehicle = create_test_vehicle(&db, "t1", client.id).await?;
        create_test_service(&db, "t1", vehicle.id, 500.0).await?;
        create_test_service(&db, "t1", vehicle.id, 300.0).await?;

        assert!(ensure_summary(&db, "t1", test_now()).await?);

        let summary = get_cached_summary(&db, "t1").await?.unwrap();
        assert_eq!(summary.total_revenue, 800.0);
        assert_eq!(summary.total_clients, 1);
        assert_eq!(summary.total_services, 2);
        assert!(tenant::require_tenant(&db, "t1").await?.summary_migrated);

        let revenue = get_monthly_revenue(&db, "t1").await?;
        let bucket_sum: f64 = revenue.iter().map(|b| b.revenue).sum();
        assert_eq!(bucket_sum, 800.0);

        // Second load reads the cache instead of recomputing
        assert!(!ensure_summary(&db, "t1", test_now()).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_cached_summary_is_not_rescanned() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        let client = create_test_client(&db, "t1", "Ana").await?;
        let vehicle = create_test_vehicle(&db, "t1", client.id).await?;
        let service = create_test_service(&db, "t1", vehicle.id, 100.0).await?;

        ensure_summary(&db, "t1", test_now()).await?;

        // Remove the row behind the counters' back; the cache keeps its value
        ServiceRecord::delete_by_id(service.id).exec(&db).await?;
        ensure_summary(&db, "t1", test_now()).await?;
        let summary = get_cached_summary(&db, "t1").await?.unwrap();
        assert_eq!(summary.total_services, 1);

        // A rebuild repairs the drift
        rebuild_summary(&db, "t1", test_now()).await?;
        let summary = get_cached_summary(&db, "t1").await?.unwrap();
        assert_eq!(summary.total_services, 0);
        assert_eq!(summary.total_revenue, 0.0);
        assert!(get_monthly_revenue(&db, "t1").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_persist_snapshot_rejects_stale_version() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;

        let version = ensure_summary_row(&db, "t1", test_now()).await?;
        assert_eq!(version, 0);

        let snapshot = recompute(&reference_tree());
        let new_version = persist_snapshot(&db, "t1", &snapshot, version, test_now()).await?;
        assert_eq!(new_version, 1);

        // A second writer still holding version 0 must not overwrite
        let result = persist_snapshot(&db, "t1", &SummarySnapshot::default(), 0, test_now()).await;
        assert!(matches!(result, Err(Error::SummaryConflict { .. })));

        let summary = get_cached_summary(&db, "t1").await?.unwrap();
        assert_eq!(summary.total_revenue, 800.0);
        assert_eq!(summary.version, 1);
        assert_eq!(get_client_growth(&db, "t1").await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_flag_unset() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        ensure_summary_row(&db, "t1", test_now()).await?;

        let result = persist_snapshot(&db, "t1", &SummarySnapshot::default(), 7, test_now()).await;
        assert!(result.is_err());
        assert!(!tenant::require_tenant(&db, "t1").await?.summary_migrated);

        Ok(())
    }

    fn unmigrated_tenant_row() -> tenant_entity::Model {
        tenant_entity::Model {
            id: "t1".to_string(),
            display_name: "t1".to_string(),
            activation_expires_at: None,
            summary_migrated: false,
            created_at: test_now(),
        }
    }

    fn summary_row(version: i64) -> user_summary::Model {
        user_summary::Model {
            tenant_id: "t1".to_string(),
            total_revenue: 0.0,
            total_clients: 0,
            total_services: 0,
            version,
            updated_at: test_now(),
        }
    }

    /// Queues the reads of one bootstrap attempt against an empty tenant.
    fn with_attempt_reads(mock: MockDatabase, version: i64) -> MockDatabase {
        mock.append_query_results([vec![unmigrated_tenant_row()]])
            .append_query_results([vec![summary_row(version)]])
            .append_query_results([Vec::<crate::entities::ClientModel>::new()])
            .append_query_results([Vec::<crate::entities::VehicleModel>::new()])
            .append_query_results([Vec::<crate::entities::ServiceRecordModel>::new()])
    }

    fn rows(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn count_statements(log: &[Transaction], needle: &str) -> usize {
        log.iter()
            .filter(|entry| format!("{entry:?}").contains(needle))
            .count()
    }

    #[tokio::test]
    async fn test_ensure_summary_gives_up_after_repeated_conflicts() -> Result<()> {
        let mut mock = MockDatabase::new(DatabaseBackend::Sqlite);
        for version in 0..i64::from(MAX_RECOMPUTE_ATTEMPTS) {
            mock = with_attempt_reads(mock, version).append_exec_results([rows(0)]);
        }
        let db = mock.into_connection();

        let result = ensure_summary(&db, "t1", test_now()).await;
        assert!(matches!(result, Err(Error::SummaryConflict { .. })));

        let log = db.into_transaction_log();
        // One tenant read per attempt
        assert_eq!(
            count_statements(&log, r#"FROM \"tenants\""#),
            MAX_RECOMPUTE_ATTEMPTS as usize
        );
        // The migration flag was never written
        assert_eq!(count_statements(&log, r#"UPDATE \"tenants\""#), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_summary_retries_after_one_conflict() -> Result<()> {
        let db = with_attempt_reads(
            with_attempt_reads(MockDatabase::new(DatabaseBackend::Sqlite), 0),
            1,
        )
        // First swap loses, second wins, then the bucket deletes and the flag update
        .append_exec_results([rows(0), rows(1), rows(0), rows(0), rows(1)])
        .into_connection();

        assert!(ensure_summary(&db, "t1", test_now()).await?);

        let log = db.into_transaction_log();
        assert_eq!(count_statements(&log, r#"FROM \"tenants\""#), 2);
        assert_eq!(count_statements(&log, r#"UPDATE \"tenants\""#), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_summary_unknown_tenant() -> Result<()> {
        let db = setup_test_db().await?;
        let result = ensure_summary(&db, "ghost", test_now()).await;
        assert!(matches!(result, Err(Error::TenantNotFound { .. })));
        Ok(())
    }
}
