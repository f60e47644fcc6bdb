//! Incremental adjustments of the summary caches.
//!
//! Client and service mutations call these inside their own database transaction,
//! so the cache moves together with the rows it describes. Totals are changed with
//! SQL arithmetic (`col = col + delta`) rather than read-modify-write, and every
//! adjustment bumps `user_summaries.version` so that a concurrent bootstrap
//! recompute notices it (see [`crate::core::summary`]).
//!
//! Tenants without a summary row are left alone: the bootstrap recompute will
//! count their rows when it runs.

use crate::{
    core::dates::month_key,
    entities::{
        ClientGrowth, MonthlyRevenue, UserSummary, client_growth, monthly_revenue,
        service_record, user_summary,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};
use std::collections::BTreeMap;

/// Net change to apply to a tenant's summary caches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryDelta {
    /// Change in client count
    pub clients: i64,
    /// Change in service count
    pub services: i64,
    /// Change in total revenue
    pub revenue: f64,
    /// Change in client growth per `YYYY-MM`
    pub growth_by_month: BTreeMap<String, i64>,
    /// Change in revenue per `YYYY-MM`
    pub revenue_by_month: BTreeMap<String, f64>,
}

impl SummaryDelta {
    /// Delta for adding (`sign = 1`) or removing (`sign = -1`) a client.
    #[must_use]
    pub fn client(created_at: DateTime<Utc>, sign: i64) -> Self {
        let mut delta = Self {
            clients: sign,
            ..Self::default()
        };
        delta.growth_by_month.insert(month_key(created_at), sign);
        delta
    }

    /// Adds a service with the given cost and start date.
    pub fn add_service(&mut self, cost: f64, start_date: DateTime<Utc>) {
        self.services += 1;
        self.revenue += cost;
        *self
            .revenue_by_month
            .entry(month_key(start_date))
            .or_insert(0.0) += cost;
    }

    /// Removes a service with the given cost and start date.
    pub fn remove_service(&mut self, cost: f64, start_date: DateTime<Utc>) {
        self.services -= 1;
        self.revenue -= cost;
        *self
            .revenue_by_month
            .entry(month_key(start_date))
            .or_insert(0.0) -= cost;
    }

    /// Removes every service in `services`.
    pub fn remove_services<'a, I>(&mut self, services: I)
    where
        I: IntoIterator<Item = &'a service_record::Model>,
    {
        for service in services {
            self.remove_service(service.cost, service.start_date);
        }
    }

    /// Whether applying the delta would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients == 0
            && self.services == 0
            && self.growth_by_month.values().all(|v| *v == 0)
            && self.revenue_by_month.values().all(|v| *v == 0.0)
    }
}

/// Applies a delta to the tenant's summary caches.
///
/// Returns `false` without touching anything when the tenant has no summary row.
pub async fn apply<C>(
    db: &C,
    tenant_id: &str,
    delta: &SummaryDelta,
    now: DateTime<Utc>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    if delta.is_empty() {
        return Ok(true);
    }

    let updated = UserSummary::update_many()
        .col_expr(
            user_summary::Column::TotalClients,
            Expr::col(user_summary::Column::TotalClients).add(delta.clients),
        )
        .col_expr(
            user_summary::Column::TotalServices,
            Expr::col(user_summary::Column::TotalServices).add(delta.services),
        )
        .col_expr(
            user_summary::Column::TotalRevenue,
            Expr::col(user_summary::Column::TotalRevenue).add(delta.revenue),
        )
        .col_expr(
            user_summary::Column::Version,
            Expr::col(user_summary::Column::Version).add(1),
        )
        .col_expr(user_summary::Column::UpdatedAt, Expr::value(now))
        .filter(user_summary::Column::TenantId.eq(tenant_id))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        tracing::debug!(tenant_id, "No summary row yet, skipping counter update");
        return Ok(false);
    }

    for (month, change) in &delta.growth_by_month {
        if *change != 0 {
            adjust_growth_bucket(db, tenant_id, month, *change).await?;
        }
    }
    for (month, change) in &delta.revenue_by_month {
        if *change != 0.0 {
            adjust_revenue_bucket(db, tenant_id, month, *change, now).await?;
        }
    }

    Ok(true)
}

async fn adjust_growth_bucket<C>(db: &C, tenant_id: &str, month: &str, change: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = ClientGrowth::find_by_id((tenant_id.to_string(), month.to_string()))
        .one(db)
        .await?;

    if existing.is_some() {
        ClientGrowth::update_many()
            .col_expr(
                client_growth::Column::Clients,
                Expr::col(client_growth::Column::Clients).add(change),
            )
            .filter(client_growth::Column::TenantId.eq(tenant_id))
            .filter(client_growth::Column::Month.eq(month))
            .exec(db)
            .await?;
    } else {
        let bucket = client_growth::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            month: Set(month.to_string()),
            clients: Set(change),
        };
        ClientGrowth::insert(bucket).exec_without_returning(db).await?;
    }

    Ok(())
}

async fn adjust_revenue_bucket<C>(
    db: &C,
    tenant_id: &str,
    month: &str,
    change: f64,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = MonthlyRevenue::find_by_id((tenant_id.to_string(), month.to_string()))
        .one(db)
        .await?;

    if existing.is_some() {
        MonthlyRevenue::update_many()
            .col_expr(
                monthly_revenue::Column::Revenue,
                Expr::col(monthly_revenue::Column::Revenue).add(change),
            )
            .col_expr(monthly_revenue::Column::UpdatedAt, Expr::value(now))
            .filter(monthly_revenue::Column::TenantId.eq(tenant_id))
            .filter(monthly_revenue::Column::Month.eq(month))
            .exec(db)
            .await?;
    } else {
        let bucket = monthly_revenue::ActiveModel {
            tenant_id: Set(tenant_id.to_string()),
            month: Set(month.to_string()),
            revenue: Set(change),
            updated_at: Set(now),
        };
        MonthlyRevenue::insert(bucket)
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
