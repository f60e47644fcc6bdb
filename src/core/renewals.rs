//! Renewals view - services that are expired or expire inside the renewal window.

use crate::{
    config::settings::Settings,
    core::{
        aggregate::aggregate_services,
        expiration::{ClassifiedService, Horizon, needs_attention},
        page::Page,
        tree,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

/// Loads one page of services that need a renewal reminder, earliest expiration first.
///
/// Services already marked renewed are left out.
pub async fn load_renewals(
    db: &DatabaseConnection,
    tenant_id: &str,
    settings: &Settings,
    page: u64,
    now: DateTime<Utc>,
) -> Result<Page<ClassifiedService>> {
    let trees = tree::load_client_trees(db, tenant_id).await?;
    let pending: Vec<_> = aggregate_services(&trees)
        .into_iter()
        .filter(|row| !row.service.is_renewed)
        .collect();

    let rows = needs_attention(
        pending,
        now,
        Horizon::Months(settings.renewals.window_months),
    );
    tracing::debug!(tenant_id, count = rows.len(), "Renewals computed");

    Ok(Page::from_vec(rows, page, settings.pagination.page_size))
}
