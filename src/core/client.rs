//! Client business logic - Handles all client-related operations.
//!
//! Creating and deleting clients keeps the summary caches current through
//! [`crate::core::counters`], in the same transaction as the row change. Deleting a
//! client removes its vehicles and their service history.

use crate::{
    core::{
        counters::{self, SummaryDelta},
        page::Page,
        tenant,
        tree::{self, ClientTree},
    },
    entities::{Client, ServiceRecord, Vehicle, client, service_record, vehicle},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Fields entered when adding a client.
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    /// Full name, required
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
}

/// Profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    /// New name
    pub name: Option<String>,
    /// New email, `Some(None)` clears it
    pub email: Option<Option<String>>,
    /// New phone, `Some(None)` clears it
    pub phone: Option<Option<String>>,
}

/// What a cascade delete removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientDeletion {
    /// Vehicles removed with the client
    pub vehicles_removed: u64,
    /// Service records removed with the client
    pub services_removed: u64,
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config {
            message: "Client name cannot be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Adds a client to a tenant and counts it in the summary caches.
pub async fn create_client(
    db: &DatabaseConnection,
    tenant_id: &str,
    new_client: NewClient,
    now: DateTime<Utc>,
) -> Result<client::Model> {
    let name = validate_name(&new_client.name)?;

    let txn = db.begin().await?;
    tenant::require_tenant(&txn, tenant_id).await?;

    let client = client::ActiveModel {
        tenant_id: Set(tenant_id.to_string()),
        name: Set(name),
        email: Set(clean_optional(new_client.email)),
        phone: Set(clean_optional(new_client.phone)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let client = client.insert(&txn).await?;

    counters::apply(
        &txn,
        tenant_id,
        &SummaryDelta::client(client.created_at, 1),
        now,
    )
    .await?;

    txn.commit().await?;
    Ok(client)
}

/// Finds a client of the tenant by id.
pub async fn get_client<C>(db: &C, tenant_id: &str, client_id: i64) -> Result<Option<client::Model>>
where
    C: ConnectionTrait,
{
    Client::find_by_id(client_id)
        .filter(client::Column::TenantId.eq(tenant_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the tenant's clients, newest first.
pub async fn list_clients(
    db: &DatabaseConnection,
    tenant_id: &str,
    page: u64,
    page_size: u64,
) -> Result<Page<client::Model>> {
    let page_size = page_size.max(1);
    let paginator = Client::find()
        .filter(client::Column::TenantId.eq(tenant_id))
        .order_by_desc(client::Column::CreatedAt)
        .order_by_desc(client::Column::Id)
        .paginate(db, page_size);

    let counts = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page).await?;

    Ok(Page {
        items,
        page,
        page_size,
        total_items: counts.number_of_items,
        total_pages: counts.number_of_pages,
    })
}

/// Applies profile edits to a client.
pub async fn update_client(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
    changes: ClientChanges,
    now: DateTime<Utc>,
) -> Result<client::Model> {
    let existing = get_client(db, tenant_id, client_id)
        .await?
        .ok_or(Error::ClientNotFound { id: client_id })?;

    let mut active: client::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(validate_name(&name)?);
    }
    if let Some(email) = changes.email {
        active.email = Set(clean_optional(email));
    }
    if let Some(phone) = changes.phone {
        active.phone = Set(clean_optional(phone));
    }
    active.updated_at = Set(now);

    active.update(db).await.map_err(Into::into)
}

/// Deletes a client with all of its vehicles and service records.
///
/// The services are read before they are deleted so their costs and start months
/// can be taken back out of the summary caches. The client count drops by one in
/// the month the client was created. Everything happens in one transaction; a
/// failure at any step leaves the client, its children and the caches untouched.
///
/// # Arguments
/// * `tenant_id` - Tenant that owns the client
/// * `client_id` - Client to delete
/// * `now` - Timestamp recorded on the summary
///
/// # Returns
/// How many vehicles and services were removed, or `ClientNotFound` when the
/// client is missing or belongs to another tenant.
pub async fn delete_client(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
    now: DateTime<Utc>,
) -> Result<ClientDeletion> {
    let txn = db.begin().await?;

    let client = get_client(&txn, tenant_id, client_id)
        .await?
        .ok_or(Error::ClientNotFound { id: client_id })?;

    // Snapshot the services first; their costs are gone after the delete
    let services = ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::ClientId.eq(client_id))
        .all(&txn)
        .await?;

    let mut delta = SummaryDelta::client(client.created_at, -1);
    delta.remove_services(&services);

    // Children before the parent
    let services_removed = ServiceRecord::delete_many()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::ClientId.eq(client_id))
        .exec(&txn)
        .await?
        .rows_affected;
    let vehicles_removed = Vehicle::delete_many()
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .filter(vehicle::Column::ClientId.eq(client_id))
        .exec(&txn)
        .await?
        .rows_affected;
    client.delete(&txn).await?;

    counters::apply(&txn, tenant_id, &delta, now).await?;

    txn.commit().await?;

    tracing::info!(
        tenant_id,
        client_id,
        vehicles_removed,
        services_removed,
        "Client deleted"
    );

    Ok(ClientDeletion {
        vehicles_removed,
        services_removed,
    })
}

/// Client with its vehicles and service history.
pub async fn get_client_detail(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
) -> Result<ClientTree> {
    tree::load_client_tree(db, tenant_id, client_id).await
}
