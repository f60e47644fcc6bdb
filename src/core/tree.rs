//! Materialized client → vehicle → service tree for one tenant.
//!
//! Aggregation, renewal classification and summary recomputation all work on this
//! in-memory tree. It is fetched in one read transaction so that callers only ever see
//! a complete snapshot; a failed read surfaces as an error and no tree at all.

use crate::{
    entities::{Client, ServiceRecord, Vehicle, client, service_record, vehicle},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use std::collections::HashMap;

/// A client together with its vehicles.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientTree {
    /// The client row
    pub client: client::Model,
    /// Vehicles owned by the client, in insertion order
    pub vehicles: Vec<VehicleTree>,
}

/// A vehicle together with its service history.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleTree {
    /// The vehicle row
    pub vehicle: vehicle::Model,
    /// Service history of the vehicle, in insertion order
    pub services: Vec<service_record::Model>,
}

impl ClientTree {
    /// Number of service records under this client.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.vehicles.iter().map(|v| v.services.len()).sum()
    }
}

/// Assembles trees from flat row lists. Rows whose parent is missing are dropped.
#[must_use]
pub fn assemble(
    clients: Vec<client::Model>,
    vehicles: Vec<vehicle::Model>,
    services: Vec<service_record::Model>,
) -> Vec<ClientTree> {
    let mut services_by_vehicle: HashMap<i64, Vec<service_record::Model>> = HashMap::new();
    for service in services {
        services_by_vehicle
            .entry(service.vehicle_id)
            .or_default()
            .push(service);
    }

    let mut vehicles_by_client: HashMap<i64, Vec<VehicleTree>> = HashMap::new();
    for vehicle in vehicles {
        let services = services_by_vehicle.remove(&vehicle.id).unwrap_or_default();
        vehicles_by_client
            .entry(vehicle.client_id)
            .or_default()
            .push(VehicleTree { vehicle, services });
    }

    clients
        .into_iter()
        .map(|client| {
            let vehicles = vehicles_by_client.remove(&client.id).unwrap_or_default();
            ClientTree { client, vehicles }
        })
        .collect()
}

/// Loads every client of a tenant with its vehicles and services.
pub async fn load_client_trees(
    db: &DatabaseConnection,
    tenant_id: &str,
) -> Result<Vec<ClientTree>> {
    let txn = db.begin().await?;

    let clients = Client::find()
        .filter(client::Column::TenantId.eq(tenant_id))
        .order_by_asc(client::Column::Id)
        .all(&txn)
        .await?;
    let vehicles = Vehicle::find()
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .order_by_asc(vehicle::Column::Id)
        .all(&txn)
        .await?;
    let services = ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .order_by_asc(service_record::Column::Id)
        .all(&txn)
        .await?;

    txn.commit().await?;

    tracing::debug!(
        tenant_id,
        clients = clients.len(),
        vehicles = vehicles.len(),
        services = services.len(),
        "Loaded client tree"
    );

    Ok(assemble(clients, vehicles, services))
}

/// Loads the tree of a single client, used by the client detail view.
pub async fn load_client_tree(
    db: &DatabaseConnection,
    tenant_id: &str,
    client_id: i64,
) -> Result<ClientTree> {
    let txn = db.begin().await?;

    let client = Client::find_by_id(client_id)
        .filter(client::Column::TenantId.eq(tenant_id))
        .one(&txn)
        .await?
        .ok_or(Error::ClientNotFound { id: client_id })?;
    let vehicles = Vehicle::find()
        .filter(vehicle::Column::TenantId.eq(tenant_id))
        .filter(vehicle::Column::ClientId.eq(client_id))
        .order_by_asc(vehicle::Column::Id)
        .all(&txn)
        .await?;
    let services = ServiceRecord::find()
        .filter(service_record::Column::TenantId.eq(tenant_id))
        .filter(service_record::Column::ClientId.eq(client_id))
        .order_by_asc(service_record::Column::Id)
        .all(&txn)
        .await?;

    txn.commit().await?;

    assemble(vec![client], vehicles, services)
        .pop()
        .ok_or(Error::ClientNotFound { id: client_id })
}
