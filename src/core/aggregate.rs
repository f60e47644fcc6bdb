//! Service aggregation - flattens the client tree into one row per service.
//!
//! Each row carries the service fields plus the identifying fields of its owning
//! client and vehicle. The input is only borrowed and output order is traversal
//! order; sorting is left to the caller.

use crate::{
    core::tree::ClientTree,
    entities::{client, service_record, vehicle},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A service record enriched with its owning client and vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedService {
    /// The service record
    pub service: service_record::Model,
    /// Owning client id
    pub client_id: i64,
    /// Owning client name
    pub client_name: String,
    /// Owning client phone
    pub client_phone: Option<String>,
    /// Serviced vehicle id
    pub vehicle_id: i64,
    /// Serviced vehicle make
    pub vehicle_make: String,
    /// Serviced vehicle model
    pub vehicle_model: String,
}

impl AggregatedService {
    fn new(
        client: &client::Model,
        vehicle: &vehicle::Model,
        service: &service_record::Model,
    ) -> Self {
        Self {
            service: service.clone(),
            client_id: client.id,
            client_name: client.name.clone(),
            client_phone: client.phone.clone(),
            vehicle_id: vehicle.id,
            vehicle_make: vehicle.make.clone(),
            vehicle_model: vehicle.model_name.clone(),
        }
    }

    /// Expiration date of the underlying service.
    #[must_use]
    pub const fn expiration_date(&self) -> DateTime<Utc> {
        self.service.expiration_date
    }

    /// "Make Model" label for display.
    #[must_use]
    pub fn vehicle_label(&self) -> String {
        format!("{} {}", self.vehicle_make, self.vehicle_model)
    }
}

/// Emits one [`AggregatedService`] per service record in the tree.
#[must_use]
pub fn aggregate_services(clients: &[ClientTree]) -> Vec<AggregatedService> {
    let total = clients.iter().map(ClientTree::service_count).sum();
    let mut out = Vec::with_capacity(total);

    for tree in clients {
        for vehicle_tree in &tree.vehicles {
            for service in &vehicle_tree.services {
                out.push(AggregatedService::new(
                    &tree.client,
                    &vehicle_tree.vehicle,
                    service,
                ));
            }
        }
    }

    out
}
