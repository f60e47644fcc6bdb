//! Core business logic, independent of any user interface.

/// Single-use activation codes that extend account access
pub mod activation;
/// Flattening the client tree into one row per service
pub mod aggregate;
/// Client CRUD with cascade delete
pub mod client;
/// Incremental adjustments of the summary caches
pub mod counters;
/// Dashboard view assembled from the summary caches
pub mod dashboard;
/// Normalization of raw document timestamps
pub mod dates;
/// Expiration classification and renewal windows
pub mod expiration;
/// Import of document-database exports
pub mod import;
/// Page of results for list views
pub mod page;
/// Renewal reminders view
pub mod renewals;
/// Plain-text formatting of dashboard data
pub mod report;
/// Service record CRUD and expiration derivation
pub mod service;
/// Summary recomputation and the bootstrap path
pub mod summary;
/// Tenant profiles and access checks
pub mod tenant;
/// Loading a tenant's client, vehicle and service tree
pub mod tree;
/// Vehicle CRUD with cascade delete
pub mod vehicle;
