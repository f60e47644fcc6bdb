//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod activation_code;
pub mod client;
pub mod client_growth;
pub mod monthly_revenue;
pub mod service_record;
pub mod tenant;
pub mod user_summary;
pub mod vehicle;

// Re-export specific types to avoid conflicts
pub use activation_code::{
    Column as ActivationCodeColumn, Entity as ActivationCode, Model as ActivationCodeModel,
};
pub use client::{Column as ClientColumn, Entity as Client, Model as ClientModel};
pub use client_growth::{
    Column as ClientGrowthColumn, Entity as ClientGrowth, Model as ClientGrowthModel,
};
pub use monthly_revenue::{
    Column as MonthlyRevenueColumn, Entity as MonthlyRevenue, Model as MonthlyRevenueModel,
};
pub use service_record::{
    Column as ServiceRecordColumn, Entity as ServiceRecord, Model as ServiceRecordModel,
};
pub use tenant::{Column as TenantColumn, Entity as Tenant, Model as TenantModel};
pub use user_summary::{
    Column as UserSummaryColumn, Entity as UserSummary, Model as UserSummaryModel,
};
pub use vehicle::{Column as VehicleColumn, Entity as Vehicle, Model as VehicleModel};
