//! Unified error type for `DetailBook`.
//!
//! Every fallible operation in the crate returns [`Result`]. Database errors are
//! propagated unmodified; callers own user-facing messaging.

use thiserror::Error;

/// Crate-wide error enum.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration or input that could not be interpreted
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of the problem
        message: String,
    },

    /// Error raised by the database layer
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Tenant profile does not exist
    #[error("Tenant not found: {id}")]
    TenantNotFound {
        /// Tenant identifier that was looked up
        id: String,
    },

    /// Client does not exist within the tenant
    #[error("Client not found: {id}")]
    ClientNotFound {
        /// Client identifier that was looked up
        id: i64,
    },

    /// Vehicle does not exist within the tenant
    #[error("Vehicle not found: {id}")]
    VehicleNotFound {
        /// Vehicle identifier that was looked up
        id: i64,
    },

    /// Service record does not exist within the tenant
    #[error("Service record not found: {id}")]
    ServiceNotFound {
        /// Service identifier that was looked up
        id: i64,
    },

    /// Monetary amount is negative or not finite
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Service duration cannot be stored or added to the start date
    #[error("Invalid duration: {value}")]
    InvalidDuration {
        /// The rejected duration value
        value: u32,
    },

    /// No activation code matches the submitted string
    #[error("Activation code not found: {code}")]
    ActivationCodeNotFound {
        /// Normalized code that was submitted
        code: String,
    },

    /// Activation code was already consumed
    #[error("Activation code already used: {code}")]
    ActivationCodeUsed {
        /// Normalized code that was submitted
        code: String,
    },

    /// Summary cache kept changing underneath the bootstrap recompute
    #[error("Summary for tenant {tenant_id} changed during recompute")]
    SummaryConflict {
        /// Tenant whose summary could not be written
        tenant_id: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// Integer conversion error
    #[error("Integer conversion error: {0}")]
    TryFromInt(#[from] std::num::TryFromIntError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
