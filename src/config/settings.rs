//! Application settings loaded from config.toml
//!
//! Every key is optional. Missing sections and keys fall back to the defaults the
//! dashboard and renewals views were designed around: a 30 day "expiring soon"
//! horizon, a 2 month renewals window and 15 rows per page.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Dashboard view settings
    pub dashboard: DashboardSettings,
    /// Renewals view settings
    pub renewals: RenewalSettings,
    /// Paginated list settings
    pub pagination: PaginationSettings,
    /// Activation code settings
    pub activation: ActivationSettings,
}

/// Dashboard view settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DashboardSettings {
    /// Services expiring within this many days count as "expiring soon"
    pub horizon_days: u32,
    /// Number of upcoming expirations to list
    pub upcoming_limit: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            horizon_days: 30,
            upcoming_limit: 5,
        }
    }
}

/// Renewals view settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RenewalSettings {
    /// Calendar months ahead of now included in the renewals list
    pub window_months: u32,
}

impl Default for RenewalSettings {
    fn default() -> Self {
        Self { window_months: 2 }
    }
}

/// Paginated list settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationSettings {
    /// Rows per page
    pub page_size: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self { page_size: 15 }
    }
}

/// Activation code settings
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ActivationSettings {
    /// Length of generated codes
    pub code_length: usize,
    /// Days of access granted by a newly issued code
    pub default_validity_days: u32,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            code_length: 8,
            default_validity_days: 30,
        }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A key has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading settings from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads settings from the default location (./config.toml), or the defaults
/// when that file does not exist.
pub fn load_default_config() -> Result<Settings> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!("config.toml not found, using default settings");
        Ok(Settings::default())
    }
}
