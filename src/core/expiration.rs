//! Expiration classification for service records.
//!
//! A service is `Expired` once its expiration date is strictly before now,
//! `ExpiringSoon` from now up to (but excluding) the end of the horizon, and
//! `Future` from the end of the horizon on. The label is cosmetic and never
//! feeds back into the state.

use crate::core::aggregate::AggregatedService;
use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

/// Forward-looking window that defines "expiring soon".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    /// A fixed number of days
    Days(u32),
    /// A number of calendar months
    Months(u32),
}

impl Horizon {
    /// First instant that is no longer inside the window.
    #[must_use]
    pub fn end(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let end = match self {
            Self::Days(days) => now.checked_add_signed(Duration::days(i64::from(days))),
            Self::Months(months) => now.checked_add_months(Months::new(months)),
        };
        end.unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Expiration state of a service relative to now and a horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationState {
    /// Expiration date is in the past
    Expired,
    /// Expiration date is inside the horizon
    ExpiringSoon,
    /// Expiration date is at or past the end of the horizon
    Future,
}

impl ExpirationState {
    /// Whether the renewals view should surface the service.
    #[must_use]
    pub const fn needs_attention(self) -> bool {
        matches!(self, Self::Expired | Self::ExpiringSoon)
    }
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Expiration state
    pub state: ExpirationState,
    /// Relative and absolute description, e.g. `expires in 14 days (Jan 15, 2024)`
    pub label: String,
}

/// Classifies an expiration date.
#[must_use]
pub fn classify(
    expiration: DateTime<Utc>,
    now: DateTime<Utc>,
    horizon: Horizon,
) -> Classification {
    Classification {
        state: state_of(expiration, now, horizon),
        label: relative_label(expiration, now),
    }
}

/// The state half of [`classify`], without building a label.
#[must_use]
pub fn state_of(expiration: DateTime<Utc>, now: DateTime<Utc>, horizon: Horizon) -> ExpirationState {
    if expiration < now {
        ExpirationState::Expired
    } else if expiration < horizon.end(now) {
        ExpirationState::ExpiringSoon
    } else {
        ExpirationState::Future
    }
}

/// Human-relative description of an expiration date.
#[must_use]
pub fn relative_label(expiration: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let absolute = expiration.format("%b %-d, %Y");
    if expiration < now {
        match (now - expiration).num_days() {
            0 => format!("expired today ({absolute})"),
            1 => format!("expired yesterday ({absolute})"),
            days => format!("expired {days} days ago ({absolute})"),
        }
    } else {
        match (expiration - now).num_days() {
            0 => format!("expires today ({absolute})"),
            1 => format!("expires tomorrow ({absolute})"),
            days => format!("expires in {days} days ({absolute})"),
        }
    }
}

/// An aggregated service with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedService {
    /// The flattened service row
    pub item: AggregatedService,
    /// Its classification
    pub classification: Classification,
}

/// Services that are expired or expire inside the horizon, earliest first.
///
/// Services with equal expiration dates keep their traversal order.
#[must_use]
pub fn needs_attention(
    services: Vec<AggregatedService>,
    now: DateTime<Utc>,
    horizon: Horizon,
) -> Vec<ClassifiedService> {
    let mut out: Vec<ClassifiedService> = services
        .into_iter()
        .filter_map(|item| {
            let classification = classify(item.expiration_date(), now, horizon);
            classification
                .state
                .needs_attention()
                .then_some(ClassifiedService {
                    item,
                    classification,
                })
        })
        .collect();
    out.sort_by_key(|c| c.item.expiration_date());
    out
}

/// Services that have not expired yet, nearest expiration first, at most `limit`.
///
/// Services with the same expiration date keep id order, the same order
/// [`crate::core::dashboard::upcoming_services`] reads from the database.
#[must_use]
pub fn upcoming(
    services: Vec<AggregatedService>,
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<AggregatedService> {
    let mut out: Vec<AggregatedService> = services
        .into_iter()
        .filter(|s| s.expiration_date() >= now)
        .collect();
    out.sort_by_key(|s| (s.expiration_date(), s.service.id));
    out.truncate(limit);
    out
}
