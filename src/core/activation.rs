//! Activation codes - single-use codes that extend a tenant's access.
//!
//! Codes are uppercase alphanumeric and redeemed case-insensitively. Redemption
//! claims the code with a conditional update on `is_used = false`, so two tenants
//! racing for the same code cannot both win.

use crate::{
    core::tenant,
    entities::{ActivationCode, activation_code, tenant as tenant_entity},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Attempts at finding an unused code before giving up.
const MAX_ISSUE_ATTEMPTS: u32 = 5;

/// Generates a random uppercase alphanumeric code.
#[must_use]
pub fn generate_code_string(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

async fn find_code<C>(db: &C, code: &str) -> Result<Option<activation_code::Model>>
where
    C: ConnectionTrait,
{
    ActivationCode::find()
        .filter(activation_code::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Issues a new code granting `validity_days` of access.
pub async fn issue_code(
    db: &DatabaseConnection,
    validity_days: u32,
    code_length: usize,
    now: DateTime<Utc>,
) -> Result<activation_code::Model> {
    let days = i32::try_from(validity_days).map_err(|_| Error::InvalidDuration {
        value: validity_days,
    })?;
    if days == 0 {
        return Err(Error::InvalidDuration { value: 0 });
    }
    if code_length == 0 {
        return Err(Error::Config {
            message: "Activation code length must be positive".to_string(),
        });
    }

    for attempt in 1..=MAX_ISSUE_ATTEMPTS {
        let code = generate_code_string(code_length);
        if find_code(db, &code).await?.is_some() {
            tracing::debug!(attempt, "Generated activation code already exists");
            continue;
        }

        let row = activation_code::ActiveModel {
            code: Set(code.clone()),
            validity_days: Set(days),
            is_used: Set(false),
            used_by: Set(None),
            used_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        match row.insert(db).await {
            Ok(issued) => {
                info!(validity_days, "Issued activation code");
                return Ok(issued);
            }
            // Lost a race on the unique index
            Err(e) => {
                if find_code(db, &code).await?.is_none() {
                    return Err(e.into());
                }
            }
        }
    }

    Err(Error::Config {
        message: format!("Could not generate a unique activation code in {MAX_ISSUE_ATTEMPTS} attempts"),
    })
}

/// Redeems a code for a tenant and returns the new access expiry.
///
/// The code is trimmed and uppercased before lookup. It is claimed with a
/// conditional update on `is_used = false`, so only one of two concurrent
/// redemptions can succeed. Access is extended from the current expiry if it is
/// still in the future, otherwise from `now`. The claim and the tenant update
/// commit together.
///
/// # Arguments
/// * `tenant_id` - Tenant receiving the access
/// * `code` - Code as typed by the user
/// * `now` - Redemption time, stored on the code
///
/// # Returns
/// The tenant's new `activation_expires_at`. Fails with `ActivationCodeNotFound`
/// for unknown or blank codes, `ActivationCodeUsed` for spent codes and
/// `TenantNotFound` for unknown tenants.
pub async fn redeem_code(
    db: &DatabaseConnection,
    tenant_id: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let code = normalize_code(code);
    if code.is_empty() {
        return Err(Error::ActivationCodeNotFound { code });
    }

    let txn = db.begin().await?;

    let tenant = tenant::require_tenant(&txn, tenant_id).await?;
    let record = find_code(&txn, &code)
        .await?
        .ok_or_else(|| Error::ActivationCodeNotFound { code: code.clone() })?;
    if record.is_used {
        return Err(Error::ActivationCodeUsed { code });
    }

    // Zero rows means another redemption claimed it after our read
    let claimed = ActivationCode::update_many()
        .col_expr(activation_code::Column::IsUsed, Expr::value(true))
        .col_expr(activation_code::Column::UsedBy, Expr::value(tenant_id))
        .col_expr(activation_code::Column::UsedAt, Expr::value(now))
        .filter(activation_code::Column::Id.eq(record.id))
        .filter(activation_code::Column::IsUsed.eq(false))
        .exec(&txn)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(Error::ActivationCodeUsed { code });
    }

    // Stack on an unexpired period
    let base = tenant
        .activation_expires_at
        .filter(|expires_at| *expires_at > now)
        .unwrap_or(now);
    let expires_at = base
        .checked_add_signed(Duration::days(i64::from(record.validity_days)))
        .ok_or(Error::InvalidDuration {
            value: record.validity_days.unsigned_abs(),
        })?;

    let mut active: tenant_entity::ActiveModel = tenant.into();
    active.activation_expires_at = Set(Some(expires_at));
    active.update(&txn).await?;

    txn.commit().await?;

    info!(tenant_id, %expires_at, "Activation code redeemed");
    Ok(expires_at)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_generate_code_string() {
        let code = generate_code_string(12);
        assert_eq!(code.len(), 12);
        assert!(
            code.chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
        assert!(generate_code_string(0).is_empty());
    }

    #[tokio::test]
    async fn test_issue_code_rejects_zero_days() -> Result<()> {
        let db = setup_test_db().await?;
        let result = issue_code(&db, 0, 8, test_now()).await;
        assert!(matches!(result, Err(Error::InvalidDuration { value: 0 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_extends_access() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        let now = test_now();

        let first = issue_code(&db, 30, 8, now).await?;
        let expires = redeem_code(&db, "t1", &format!("  {} ", first.code.to_lowercase()), now)
            .await?;
        assert_eq!(expires, now + Duration::days(30));

        let tenant = tenant::require_tenant(&db, "t1").await?;
        assert!(tenant::is_active(&tenant, now));

        let used = find_code(&db, &first.code).await?.unwrap();
        assert!(used.is_used);
        assert_eq!(used.used_by.as_deref(), Some("t1"));
        assert_eq!(used.used_at, Some(now));

        // Stacks on top of the unexpired period
        let second = issue_code(&db, 10, 8, now).await?;
        let later = now + Duration::days(5);
        let expires = redeem_code(&db, "t1", &second.code, later).await?;
        assert_eq!(expires, now + Duration::days(40));

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_after_lapse_starts_from_now() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        let now = test_now();

        let first = issue_code(&db, 1, 8, now).await?;
        redeem_code(&db, "t1", &first.code, now).await?;

        let later = now + Duration::days(10);
        let second = issue_code(&db, 7, 8, later).await?;
        let expires = redeem_code(&db, "t1", &second.code, later).await?;
        assert_eq!(expires, later + Duration::days(7));

        Ok(())
    }

    #[tokio::test]
    async fn test_code_is_single_use() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;
        create_test_tenant(&db, "t2").await?;

        let issued = issue_code(&db, 30, 8, test_now()).await?;
        redeem_code(&db, "t1", &issued.code, test_now()).await?;

        let again = redeem_code(&db, "t2", &issued.code, test_now()).await;
        assert!(matches!(again, Err(Error::ActivationCodeUsed { .. })));

        let t2 = tenant::require_tenant(&db, "t2").await?;
        assert!(t2.activation_expires_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_redeem_unknown_code_or_tenant() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;

        let missing = redeem_code(&db, "t1", "NOPE1234", test_now()).await;
        assert!(matches!(missing, Err(Error::ActivationCodeNotFound { .. })));

        let blank = redeem_code(&db, "t1", "   ", test_now()).await;
        assert!(matches!(blank, Err(Error::ActivationCodeNotFound { .. })));

        let issued = issue_code(&db, 30, 8, test_now()).await?;
        let ghost = redeem_code(&db, "ghost", &issued.code, test_now()).await;
        assert!(matches!(ghost, Err(Error::TenantNotFound { .. })));
        assert!(!find_code(&db, &issued.code).await?.unwrap().is_used);

        Ok(())
    }
}
