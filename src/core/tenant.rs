//! Tenant business logic - account profiles and access checks.

use crate::{
    entities::{Tenant, tenant},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, prelude::*, sea_query::Expr};

/// Creates a tenant profile for a newly signed-up account.
pub async fn create_tenant(
    db: &DatabaseConnection,
    id: String,
    display_name: String,
    now: DateTime<Utc>,
) -> Result<tenant::Model> {
    if id.trim().is_empty() {
        return Err(Error::Config {
            message: "Tenant id cannot be empty".to_string(),
        });
    }

    let tenant = tenant::ActiveModel {
        id: Set(id.trim().to_string()),
        display_name: Set(display_name.trim().to_string()),
        activation_expires_at: Set(None),
        summary_migrated: Set(false),
        created_at: Set(now),
    };

    tenant.insert(db).await.map_err(Into::into)
}

/// Finds a tenant by id.
pub async fn get_tenant<C>(db: &C, id: &str) -> Result<Option<tenant::Model>>
where
    C: ConnectionTrait,
{
    Tenant::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a tenant by id, failing with [`Error::TenantNotFound`] if it does not exist.
pub async fn require_tenant<C>(db: &C, id: &str) -> Result<tenant::Model>
where
    C: ConnectionTrait,
{
    get_tenant(db, id)
        .await?
        .ok_or_else(|| Error::TenantNotFound { id: id.to_string() })
}

/// Lists every tenant, used by the startup summary sweep.
pub async fn list_tenants(db: &DatabaseConnection) -> Result<Vec<tenant::Model>> {
    Tenant::find().all(db).await.map_err(Into::into)
}

/// Sets or clears the summary migration flag.
pub async fn set_summary_migrated<C>(db: &C, id: &str, migrated: bool) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Tenant::update_many()
        .col_expr(tenant::Column::SummaryMigrated, Expr::value(migrated))
        .filter(tenant::Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::TenantNotFound { id: id.to_string() });
    }
    Ok(())
}

/// Whether the account currently has access.
#[must_use]
pub fn is_active(tenant: &tenant::Model, now: DateTime<Utc>) -> bool {
    tenant
        .activation_expires_at
        .is_some_and(|expires_at| expires_at > now)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_and_get_tenant() -> Result<()> {
        let db = setup_test_db().await?;

        let created = create_tenant(
            &db,
            " shop-1 ".to_string(),
            "Shiny Cars".to_string(),
            test_now(),
        )
        .await?;
        assert_eq!(created.id, "shop-1");
        assert!(!created.summary_migrated);
        assert!(created.activation_expires_at.is_none());

        let found = get_tenant(&db, "shop-1").await?;
        assert_eq!(found, Some(created));
        assert!(get_tenant(&db, "nope").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tenant_rejects_blank_id() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_tenant(&db, "  ".to_string(), "x".to_string(), test_now()).await;
        assert!(matches!(result, Err(Error::Config { message: _ })));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_summary_migrated() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_tenant(&db, "t1").await?;

        set_summary_migrated(&db, "t1", true).await?;
        assert!(require_tenant(&db, "t1").await?.summary_migrated);

        set_summary_migrated(&db, "t1", false).await?;
        assert!(!require_tenant(&db, "t1").await?.summary_migrated);

        let missing = set_summary_migrated(&db, "ghost", true).await;
        assert!(matches!(missing, Err(Error::TenantNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_is_active() -> Result<()> {
        let db = setup_test_db().await?;
        let mut tenant = create_test_tenant(&db, "t1").await?;
        let now = test_now();

        assert!(!is_active(&tenant, now));

        tenant.activation_expires_at = Some(now + Duration::days(1));
        assert!(is_active(&tenant, now));

        tenant.activation_expires_at = Some(now);
        assert!(!is_active(&tenant, now));

        Ok(())
    }
}
