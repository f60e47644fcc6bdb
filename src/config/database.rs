//! Database configuration module for `DetailBook`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated with `Schema::create_table_from_entity`, so the database schema
//! always matches the entity definitions without hand-written SQL.

use crate::entities::{
    ActivationCode, Client, ClientGrowth, MonthlyRevenue, ServiceRecord, Tenant, UserSummary,
    Vehicle,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/detailbook.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable,
/// falling back to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Tenant).await?;
    create_table(db, &schema, Client).await?;
    create_table(db, &schema, Vehicle).await?;
    create_table(db, &schema, ServiceRecord).await?;
    create_table(db, &schema, UserSummary).await?;
    create_table(db, &schema, ClientGrowth).await?;
    create_table(db, &schema, MonthlyRevenue).await?;
    create_table(db, &schema, ActivationCode).await?;

    Ok(())
}
