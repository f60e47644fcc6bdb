//! Maintenance entry point: prepares the database and warms tenant summaries.
//!
//! Usage:
//! * `detailbook` bootstraps every tenant whose summary has not been computed yet
//!   and logs each tenant's dashboard
//! * `detailbook import <tenant-id> <export.json>` imports a document export
//! * `detailbook issue-code [validity-days]` prints a new activation code

use chrono::Utc;
use detailbook::{
    config::{database, settings},
    core::{activation, dashboard, import, report, summary, tenant},
    errors::{Error, Result},
};
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load settings
    let settings = settings::load_default_config()?;

    // 4. Initialize database
    std::fs::create_dir_all("data")?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] => warm_summaries(&db, &settings).await,
        ["import", tenant_id, path] => {
            let contents = std::fs::read_to_string(path)?;
            let export = serde_json::from_str(&contents).map_err(|e| Error::Config {
                message: format!("Failed to parse {path}: {e}"),
            })?;
            let result = import::import_documents(&db, tenant_id, &export, Utc::now()).await?;
            info!(?result, "Import complete");
            Ok(())
        }
        ["issue-code", rest @ ..] => {
            let validity_days = match rest {
                [days] => days.parse().map_err(|_| Error::Config {
                    message: format!("Invalid validity days: {days}"),
                })?,
                _ => settings.activation.default_validity_days,
            };
            let code = activation::issue_code(
                &db,
                validity_days,
                settings.activation.code_length,
                Utc::now(),
            )
            .await?;
            println!("{}", code.code);
            Ok(())
        }
        _ => Err(Error::Config {
            message: format!("Unrecognized arguments: {}", args.join(" ")),
        }),
    }
}

async fn warm_summaries(db: &DatabaseConnection, settings: &settings::Settings) -> Result<()> {
    let now = Utc::now();
    for tenant in tenant::list_tenants(db).await? {
        if !tenant.summary_migrated {
            // A failed bootstrap leaves the flag unset; the next run retries it
            if let Err(e) = summary::ensure_summary(db, &tenant.id, now).await {
                error!(tenant_id = %tenant.id, "Summary bootstrap failed: {}", e);
                continue;
            }
        }

        let view = dashboard::load_dashboard(db, &tenant.id, settings, now).await?;
        info!(
            tenant_id = %tenant.id,
            active = tenant::is_active(&tenant, now),
            "\n{}",
            report::format_dashboard_summary(&view)
        );
    }
    Ok(())
}
