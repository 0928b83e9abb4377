use dotenvy::dotenv;
use farm_catalog::{
    config::{catalog as seed, database, locale::LocaleTable, settings::Settings},
    core::{
        catalog::{self, ListParams},
        notify::{Feedback, TracingNotifier},
        scope::{Actor, ScopeFilter},
    },
    entities::CatalogKind,
    errors::Result,
};
use sea_orm::{DatabaseConnection, Iterable};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

async fn log_catalog_totals(db: &DatabaseConnection) -> Result<()> {
    for kind in CatalogKind::iter() {
        let params = ListParams::new(kind).with_scope(ScopeFilter::GlobalOnly);
        let page = catalog::list(db, &Actor::Operator, &params).await?;
        info!(kind = ?kind, total = page.total, "Global catalog items");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since variables can be set externally
    dotenv().ok();

    let settings = Settings::from_env()
        .inspect_err(|e| error!("Failed to read settings: {}", e))?;
    info!(locale = ?settings.locale, "Settings loaded");

    let translator = if settings.locale_path.exists() {
        LocaleTable::load(&settings.locale_path, settings.locale)?
    } else {
        warn!("No locale table at {:?}, messages will show their keys", settings.locale_path);
        LocaleTable::default().with_locale(settings.locale)
    };
    let feedback = Feedback::new(Arc::new(TracingNotifier), Arc::new(translator));

    // 3. Initialize database
    database::ensure_sqlite_dir(&settings.database_url)?;
    let db = database::create_connection(&settings.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 4. Seed the global catalog when a seed file is present
    if settings.seed_path.exists() {
        let catalog = seed::load_seed(&settings.seed_path)?;
        match seed::seed_catalog(&db, catalog).await {
            Ok(report) => {
                let created = (report.items_created + report.links_created).to_string();
                feedback.success("catalog.seeded", &[("count", created.as_str())]);
            }
            Err(e) => {
                feedback.report_error(&e);
                return Err(e);
            }
        }
    } else {
        info!("No catalog seed at {:?}, skipping", settings.seed_path);
    }

    log_catalog_totals(&db).await?;
    Ok(())
}
