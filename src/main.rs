#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use studio_desk::{
    config::{self, database},
    core::{account, subscription_type},
    errors::Result,
    web::{self, AppState},
};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!("Successfully processed application configuration.");

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Seed plans and the bootstrap administrator
    subscription_type::seed_subscription_types(&db, &app_config.plans)
        .await
        .inspect(|created| info!("Seeded {} subscription types.", created))
        .inspect_err(|e| error!("Failed to seed subscription types: {}", e))?;
    if let Some(admin) = &app_config.admin {
        account::ensure_admin(&db, &admin.username, &admin.email)
            .await
            .inspect_err(|e| error!("Failed to create administrator: {}", e))?;
    }

    // 6. Serve
    let listener = TcpListener::bind(app_config.server.bind.as_str())
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind, e))?;
    web::serve(listener, AppState::new(db, app_config)).await
}
