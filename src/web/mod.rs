//! HTTP interface: routing, identity, and the view boundary.

pub mod forms;
pub mod handlers;
pub mod identity;
pub mod view;

use crate::{
    config::AppConfig,
    core::{account::Identity, birthdays, roles::RoleFlags},
    errors::Result,
};
use axum::Router;
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
pub use view::{Message, Page, Redirect, View};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(database: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            database: Arc::new(database),
            config: Arc::new(config),
        }
    }

    /// Finishes a view for `identity`: role flags, plus upcoming birthdays
    /// for administrators.
    pub async fn render(&self, identity: &Identity, mut view: View) -> Result<Page> {
        view.roles = RoleFlags::new(identity.role, &identity.groups);
        if identity.role.is_admin() {
            view.upcoming_birthdays = birthdays::upcoming_birthdays(
                &self.database,
                today(),
                self.config.schedule.birthday_window_days,
            )
            .await?;
        }
        Ok(Page::View(view))
    }
}

/// The studio's local date.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    handlers::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = router(state);
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if !shutdown_signal(tokio::signal::ctrl_c().await) {
                // no handler, keep serving until the process is killed
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

/// Logs how the Ctrl-C wait ended; true when the signal actually arrived.
fn shutdown_signal(result: std::io::Result<()>) -> bool {
    match result {
        Ok(()) => {
            info!("Shutdown signal received");
            true
        }
        Err(e) => {
            error!("Failed to listen for the shutdown signal: {}", e);
            false
        }
    }
}
