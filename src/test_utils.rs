//! Shared test utilities for the studio service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        account::{self, NewAccount},
        subscription,
    },
    entities::{self, Group},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Installs a test-writer tracing subscriber; repeated calls are harmless.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("studio_desk=debug")
        .with_test_writer()
        .try_init();
}

/// Creates a plan.
pub async fn create_test_plan(
    db: &DatabaseConnection,
    name: &str,
    lessons_count: i32,
    price: f64,
) -> Result<entities::subscription_type::Model> {
    entities::subscription_type::ActiveModel {
        name: Set(name.to_string()),
        lessons_count: Set(lessons_count),
        price: Set(price),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an account in the Parent group.
///
/// # Defaults
/// * `email`: `<username>@example.com`
/// * `first_name` / `last_name`: empty
pub async fn create_test_parent(
    db: &DatabaseConnection,
    username: &str,
) -> Result<entities::account::Model> {
    account::create_account(
        db,
        &NewAccount {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            ..Default::default()
        },
        &[Group::Parent],
    )
    .await
}

/// Creates a minor student and its default subscription (when a plan exists).
///
/// # Defaults
/// * `last_name`: "Test"
/// * `birth_date`: 2015-06-01
pub async fn create_test_child(
    db: &DatabaseConnection,
    first_name: &str,
    parent_id: Option<i64>,
) -> Result<entities::child::Model> {
    let child = entities::child::ActiveModel {
        parent_id: Set(parent_id),
        is_adult: Set(false),
        account_id: Set(None),
        first_name: Set(first_name.to_string()),
        last_name: Set("Test".to_string()),
        birth_date: Set(NaiveDate::from_ymd_opt(2015, 6, 1)),
        gender: Set(entities::Gender::Unspecified),
        notes: Set(String::new()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    subscription::ensure_subscription(db, child.id).await?;
    Ok(child)
}

/// Creates a one-hour session on 2024-08-20 at 18:00 with the given participants.
pub async fn create_test_session(
    db: &DatabaseConnection,
    participant_ids: &[i64],
) -> Result<entities::training_session::Model> {
    let start = NaiveDate::from_ymd_opt(2024, 8, 20)
        .and_then(|d| d.and_hms_opt(18, 0, 0))
        .unwrap_or_default();
    let created = crate::core::session::create_session(
        db,
        &crate::core::session::SessionInput {
            start,
            duration_minutes: 60,
            participant_ids: participant_ids.to_vec(),
            notes: String::new(),
        },
        false,
    )
    .await?;
    created
        .into_iter()
        .next()
        .ok_or_else(|| sea_orm::DbErr::RecordNotInserted.into())
}
