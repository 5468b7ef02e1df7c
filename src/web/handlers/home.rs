use crate::{
    core::{calendar, session, timeslots},
    errors::Result,
    web::{
        AppState, Page, Redirect, View,
        identity::{AdminUser, CurrentUser},
        today,
    },
};
use axum::{Router, extract::State, routing::get};
use chrono::Duration;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/dashboard/", get(dashboard))
}

/// Sends administrators to the dashboard and everybody else to their schedule.
pub async fn home(CurrentUser(user): CurrentUser) -> Redirect {
    if user.role.is_admin() {
        Redirect::to("/dashboard/")
    } else {
        Redirect::to("/my/schedule/")
    }
}

pub async fn dashboard(State(state): State<AppState>, AdminUser(user): AdminUser) -> Result<Page> {
    let today = today();
    let sessions =
        session::sessions_between(&state.database, today, today + Duration::days(1)).await?;
    let slots = timeslots::group_timeslots(&sessions);
    let todays_slots = slots.get(&today).cloned().unwrap_or_default();

    let view = View::new("admin/dashboard")
        .with("today", &today)?
        .with("week_start", &calendar::week_start(today))?
        .with("todays_slots", &todays_slots)?;
    state.render(&user, view).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::super::testing::*;
    use crate::{core::account, errors::Result, test_utils::*};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_home_redirects_by_role() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        let parent = create_test_parent(&db, "olga").await?;
        let app = app(&db);

        let (status, location, _) = get(&app, "/", admin.id).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/dashboard/"));

        let (_, location, _) = get(&app, "/", parent.id).await;
        assert_eq!(location.as_deref(), Some("/my/schedule/"));
        Ok(())
    }

    #[tokio::test]
    async fn test_identity_is_required() -> Result<()> {
        let db = setup_test_db().await?;
        let app = app(&db);

        let (status, _, _) = send(&app, request(Method::GET, "/dashboard/", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = get(&app, "/dashboard/", 12345).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_is_admin_only_and_carries_flags() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        let parent = create_test_parent(&db, "olga").await?;
        let app = app(&db);

        let (status, _, _) = get(&app, "/dashboard/", parent.id).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _, body) = get(&app, "/dashboard/", admin.id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["template"], "admin/dashboard");
        assert_eq!(body["IS_ADMIN"], true);
        assert_eq!(body["IS_PARENT"], false);
        assert!(body["upcoming_birthdays"].is_array());
        Ok(())
    }
}
