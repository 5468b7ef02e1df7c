//! Pages for parents and adult students.

use crate::{
    core::{child, session, subscription},
    errors::{Error, Result},
    web::{
        AppState, Page, Redirect, View,
        identity::{CurrentUser, ParentUser},
    },
};
use axum::{Router, extract::State, routing::get};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my/schedule/", get(my_schedule))
        .route("/my/children/", get(my_children))
}

/// Upcoming and past sessions of the caller's children, or of the caller
/// themself when they are an adult student.
pub async fn my_schedule(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Page> {
    if user.role.is_admin() {
        return Ok(Redirect::to("/dashboard/").into());
    }

    let child_ids: Vec<i64> = if user.role.is_parent() {
        child::children_of_parent(&state.database, user.account.id)
            .await?
            .iter()
            .map(|kid| kid.id)
            .collect()
    } else {
        let student = child::linked_student(&state.database, user.account.id)
            .await?
            .ok_or_else(|| Error::Forbidden {
                reason: "No student profile is linked to this account.".to_string(),
            })?;
        vec![student.id]
    };

    let sessions = session::sessions_for_children(&state.database, &child_ids).await?;
    let view = View::new("parent/my_schedule").with("sessions", &sessions)?;
    state.render(&user, view).await
}

pub async fn my_children(
    State(state): State<AppState>,
    ParentUser(user): ParentUser,
) -> Result<Page> {
    let children = child::children_of_parent(&state.database, user.account.id).await?;
    let ids: Vec<i64> = children.iter().map(|kid| kid.id).collect();
    let subs = subscription::subscriptions_by_child(&state.database, &ids).await?;

    let view = View::new("parent/my_children")
        .with("children", &children)?
        .with("subs", &subs)?;
    state.render(&user, view).await
}
