//! Parent accounts.

use super::split_validation;
use crate::{
    core::account::{self, NewAccount},
    errors::Result,
    web::{AppState, Message, Page, Redirect, View, forms::ParentForm, identity::AdminUser},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

const PARENTS_URL: &str = "/parents/create/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/parents/create/", get(create_form).post(create))
        .route("/parents/:id/delete/", post(delete))
}

async fn parents_view(state: &AppState, form: &ParentForm) -> Result<View> {
    let parents = account::list_parents(&state.database).await?;
    View::new("admin/parent_create")
        .with("parents", &parents)?
        .with("form", form)
}

pub async fn create_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Page> {
    let view = parents_view(&state, &ParentForm::default()).await?;
    state.render(&user, view).await
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(form): Json<ParentForm>,
) -> Result<Page> {
    let new = NewAccount::from(form.clone());
    match split_validation(account::create_parent(&state.database, &new).await)? {
        Ok(parent) => Ok(Redirect::to(PARENTS_URL)
            .message(Message::success(format!(
                "Parent \"{}\" created.",
                parent.username
            )))
            .into()),
        Err(errors) => {
            let view = parents_view(&state, &form).await?.invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    let parent = account::delete_parent(&state.database, id).await?;
    Ok(Redirect::to(PARENTS_URL).message(Message::success(format!(
        "Parent \"{}\" deleted.",
        parent.username
    ))))
}
