//! Subscription listing and plan management.

use super::split_validation;
use crate::{
    core::{
        subscription,
        subscription_type::{self, DeleteOutcome},
    },
    errors::Result,
    web::{AppState, Message, Page, Redirect, View, forms::PlanForm, identity::AdminUser},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};

const PLANS_URL: &str = "/subscription-types/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/", get(list))
        .route("/subscription-types/", get(plans).post(create_plan))
        .route(
            "/subscription-types/:id/edit/",
            get(edit_plan_form).post(edit_plan),
        )
        .route("/subscription-types/:id/delete/", post(delete_plan))
}

pub async fn list(State(state): State<AppState>, AdminUser(user): AdminUser) -> Result<Page> {
    let subs = subscription::list_subscriptions(&state.database).await?;
    let view = View::new("admin/subscriptions_list").with("subs", &subs)?;
    state.render(&user, view).await
}

async fn plans_view(state: &AppState, form: &PlanForm) -> Result<View> {
    let types = subscription_type::list_subscription_types(&state.database).await?;
    View::new("admin/subscription_types")
        .with("types", &types)?
        .with("form", form)
}

pub async fn plans(State(state): State<AppState>, AdminUser(user): AdminUser) -> Result<Page> {
    let view = plans_view(&state, &PlanForm::default()).await?;
    state.render(&user, view).await
}

async fn try_create_plan(state: &AppState, form: PlanForm) -> Result<()> {
    let input = form.into_input()?;
    subscription_type::create_subscription_type(&state.database, &input).await?;
    Ok(())
}

pub async fn create_plan(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(form): Json<PlanForm>,
) -> Result<Page> {
    match split_validation(try_create_plan(&state, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(PLANS_URL)
            .message(Message::success("Subscription type created."))
            .into()),
        Err(errors) => {
            let view = plans_view(&state, &form).await?.invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

async fn edit_plan_view(state: &AppState, id: i64, form: Option<&PlanForm>) -> Result<View> {
    let plan = subscription_type::get_subscription_type(&state.database, id).await?;
    let form = form.cloned().unwrap_or(PlanForm {
        name: plan.name.clone(),
        lessons_count: Some(plan.lessons_count),
        price: Some(plan.price),
    });
    View::new("admin/subscription_type_edit")
        .with("plan", &plan)?
        .with("form", &form)
}

pub async fn edit_plan_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let view = edit_plan_view(&state, id, None).await?;
    state.render(&user, view).await
}

async fn try_edit_plan(state: &AppState, id: i64, form: PlanForm) -> Result<()> {
    subscription_type::get_subscription_type(&state.database, id).await?;
    let input = form.into_input()?;
    subscription_type::update_subscription_type(&state.database, id, &input).await?;
    Ok(())
}

pub async fn edit_plan(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<PlanForm>,
) -> Result<Page> {
    match split_validation(try_edit_plan(&state, id, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(PLANS_URL)
            .message(Message::success("Subscription type updated."))
            .into()),
        Err(errors) => {
            let view = edit_plan_view(&state, id, Some(&form))
                .await?
                .invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn delete_plan(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Redirect> {
    let message = match subscription_type::delete_subscription_type(&state.database, id).await? {
        DeleteOutcome::Deleted(plan) => {
            Message::success(format!("Subscription type \"{}\" deleted.", plan.name))
        }
        DeleteOutcome::InUse {
            plan,
            subscriptions,
        } => Message::error(format!(
            "Subscription type \"{}\" is used by {subscriptions} subscription(s) \
             and cannot be deleted.",
            plan.name
        )),
    };
    Ok(Redirect::to(PLANS_URL).message(message))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]
    use super::super::testing::*;
    use crate::{
        core::{account, subscription_type},
        entities::SubscriptionType,
        errors::Result,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use sea_orm::EntityTrait;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_plan_rejects_bad_values() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        let app = app(&db);

        let (status, _, body) = post(
            &app,
            "/subscription-types/",
            admin.id,
            json!({ "name": "Huge", "lessons_count": 100, "price": 10.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["template"], "admin/subscription_types");
        assert!(body["context"]["errors"]["lessons_count"].is_array());
        assert!(SubscriptionType::find().all(&db).await?.is_empty());

        let (status, location, _) = post(
            &app,
            "/subscription-types/",
            admin.id,
            json!({ "name": "Basic", "lessons_count": 8, "price": 4000.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/subscription-types/"));
        assert_eq!(SubscriptionType::find().all(&db).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_plan_persists_submitted_values() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        let plan = create_test_plan(&db, "Basic", 8, 4000.0).await?;
        let app = app(&db);

        let uri = format!("/subscription-types/{}/edit/", plan.id);
        let (status, _, body) = get(&app, &uri, admin.id).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["context"]["form"]["lessons_count"], 8);

        let (status, location, _) = post(
            &app,
            &uri,
            admin.id,
            json!({ "name": "Extended", "lessons_count": 12, "price": 5500.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location.as_deref(), Some("/subscription-types/"));

        let stored = subscription_type::get_subscription_type(&db, plan.id).await?;
        assert_eq!(stored.name, "Extended");
        assert_eq!(stored.lessons_count, 12);
        assert_eq!(stored.price, 5500.0);

        let (status, _, _) = get(&app, "/subscription-types/999/edit/", admin.id).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_plan_in_use_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        let plan = create_test_plan(&db, "Basic", 8, 4000.0).await?;
        let spare = create_test_plan(&db, "Spare", 4, 2000.0).await?;
        create_test_child(&db, "Anna", None).await?;
        let app = app(&db);

        let uri = format!("/subscription-types/{}/delete/", plan.id);
        let (status, _, body) = post(&app, &uri, admin.id, json!({})).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(body["messages"][0]["level"], "error");

        let uri = format!("/subscription-types/{}/delete/", spare.id);
        let (_, _, body) = post(&app, &uri, admin.id, json!({})).await;
        assert_eq!(body["messages"][0]["level"], "success");

        let left = SubscriptionType::find().all(&db).await?;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, plan.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_subscriptions_listing() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = account::ensure_admin(&db, "boss", "").await?.unwrap();
        create_test_plan(&db, "Basic", 8, 4000.0).await?;
        let parent = create_test_parent(&db, "olga").await?;
        create_test_child(&db, "Boris", Some(parent.id)).await?;
        create_test_child(&db, "Anna", None).await?;
        let app = app(&db);

        let (status, _, body) = get(&app, "/subscriptions/", admin.id).await;
        assert_eq!(status, StatusCode::OK);
        let subs = body["context"]["subs"].as_array().unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0]["child"]["first_name"], "Anna");
        assert_eq!(subs[1]["parent"]["username"], "olga");
        assert_eq!(subs[1]["plan"]["name"], "Basic");
        Ok(())
    }
}
