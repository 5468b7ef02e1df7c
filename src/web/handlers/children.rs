//! Student administration, subscription issuing and the visit/payment actions.

use super::split_validation;
use crate::{
    core::{
        account, child,
        subscription::{self, PaymentOutcome, PlanChoice, VisitOutcome},
        subscription_type,
    },
    entities::{Account, AccountModel, ChildModel},
    errors::{Error, FieldErrors, Result},
    web::{
        AppState, Message, Page, Redirect, View,
        forms::{ChildAction, IssueForm, StudentForm},
        identity::AdminUser,
    },
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use sea_orm::EntityTrait;

const CHILDREN_URL: &str = "/children/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/children/", get(list))
        .route("/children/create/", get(create_form).post(create))
        .route("/children/:id/", get(detail))
        .route("/children/:id/edit/", get(edit_form).post(edit))
        .route("/children/:id/delete/", post(delete))
        .route(
            "/children/:id/issue-subscription/",
            get(issue_form).post(issue),
        )
        .route(
            "/children/:id/subscription/edit/",
            get(subscription_edit_form).post(subscription_edit),
        )
        .route("/visit/add/", post(add_visit))
        .route("/payment/mark/", post(mark_payment))
}

pub async fn list(State(state): State<AppState>, AdminUser(user): AdminUser) -> Result<Page> {
    let children = child::list_children_with_accounts(&state.database).await?;
    let ids: Vec<i64> = children.iter().map(|row| row.child.id).collect();
    let subs = subscription::subscriptions_by_child(&state.database, &ids).await?;

    let view = View::new("admin/children_list")
        .with("children", &children)?
        .with("subs", &subs)?;
    state.render(&user, view).await
}

async fn student_form_view(
    state: &AppState,
    template: &'static str,
    form: &StudentForm,
) -> Result<View> {
    let parents = account::list_parents(&state.database).await?;
    View::new(template)
        .with("parents", &parents)?
        .with("form", form)
}

pub async fn create_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> Result<Page> {
    let form = StudentForm {
        student_type: "child".to_string(),
        ..Default::default()
    };
    let view = student_form_view(&state, "admin/child_create", &form).await?;
    state.render(&user, view).await
}

async fn try_create(state: &AppState, form: StudentForm) -> Result<()> {
    let input = form.into_input()?;
    child::create_student(&state.database, &input).await?;
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(form): Json<StudentForm>,
) -> Result<Page> {
    match split_validation(try_create(&state, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(CHILDREN_URL)
            .message(Message::success("Student created."))
            .into()),
        Err(errors) => {
            let view = student_form_view(&state, "admin/child_create", &form)
                .await?
                .invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn detail(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let detail = child::child_detail(&state.database, id).await?;
    let view = View::new("admin/child_detail")
        .with("child", &detail.child)?
        .with("parent", &detail.parent)?
        .with("account", &detail.account)?
        .with("sub", &detail.subscription)?
        .with("sessions", &detail.sessions)?;
    state.render(&user, view).await
}

/// The edit form pre-filled from a stored student.
fn initial_form(student: &ChildModel, login: Option<&AccountModel>) -> StudentForm {
    StudentForm {
        student_type: if student.is_adult { "adult" } else { "child" }.to_string(),
        parent: student.parent_id,
        first_name: student.first_name.clone(),
        last_name: student.last_name.clone(),
        birth_date: student.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
        gender: serde_json::to_value(student.gender)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string)),
        notes: student.notes.clone(),
        account_username: login.map(|a| a.username.clone()).unwrap_or_default(),
        account_email: login.map(|a| a.email.clone()).unwrap_or_default(),
    }
}

async fn edit_view(state: &AppState, id: i64, form: Option<&StudentForm>) -> Result<View> {
    let student = child::get_child(&state.database, id).await?;
    let form = match form {
        Some(submitted) => submitted.clone(),
        None => {
            let login = match student.account_id {
                Some(aid) => Account::find_by_id(aid).one(&*state.database).await?,
                None => None,
            };
            initial_form(&student, login.as_ref())
        }
    };
    student_form_view(state, "admin/child_edit", &form)
        .await?
        .with("child", &student)
}

pub async fn edit_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let view = edit_view(&state, id, None).await?;
    state.render(&user, view).await
}

async fn try_edit(state: &AppState, id: i64, form: StudentForm) -> Result<()> {
    child::get_child(&state.database, id).await?;
    let input = form.into_input()?;
    child::update_student(&state.database, id, &input).await?;
    Ok(())
}

pub async fn edit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<StudentForm>,
) -> Result<Page> {
    match split_validation(try_edit(&state, id, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(CHILDREN_URL)
            .message(Message::success("Student details updated."))
            .into()),
        Err(errors) => {
            let view = edit_view(&state, id, Some(&form))
                .await?
                .invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn delete(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let deleted = child::delete_child(&state.database, id).await?;
    Ok(Redirect::to(CHILDREN_URL)
        .message(Message::success(format!(
            "Student \"{}\" deleted.",
            deleted.full_name()
        )))
        .into())
}

/// A missing plan is a bad choice in the form, not a missing page.
fn plan_choice_errors(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::SubscriptionTypeNotFound { .. }) => {
            Err(FieldErrors::single("sub_type", "Select a valid choice.").into())
        }
        other => other,
    }
}

async fn issue_view(state: &AppState, id: i64, form: &IssueForm) -> Result<View> {
    let student = child::get_child(&state.database, id).await?;
    let types = subscription_type::list_subscription_types(&state.database).await?;
    View::new("admin/issue_subscription")
        .with("child", &student)?
        .with("types", &types)?
        .with("form", form)
}

pub async fn issue_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let view = issue_view(&state, id, &IssueForm::default()).await?;
    state.render(&user, view).await
}

async fn try_issue(state: &AppState, id: i64, form: IssueForm) -> Result<()> {
    child::get_child(&state.database, id).await?;
    let choice: PlanChoice = form.into_choice()?;
    let result = subscription::issue_subscription(&state.database, id, &choice)
        .await
        .map(|_| ());
    plan_choice_errors(result)
}

pub async fn issue(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<IssueForm>,
) -> Result<Page> {
    match split_validation(try_issue(&state, id, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(CHILDREN_URL)
            .message(Message::success("Subscription issued."))
            .into()),
        Err(errors) => {
            let view = issue_view(&state, id, &form).await?.invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

async fn subscription_edit_view(
    state: &AppState,
    id: i64,
    form: Option<&IssueForm>,
) -> Result<View> {
    let student = child::get_child(&state.database, id).await?;
    let sub = subscription::get_subscription_view(&*state.database, id)
        .await?
        .ok_or(Error::SubscriptionNotFound { child_id: id })?;
    let types = subscription_type::list_subscription_types(&state.database).await?;
    let form = form.cloned().unwrap_or(IssueForm {
        sub_type: Some(sub.plan.id),
        price: Some(sub.subscription.price),
        mark_paid: false,
    });

    View::new("admin/subscription_edit")
        .with("child", &student)?
        .with("sub", &sub)?
        .with("types", &types)?
        .with("form", &form)
}

pub async fn subscription_edit_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let view = subscription_edit_view(&state, id, None).await?;
    state.render(&user, view).await
}

async fn try_change_plan(state: &AppState, id: i64, form: IssueForm) -> Result<()> {
    child::get_child(&state.database, id).await?;
    subscription::get_subscription_for_child(&*state.database, id)
        .await?
        .ok_or(Error::SubscriptionNotFound { child_id: id })?;
    let choice = form.into_choice()?;
    let result = subscription::change_subscription_plan(&state.database, id, &choice)
        .await
        .map(|_| ());
    plan_choice_errors(result)
}

pub async fn subscription_edit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<IssueForm>,
) -> Result<Page> {
    match split_validation(try_change_plan(&state, id, form.clone()).await)? {
        Ok(()) => Ok(Redirect::to(CHILDREN_URL)
            .message(Message::success("Subscription updated."))
            .into()),
        Err(errors) => {
            let view = subscription_edit_view(&state, id, Some(&form))
                .await?
                .invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn add_visit(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(action): Json<ChildAction>,
) -> Result<Redirect> {
    let Some(child_id) = action.child_id else {
        return Ok(Redirect::to(CHILDREN_URL).message(Message::error("Select a student.")));
    };
    let student = child::get_child(&state.database, child_id).await?;

    let message = match subscription::add_visit(&state.database, child_id).await? {
        VisitOutcome::Recorded { remaining } => Message::success(format!(
            "Visit recorded for {}. Lessons left: {remaining}.",
            student.full_name()
        )),
        VisitOutcome::NoVisitAvailable => Message::error(
            "Cannot record a visit: no subscription or no lessons left.",
        ),
    };
    Ok(Redirect::to(CHILDREN_URL).message(message))
}

pub async fn mark_payment(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Json(action): Json<ChildAction>,
) -> Result<Redirect> {
    let Some(child_id) = action.child_id else {
        return Ok(Redirect::to(CHILDREN_URL).message(Message::error("Select a student.")));
    };
    let student = child::get_child(&state.database, child_id).await?;

    let message = match subscription::mark_payment(&state.database, child_id).await? {
        PaymentOutcome::Reset { remaining } => Message::success(format!(
            "Payment recorded for {}. Lessons available: {remaining}.",
            student.full_name()
        )),
        PaymentOutcome::NoSubscription => Message::error("Subscription not found."),
    };
    Ok(Redirect::to(CHILDREN_URL).message(message))
}
