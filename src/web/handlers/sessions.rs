//! Schedule pages: week and month views plus session editing.

use super::split_validation;
use crate::{
    core::{
        calendar,
        child,
        session::{self, SessionInput},
        timeslots,
    },
    errors::Result,
    web::{
        AppState, Message, Page, Redirect, View,
        forms::SessionForm,
        identity::AdminUser,
        today,
    },
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/week/", get(week))
        .route("/sessions/month/", get(month))
        .route("/sessions/create/", post(create))
        .route("/sessions/:id/add-child/:child_id/", post(add_child))
        .route("/sessions/:id/edit/", get(edit_form).post(edit))
        .route("/sessions/:id/delete/", post(delete))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WeekQuery {
    pub start: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonthQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

/// URL of the week page containing `at`.
fn week_url(at: NaiveDateTime) -> String {
    let start = calendar::week_start(at.date());
    format!("/sessions/week/?start={}", start.format("%Y-%m-%d"))
}

/// The given start date, or Monday of the current week when absent or invalid.
fn resolve_week_start(raw: Option<&str>) -> NaiveDate {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .unwrap_or_else(|| calendar::week_start(today()))
}

async fn week_view(state: &AppState, start: NaiveDate) -> Result<View> {
    let end = start + Duration::days(7);
    let sessions = session::sessions_between(&state.database, start, end).await?;
    let slots = timeslots::group_timeslots(&sessions);
    let children = child::list_children(&state.database).await?;

    View::new("admin/sessions_week")
        .with("start", &start)?
        .with("prev_start", &(start - Duration::days(7)))?
        .with("next_start", &end)?
        .with("days", &calendar::week_days(start))?
        .with("sessions", &sessions)?
        .with("slots_by_day", &slots)?
        .with("children", &children)?
        .with(
            "default_duration_minutes",
            &state.config.schedule.default_duration_minutes,
        )
}

pub async fn week(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<WeekQuery>,
) -> Result<Page> {
    let start = resolve_week_start(query.start.as_deref());
    let view = week_view(&state, start).await?;
    state.render(&user, view).await
}

pub async fn month(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Query(query): Query<MonthQuery>,
) -> Result<Page> {
    let now = today();
    let requested = match (query.year.as_deref(), query.month.as_deref()) {
        (None, None) => None,
        (year, month) => {
            let year = year.map_or(Ok(now.year()), |y| y.trim().parse::<i32>());
            #[allow(clippy::cast_possible_wrap)]
            let month = month.map_or(Ok(now.month() as i32), |m| m.trim().parse::<i32>());
            year.ok().zip(month.ok())
        }
    };
    #[allow(clippy::cast_possible_wrap)]
    let today_month = (now.year(), now.month() as i32);
    let (year, month) = requested.unwrap_or(today_month);

    let grid = match calendar::month_grid(year, month) {
        Some(grid) => grid,
        None => calendar::month_grid(today_month.0, today_month.1)
            .ok_or_else(|| crate::errors::Error::Config {
                message: "current date is outside the supported calendar".to_string(),
            })?,
    };
    let sessions = session::sessions_in_month(&state.database, grid.year_month()).await?;
    let slots = timeslots::group_timeslots(&sessions);

    let view = View::new("admin/sessions_month")
        .with("year", &grid.year)?
        .with("month", &grid.month)?
        .with("days", &grid.days)?
        .with("weeks", &grid.weeks)?
        .with("rows", &grid.aligned_rows())?
        .with("prev_year", &grid.prev.year)?
        .with("prev_month", &grid.prev.month)?
        .with("next_year", &grid.next.year)?
        .with("next_month", &grid.next.month)?
        .with("sessions", &sessions)?
        .with("slots_by_day", &slots)?;
    state.render(&user, view).await
}

fn input_start_or_today(start: Option<NaiveDateTime>) -> NaiveDateTime {
    start.unwrap_or_else(|| today().and_time(chrono::NaiveTime::MIN))
}

pub async fn create(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Json(form): Json<SessionForm>,
) -> Result<Page> {
    let fill_month = form.fill_month;
    let default_duration = state.config.schedule.default_duration_minutes;
    let attempted_start = session::parse_start(&form.start);

    let result = match form.clone().into_input(default_duration) {
        Ok(input) => session::create_session(&state.database, &input, fill_month).await,
        Err(e) => Err(e),
    };

    match split_validation(result)? {
        Ok(created) => {
            let first = created
                .first()
                .map_or(input_start_or_today(attempted_start), |s| s.start);
            let text = if created.len() > 1 {
                format!("{} sessions created.", created.len())
            } else {
                "Session created.".to_string()
            };
            Ok(Redirect::to(week_url(first))
                .message(Message::success(text))
                .into())
        }
        Err(errors) => {
            let start = calendar::week_start(input_start_or_today(attempted_start).date());
            let view = week_view(&state, start)
                .await?
                .with("form", &form)?
                .invalid(&errors)?;
            state.render(&user, view).await
        }
    }
}

pub async fn add_child(
    State(state): State<AppState>,
    AdminUser(_user): AdminUser,
    Path((id, child_id)): Path<(i64, i64)>,
) -> Result<Page> {
    let (session, child) = session::add_participant(&state.database, id, child_id).await?;
    Ok(Redirect::to(week_url(session.start))
        .message(Message::success(format!(
            "{} added to the session.",
            child.full_name()
        )))
        .into())
}

async fn edit_view(state: &AppState, id: i64) -> Result<View> {
    let entry = session::get_session(&state.database, id).await?;
    let children = child::list_children(&state.database).await?;
    View::new("admin/session_edit")
        .with("week_start", &calendar::week_start(entry.session.start.date()))?
        .with("session", &entry)?
        .with("children", &children)
}

pub async fn edit_form(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
) -> Result<Page> {
    let view = edit_view(&state, id).await?;
    state.render(&user, view).await
}

async fn try_update(state: &AppState, id: i64, form: SessionForm) -> Result<NaiveDateTime> {
    // Existence first, so a missing session is a 404 even with a bad form
    session::get_session(&state.database, id).await?;
    let input: SessionInput = form.into_input(state.config.schedule.default_duration_minutes)?;
    let updated = session::update_session(&state.database, id, &input).await?;
    Ok(updated.start)
}

pub async fn edit(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    Path(id): Path<i64>,
    Json(form): Json<SessionForm>,
) -> Result<Page> {
    match split_validation(try_update(&state, id, form.clone()).await)? {
        Ok(start) => Ok(Redirect::to(week_url(start))
            .message(Message::success("Session updated."))
            .into()),
        Err(errors) => {
            let view = edit_view(&state, id)
                .await?
                .with("form", &form)?
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
    let deleted = session::delete_session(&state.database, id).await?;
    Ok(Redirect::to(week_url(deleted.start))
        .message(Message::success("Session deleted."))
        .into())
}
