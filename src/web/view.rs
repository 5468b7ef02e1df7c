//! The presentation boundary.
//!
//! Handlers never render HTML. They return a [`View`] (a template name plus a
//! JSON context) or a [`Redirect`] carrying flash messages. Both serialise to
//! JSON for whatever renders them downstream.

use crate::{
    core::{birthdays::UpcomingBirthday, roles::RoleFlags},
    errors::{Error, FieldErrors, Result},
};
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::error;

/// Flash message severity
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A one-off notice shown on the next page
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

impl Message {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }
}

/// A named template with its context
#[derive(Clone, Debug, Serialize)]
pub struct View {
    #[serde(skip)]
    status: StatusCode,
    pub template: &'static str,
    pub context: Map<String, Value>,
    pub messages: Vec<Message>,
    #[serde(flatten)]
    pub roles: RoleFlags,
    pub upcoming_birthdays: Vec<UpcomingBirthday>,
}

impl View {
    #[must_use]
    pub fn new(template: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            template,
            context: Map::new(),
            messages: Vec::new(),
            roles: RoleFlags::default(),
            upcoming_birthdays: Vec::new(),
        }
    }

    /// Adds one context entry.
    pub fn with<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self> {
        self.context
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Marks the view as a failed form submission.
    pub fn invalid(self, errors: &FieldErrors) -> Result<Self> {
        let mut view = self.with("errors", errors)?;
        view.status = StatusCode::UNPROCESSABLE_ENTITY;
        Ok(view)
    }

    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// A 303 redirect with flash messages
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Redirect {
    pub location: String,
    pub messages: Vec<Message>,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.location.clone())],
            Json(self),
        )
            .into_response()
    }
}

/// What a handler produces
#[derive(Debug)]
pub enum Page {
    View(View),
    Redirect(Redirect),
}

impl From<View> for Page {
    fn from(view: View) -> Self {
        Self::View(view)
    }
}

impl From<Redirect> for Page {
    fn from(redirect: Redirect) -> Self {
        Self::Redirect(redirect)
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        match self {
            Self::View(view) => view.into_response(),
            Self::Redirect(redirect) => redirect.into_response(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            Self::Validation(errors) => json!({ "error": self.to_string(), "errors": errors }),
            _ if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", self);
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
