//! Route handlers, one module per area.
//!
//! Each handler resolves the caller through an identity extractor, performs
//! one service call and returns a [`Page`](super::Page).

pub mod children;
pub mod family;
pub mod home;
pub mod parents;
pub mod sessions;
pub mod subscriptions;

use super::AppState;
use crate::errors::{Error, FieldErrors, Result};
use axum::Router;

/// Every route of the service.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(home::router())
        .merge(sessions::router())
        .merge(children::router())
        .merge(subscriptions::router())
        .merge(parents::router())
        .merge(family::router())
}

/// Separates form validation failures, which re-render the form, from
/// errors that end the request.
pub(crate) fn split_validation<T>(
    result: Result<T>,
) -> Result<std::result::Result<T, FieldErrors>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(Error::Validation(errors)) => Ok(Err(errors)),
        Err(e) => Err(e),
    }
}
