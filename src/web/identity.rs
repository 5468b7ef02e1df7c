//! Request identity extractors.
//!
//! The upstream auth proxy puts the authenticated account id in a header
//! (`[auth] account_header`). These extractors resolve it to an [`Identity`]
//! once per request and enforce route roles.

use super::AppState;
use crate::{
    core::account::{self, Identity},
    errors::Error,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

/// Any authenticated account
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Identity);

/// An administrator
#[derive(Clone, Debug)]
pub struct AdminUser(pub Identity);

/// A parent who is not an administrator
#[derive(Clone, Debug)]
pub struct ParentUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_name = state.config.auth.account_header.to_ascii_lowercase();
        let account_id = parts
            .headers
            .get(header_name.as_str())
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or(Error::Unauthorized)?;

        let identity = account::load_identity(&state.database, account_id)
            .await?
            .ok_or_else(|| {
                debug!("Unknown account id {} in identity header", account_id);
                Error::Unauthorized
            })?;
        Ok(Self(identity))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if !identity.role.is_admin() {
            return Err(Error::Forbidden {
                reason: "This page is for administrators only.".to_string(),
            });
        }
        Ok(Self(identity))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ParentUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if !identity.role.is_parent() {
            return Err(Error::Forbidden {
                reason: "This page is for parents only.".to_string(),
            });
        }
        Ok(Self(identity))
    }
}
