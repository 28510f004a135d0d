//! Identity supplied by the upstream authentication proxy.
//!
//! The proxy puts the authenticated username in a configured header. A header
//! naming an unknown user counts as anonymous.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::{
    application::{error::AppError, users::UserError},
    domain::entities::UserRecord,
    presentation::views::{LayoutChrome, login_href},
};

use super::public::HttpState;

/// Whoever is looking, signed in or not.
pub struct Viewer {
    pub user: Option<UserRecord>,
    pub path: String,
}

impl Viewer {
    pub fn chrome(&self, state: &HttpState) -> LayoutChrome {
        chrome_for(self.user.as_ref(), &self.path, state)
    }
}

/// A signed-in user. Anonymous requests are redirected to the login page.
pub struct CurrentUser {
    pub user: UserRecord,
    pub path: String,
}

impl CurrentUser {
    pub fn chrome(&self, state: &HttpState) -> LayoutChrome {
        chrome_for(Some(&self.user), &self.path, state)
    }
}

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let path = request_path(parts);
        let user = resolve_user(parts, state).await?;
        Ok(Self { user, path })
    }
}

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let path = request_path(parts);
        match resolve_user(parts, state).await? {
            Some(user) => Ok(Self { user, path }),
            None => {
                let target = login_href(&state.auth.login_url, &path);
                Err(Redirect::to(&target).into_response())
            }
        }
    }
}

async fn resolve_user(parts: &Parts, state: &HttpState) -> Result<Option<UserRecord>, Response> {
    let Some(value) = parts.headers.get(&state.auth.user_header) else {
        return Ok(None);
    };
    let Ok(username) = value.to_str() else {
        debug!("ignoring non-ASCII identity header");
        return Ok(None);
    };
    let username = username.trim();
    if username.is_empty() {
        return Ok(None);
    }

    match state.users.find_by_username(username).await {
        Ok(user) => Ok(Some(user)),
        Err(UserError::NotFound) => {
            debug!(username, "identity header names an unknown user");
            Ok(None)
        }
        Err(err) => Err(AppError::from(err).into_response()),
    }
}

fn request_path(parts: &Parts) -> String {
    parts
        .uri
        .path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string())
}

fn chrome_for(user: Option<&UserRecord>, path: &str, state: &HttpState) -> LayoutChrome {
    LayoutChrome::new(user.map(|user| user.username.clone()), path)
        .with_login_url(&state.auth.login_url)
}
