//! User lookup and provisioning. Credentials live with the upstream
//! authentication proxy; this service only knows usernames.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

const MAX_USERNAME_LEN: usize = 150;

/// First path segments taken by fixed routes; a profile under one of these
/// names would be unreachable.
const RESERVED_USERNAMES: &[&str] = &["new", "follow", "group", "_health"];

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    NotFound,
    #[error("invalid username: {0}")]
    InvalidUsername(&'static str),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UsersRepo>,
}

impl UserService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<UserRecord, UserError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn create_user(&self, username: &str) -> Result<UserRecord, UserError> {
        let username = username.trim();
        validate_username(username)?;

        let user = self
            .users
            .create_user(username)
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => UserError::UsernameTaken(username.to_string()),
                other => UserError::Repo(other),
            })?;

        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }
}

/// Letters, digits and `@ . + - _`, at most 150 characters.
pub fn validate_username(username: &str) -> Result<(), UserError> {
    if username.is_empty() {
        return Err(UserError::InvalidUsername("username must not be empty"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(UserError::InvalidUsername("username is too long"));
    }
    if RESERVED_USERNAMES.contains(&username) {
        return Err(UserError::InvalidUsername("username is reserved"));
    }
    let allowed = username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'));
    if !allowed {
        return Err(UserError::InvalidUsername(
            "only letters, digits and @/./+/-/_ are allowed",
        ));
    }
    Ok(())
}
