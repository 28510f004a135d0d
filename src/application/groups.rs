//! Group lookup and provisioning.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, RepoError};
use crate::domain::entities::GroupRecord;
use crate::domain::slug::{SlugAsyncError, SlugError, generate_unique_slug_async, validate_slug};

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group not found")]
    NotFound,
    #[error("group title must not be empty")]
    EmptyTitle,
    #[error("group slug `{0}` is already taken")]
    SlugTaken(String),
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<SlugAsyncError<RepoError>> for GroupError {
    fn from(err: SlugAsyncError<RepoError>) -> Self {
        match err {
            SlugAsyncError::Slug(err) => GroupError::Slug(err),
            SlugAsyncError::Predicate(err) => GroupError::Repo(err),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateGroupCommand {
    pub title: String,
    /// Explicit slug; derived from the title when absent.
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupsRepo>,
}

impl GroupService {
    pub fn new(groups: Arc<dyn GroupsRepo>) -> Self {
        Self { groups }
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<GroupRecord, GroupError> {
        self.groups
            .find_by_slug(slug)
            .await?
            .ok_or(GroupError::NotFound)
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupError> {
        Ok(self.groups.list_groups().await?)
    }

    pub async fn create_group(&self, command: CreateGroupCommand) -> Result<GroupRecord, GroupError> {
        let title = command.title.trim().to_string();
        if title.is_empty() {
            return Err(GroupError::EmptyTitle);
        }

        let slug = match command.slug {
            Some(slug) => {
                let slug = slug.trim().to_string();
                validate_slug(&slug)?;
                if self.groups.find_by_slug(&slug).await?.is_some() {
                    return Err(GroupError::SlugTaken(slug));
                }
                slug
            }
            None => {
                let groups = self.groups.clone();
                generate_unique_slug_async(&title, move |candidate| {
                    let groups = groups.clone();
                    let candidate = candidate.to_string();
                    async move {
                        let existing = groups.find_by_slug(&candidate).await?;
                        Ok::<bool, RepoError>(existing.is_none())
                    }
                })
                .await?
            }
        };

        let group = self
            .groups
            .create_group(CreateGroupParams {
                title,
                slug: slug.clone(),
                description: command.description.trim().to_string(),
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { .. } => GroupError::SlugTaken(slug),
                other => GroupError::Repo(other),
            })?;

        info!(group_id = %group.id, slug = %group.slug, "group created");
        Ok(group)
    }
}
