//! Repository traits describing persistence adapters.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::types::{GroupId, PostId, UserId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author: UserId,
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub text: String,
    pub group: Option<GroupId>,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post: PostId,
    pub author: UserId,
    pub text: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct CreateGroupParams {
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError>;

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError>;
}

/// Post queries. Every listing is ordered by `created_at` descending, then by
/// id descending.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_by_group(&self, group: GroupId) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_by_author(&self, author: UserId) -> Result<Vec<PostRecord>, RepoError>;

    async fn list_by_authors(&self, authors: &[UserId]) -> Result<Vec<PostRecord>, RepoError>;

    async fn count_by_author(&self, author: UserId) -> Result<u64, RepoError>;

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments of a post, oldest first.
    async fn list_for_post(&self, post: PostId) -> Result<Vec<CommentRecord>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the edge. Returns `false` when it already existed.
    async fn insert_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError>;

    /// Remove the edge. Returns `false` when there was nothing to remove.
    async fn delete_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError>;

    async fn exists(&self, follower: UserId, following: UserId) -> Result<bool, RepoError>;

    async fn list_following(&self, follower: UserId) -> Result<BTreeSet<UserId>, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}

/// Every repository the services need, usually all backed by one store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub follows: Arc<dyn FollowsRepo>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UsersRepo + GroupsRepo + PostsRepo + CommentsRepo + FollowsRepo + StoreHealth + 'static,
    {
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            health: store,
        }
    }
}
