//! Post authoring, editing, detail and commenting.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostsRepo, RepoError,
    UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{CommentRecord, PostRecord, UserRecord};
use crate::domain::posts::{FieldErrors, INVALID_GROUP_CHOICE, PostDraft, validate_comment_text};
use crate::domain::types::{PostId, UserId};
use crate::util::clock::Clock;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("only the author may edit this post")]
    NotAuthor,
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PostError {
    fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

impl From<FieldErrors> for PostError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Everything the post page shows.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub author: UserRecord,
    pub post: PostRecord,
    pub author_posts_count: u64,
    pub comments: Vec<CommentRecord>,
}

#[derive(Clone)]
pub struct PostService {
    users: Arc<dyn UsersRepo>,
    groups: Arc<dyn GroupsRepo>,
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    clock: Arc<dyn Clock>,
}

impl PostService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        groups: Arc<dyn GroupsRepo>,
        posts: Arc<dyn PostsRepo>,
        comments: Arc<dyn CommentsRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            groups,
            posts,
            comments,
            clock,
        }
    }

    pub async fn create_post(
        &self,
        author: UserId,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        self.validate_draft(&draft).await?;

        let post = self
            .posts
            .create_post(CreatePostParams {
                author,
                text: draft.text,
                group: draft.group,
                image: draft.image,
                created_at: self.clock.now(),
            })
            .await?;

        info!(post_id = %post.id, author = %author, "post created");
        Ok(post)
    }

    /// Load a post addressed by its author's username, as the post URLs do.
    pub async fn find_for_author(
        &self,
        username: &str,
        post_id: PostId,
    ) -> Result<(UserRecord, PostRecord), PostError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| PostError::not_found("user"))?;
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .filter(|post| post.author_id == author.id)
            .ok_or_else(|| PostError::not_found("post"))?;
        Ok((author, post))
    }

    /// Replace the content of a post. Only its author may do this.
    pub async fn update_post(
        &self,
        editor: UserId,
        username: &str,
        post_id: PostId,
        draft: PostDraft,
    ) -> Result<PostRecord, PostError> {
        let (author, post) = self.find_for_author(username, post_id).await?;
        if author.id != editor {
            return Err(PostError::NotAuthor);
        }

        self.validate_draft(&draft).await?;

        let updated = self
            .posts
            .update_post(UpdatePostParams {
                id: post.id,
                text: draft.text,
                group: draft.group,
                image: draft.image,
            })
            .await?;

        info!(post_id = %updated.id, author = %editor, "post updated");
        Ok(updated)
    }

    pub async fn detail(&self, username: &str, post_id: PostId) -> Result<PostDetail, PostError> {
        let (author, post) = self.find_for_author(username, post_id).await?;
        let author_posts_count = self.posts.count_by_author(author.id).await?;
        let comments = self.comments.list_for_post(post.id).await?;

        Ok(PostDetail {
            author,
            post,
            author_posts_count,
            comments,
        })
    }

    pub async fn add_comment(
        &self,
        commenter: UserId,
        username: &str,
        post_id: PostId,
        text: String,
    ) -> Result<CommentRecord, PostError> {
        let (_, post) = self.find_for_author(username, post_id).await?;
        validate_comment_text(&text)?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post: post.id,
                author: commenter,
                text,
                created_at: self.clock.now(),
            })
            .await?;

        info!(comment_id = %comment.id, post_id = %post.id, "comment added");
        Ok(comment)
    }

    async fn validate_draft(&self, draft: &PostDraft) -> Result<(), PostError> {
        let mut errors = match draft.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => errors,
        };

        if let Some(group) = draft.group {
            if self.groups.find_by_id(group).await?.is_none() {
                errors.push("group", INVALID_GROUP_CHOICE);
            }
        }

        errors.into_result().map_err(PostError::from)
    }
}
