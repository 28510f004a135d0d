//! Directed follower → author graph.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError};
use crate::domain::types::UserId;

/// What a `follow` call actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Users cannot follow themselves; the request is dropped.
    SelfFollowIgnored,
}

#[derive(Clone)]
pub struct FollowService {
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowsRepo>) -> Self {
        Self { follows }
    }

    /// Add the edge `follower → author`. Repeating the call is harmless, and a
    /// uniqueness violation from a concurrent duplicate insert counts as
    /// success.
    pub async fn follow(
        &self,
        follower: UserId,
        author: UserId,
    ) -> Result<FollowOutcome, RepoError> {
        if follower == author {
            debug!(follower = %follower, "ignoring self-follow");
            return Ok(FollowOutcome::SelfFollowIgnored);
        }

        match self.follows.insert_follow(follower, author).await {
            Ok(true) => {
                info!(follower = %follower, author = %author, "follow edge created");
                Ok(FollowOutcome::Created)
            }
            Ok(false) => Ok(FollowOutcome::AlreadyFollowing),
            Err(RepoError::Duplicate { constraint }) => {
                debug!(
                    follower = %follower,
                    author = %author,
                    constraint = %constraint,
                    "duplicate follow absorbed"
                );
                Ok(FollowOutcome::AlreadyFollowing)
            }
            Err(err) => Err(err),
        }
    }

    /// Remove the edge if present. Returns whether anything was removed.
    pub async fn unfollow(&self, follower: UserId, author: UserId) -> Result<bool, RepoError> {
        let removed = self.follows.delete_follow(follower, author).await?;
        if removed {
            info!(follower = %follower, author = %author, "follow edge removed");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower: UserId, author: UserId) -> Result<bool, RepoError> {
        self.follows.exists(follower, author).await
    }

    pub async fn followed_authors_of(
        &self,
        follower: UserId,
    ) -> Result<BTreeSet<UserId>, RepoError> {
        self.follows.list_following(follower).await
    }
}
