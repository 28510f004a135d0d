use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::application::follow::FollowService;
use crate::application::pagination::{Page, PageNumber, Paginator};
use crate::application::repos::{GroupsRepo, PostsRepo, RepoError};
use crate::cache::PageCache;
use crate::domain::entities::PostRecord;
use crate::domain::types::{GroupId, UserId};

/// A computed feed, shared between the cache and its readers.
pub type FeedPosts = Arc<[PostRecord]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every post; served through the index cache.
    All,
    ByGroup(GroupId),
    ByAuthor(UserId),
    /// Posts of every author the given user follows.
    ByFollowedAuthors(UserId),
}

impl FeedScope {
    fn label(&self) -> &'static str {
        match self {
            FeedScope::All => "all",
            FeedScope::ByGroup(_) => "group",
            FeedScope::ByAuthor(_) => "author",
            FeedScope::ByFollowedAuthors(_) => "followed",
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    follows: FollowService,
    index_cache: Arc<PageCache<FeedPosts>>,
    index_ttl: Duration,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        follows: FollowService,
        index_cache: Arc<PageCache<FeedPosts>>,
        index_ttl: Duration,
        paginator: Paginator,
    ) -> Self {
        Self {
            posts,
            groups,
            follows,
            index_cache,
            index_ttl,
            paginator,
        }
    }

    /// Posts for `scope`, newest first.
    pub async fn get_feed(&self, scope: FeedScope) -> Result<FeedPosts, FeedError> {
        let posts = match scope {
            FeedScope::All => return self.index_feed().await,
            FeedScope::ByGroup(group) => {
                if self.groups.find_by_id(group).await?.is_none() {
                    return Err(FeedError::UnknownGroup);
                }
                self.posts.list_by_group(group).await?
            }
            FeedScope::ByAuthor(author) => self.posts.list_by_author(author).await?,
            FeedScope::ByFollowedAuthors(follower) => {
                let authors = self.follows.followed_authors_of(follower).await?;
                if authors.is_empty() {
                    return Ok(FeedPosts::from(Vec::new()));
                }
                let authors: Vec<UserId> = authors.into_iter().collect();
                self.posts.list_by_authors(&authors).await?
            }
        };

        debug!(scope = scope.label(), count = posts.len(), "feed computed");
        Ok(FeedPosts::from(posts))
    }

    /// Fetch the feed for `scope` and cut out the requested page.
    pub async fn page(
        &self,
        scope: FeedScope,
        requested: PageNumber,
    ) -> Result<Page<PostRecord>, FeedError> {
        let posts = self.get_feed(scope).await?;
        Ok(self.paginator.paginate(&posts, requested))
    }

    pub fn paginator(&self) -> Paginator {
        self.paginator
    }

    async fn index_feed(&self) -> Result<FeedPosts, FeedError> {
        if let Some(cached) = self.index_cache.get() {
            debug!(scope = "all", count = cached.len(), "feed served from cache");
            return Ok(cached);
        }

        let posts = FeedPosts::from(self.posts.list_all().await?);
        self.index_cache.set(posts.clone(), self.index_ttl);
        debug!(scope = "all", count = posts.len(), "feed computed");
        Ok(posts)
    }
}
