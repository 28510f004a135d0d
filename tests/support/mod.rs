//! In-memory repositories shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use yatube::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, FollowsRepo,
    GroupsRepo, PostsRepo, RepoError, Repositories, StoreHealth, UpdatePostParams, UsersRepo,
};
use yatube::config::{AuthSettings, FeedSettings};
use yatube::domain::entities::{CommentRecord, GroupRecord, PostGroup, PostRecord, UserRecord};
use yatube::domain::posts::newest_first;
use yatube::domain::types::{CommentId, GroupId, PostId, UserId};
use yatube::infra::http::HttpState;
use yatube::util::clock::ManualClock;

pub const EPOCH: OffsetDateTime = datetime!(2026-01-01 12:00 UTC);

#[derive(Clone)]
struct StoredPost {
    id: PostId,
    text: String,
    created_at: OffsetDateTime,
    author: UserId,
    group: Option<GroupId>,
    image: Option<String>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<StoredPost>,
    comments: Vec<CommentRecord>,
    follows: BTreeSet<(UserId, UserId)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn materialize(&self, post: &StoredPost) -> PostRecord {
        let author_username = self
            .users
            .iter()
            .find(|user| user.id == post.author)
            .map(|user| user.username.clone())
            .unwrap_or_default();
        let group = post.group.and_then(|id| {
            self.groups.iter().find(|group| group.id == id).map(|group| PostGroup {
                id: group.id,
                slug: group.slug.clone(),
                title: group.title.clone(),
            })
        });

        PostRecord {
            id: post.id,
            text: post.text.clone(),
            created_at: post.created_at,
            author_id: post.author,
            author_username,
            group,
            image: post.image.clone(),
        }
    }

    fn listing(&self, keep: impl Fn(&StoredPost) -> bool) -> Vec<PostRecord> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .iter()
            .filter(|post| keep(post))
            .map(|post| self.materialize(post))
            .collect();
        posts.sort_by(newest_first);
        posts
    }
}

/// Store double with call counters for the queries the feed cares about.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub list_all_calls: AtomicUsize,
    pub list_by_authors_calls: AtomicUsize,
    /// Make the next follow insert report a uniqueness violation after
    /// storing the edge, as a losing concurrent insert would.
    pub race_next_follow: AtomicBool,
    pub unhealthy: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory store lock")
    }

    pub fn seed_user(&self, username: &str) -> UserRecord {
        let mut state = self.state();
        let user = UserRecord {
            id: UserId(state.next_id()),
            username: username.to_string(),
            created_at: EPOCH,
        };
        state.users.push(user.clone());
        user
    }

    pub fn seed_group(&self, title: &str, slug: &str) -> GroupRecord {
        let mut state = self.state();
        let group = GroupRecord {
            id: GroupId(state.next_id()),
            title: title.to_string(),
            slug: slug.to_string(),
            description: format!("About {title}"),
        };
        state.groups.push(group.clone());
        group
    }

    pub fn seed_post(
        &self,
        author: &UserRecord,
        text: &str,
        group: Option<&GroupRecord>,
        created_at: OffsetDateTime,
    ) -> PostRecord {
        let mut state = self.state();
        let post = StoredPost {
            id: PostId(state.next_id()),
            text: text.to_string(),
            created_at,
            author: author.id,
            group: group.map(|group| group.id),
            image: None,
        };
        state.posts.push(post.clone());
        state.materialize(&post)
    }

    pub fn remove_post(&self, id: PostId) {
        self.state().posts.retain(|post| post.id != id);
    }

    pub fn has_follow(&self, follower: UserId, following: UserId) -> bool {
        self.state().follows.contains(&(follower, following))
    }

    pub fn follow_count(&self) -> usize {
        self.state().follows.len()
    }

    pub fn post_count(&self) -> usize {
        self.state().posts.len()
    }

    pub fn post_text(&self, id: PostId) -> Option<String> {
        self.state()
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| post.text.clone())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories::from_store(self.clone())
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.state().users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, username: &str) -> Result<UserRecord, RepoError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        Ok(self.seed_user(username))
    }
}

#[async_trait]
impl GroupsRepo for MemoryStore {
    async fn find_by_id(&self, id: GroupId) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.state().groups.iter().find(|group| group.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .state()
            .groups
            .iter()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        Ok(self.state().groups.clone())
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let mut state = self.state();
        if state.groups.iter().any(|group| group.slug == params.slug) {
            return Err(RepoError::Duplicate {
                constraint: "post_groups_slug_key".to_string(),
            });
        }
        let group = GroupRecord {
            id: GroupId(state.next_id()),
            title: params.title,
            slug: params.slug,
            description: params.description,
        };
        state.groups.push(group.clone());
        Ok(group)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.list_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().listing(|_| true))
    }

    async fn list_by_group(&self, group: GroupId) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.state().listing(|post| post.group == Some(group)))
    }

    async fn list_by_author(&self, author: UserId) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self.state().listing(|post| post.author == author))
    }

    async fn list_by_authors(&self, authors: &[UserId]) -> Result<Vec<PostRecord>, RepoError> {
        self.list_by_authors_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.state().listing(|post| authors.contains(&post.author)))
    }

    async fn count_by_author(&self, author: UserId) -> Result<u64, RepoError> {
        Ok(self
            .state()
            .posts
            .iter()
            .filter(|post| post.author == author)
            .count() as u64)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let state = self.state();
        Ok(state
            .posts
            .iter()
            .find(|post| post.id == id)
            .map(|post| state.materialize(post)))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state();
        let post = StoredPost {
            id: PostId(state.next_id()),
            text: params.text,
            created_at: params.created_at,
            author: params.author,
            group: params.group,
            image: params.image,
        };
        state.posts.push(post.clone());
        Ok(state.materialize(&post))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state();
        let post = state
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group = params.group;
        post.image = params.image;
        let post = post.clone();
        Ok(state.materialize(&post))
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let mut state = self.state();
        let before = state.posts.len();
        state.posts.retain(|post| post.id != id);
        if state.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn list_for_post(&self, post: PostId) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .state()
            .comments
            .iter()
            .filter(|comment| comment.post_id == post)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = self.state();
        let author_username = state
            .users
            .iter()
            .find(|user| user.id == params.author)
            .map(|user| user.username.clone())
            .ok_or_else(|| RepoError::InvalidInput {
                message: "unknown comment author".to_string(),
            })?;
        let comment = CommentRecord {
            id: CommentId(state.next_id()),
            post_id: params.post,
            author_id: params.author,
            author_username,
            text: params.text,
            created_at: params.created_at,
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}

#[async_trait]
impl FollowsRepo for MemoryStore {
    async fn insert_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        let inserted = self.state().follows.insert((follower, following));
        if self.race_next_follow.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Duplicate {
                constraint: "follows_unique_pair".to_string(),
            });
        }
        Ok(inserted)
    }

    async fn delete_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        Ok(self.state().follows.remove(&(follower, following)))
    }

    async fn exists(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        Ok(self.state().follows.contains(&(follower, following)))
    }

    async fn list_following(&self, follower: UserId) -> Result<BTreeSet<UserId>, RepoError> {
        Ok(self
            .state()
            .follows
            .iter()
            .filter(|(from, _)| *from == follower)
            .map(|(_, to)| *to)
            .collect())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<(), RepoError> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("store offline".to_string()));
        }
        Ok(())
    }
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(EPOCH))
}

/// Application state over `store` with default feed and auth settings.
pub fn http_state(store: &Arc<MemoryStore>, clock: Arc<ManualClock>) -> HttpState {
    HttpState::new(
        &store.repositories(),
        &FeedSettings::default(),
        AuthSettings::default(),
        clock,
    )
}
