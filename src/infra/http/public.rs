use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::{debug, info};

use crate::{
    application::{
        error::{AppError, ErrorReport},
        feed::{FeedScope, FeedService},
        follow::{FollowOutcome, FollowService},
        groups::GroupService,
        pagination::Paginator,
        posts::{PostError, PostService},
        repos::{Repositories, StoreHealth},
        users::UserService,
    },
    cache::{INDEX_CACHE_KEY, PageCache},
    config::{AuthSettings, FeedSettings},
    domain::{entities::GroupRecord, posts::FieldErrors, types::PostId},
    presentation::views::{
        CommentView, FeedPageView, FeedTemplate, LayoutChrome, LayoutContext, PageNav, PostCard,
        PostDetailView, PostFormTemplate, PostFormView, PostTemplate, ProfileTemplate,
        ProfileView, render_error_response, render_not_found_response, render_template_response,
    },
    util::clock::Clock,
};

use super::{
    auth::{CurrentUser, Viewer},
    db_health_response,
    forms::{CommentForm, PageQuery, PostForm},
    middleware::{log_responses, set_request_context},
};

const SOURCE: &str = "infra::http::public";

#[derive(Clone)]
pub struct HttpState {
    pub feed: FeedService,
    pub posts: PostService,
    pub follows: FollowService,
    pub users: UserService,
    pub groups: GroupService,
    pub health: Arc<dyn StoreHealth>,
    pub auth: Arc<AuthSettings>,
}

impl HttpState {
    /// Wire the services over `repos`. The index cache starts empty.
    pub fn new(
        repos: &Repositories,
        feed: &FeedSettings,
        auth: AuthSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let follows = FollowService::new(repos.follows.clone());
        let index_cache = Arc::new(PageCache::new(INDEX_CACHE_KEY, clock.clone()));
        let feed_service = FeedService::new(
            repos.posts.clone(),
            repos.groups.clone(),
            follows.clone(),
            index_cache,
            feed.index_cache_ttl,
            Paginator::new(feed.page_size),
        );
        let posts = PostService::new(
            repos.users.clone(),
            repos.groups.clone(),
            repos.posts.clone(),
            repos.comments.clone(),
            clock,
        );

        Self {
            feed: feed_service,
            posts,
            follows,
            users: UserService::new(repos.users.clone()),
            groups: GroupService::new(repos.groups.clone()),
            health: repos.health.clone(),
            auth: Arc::new(auth),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/new", get(new_post_form).post(create_post))
        .route("/follow", get(follow_index))
        .route("/group/{slug}", get(group_posts))
        .route("/_health/db", get(public_health))
        .route("/{username}", get(profile))
        .route("/{username}/follow", post(profile_follow))
        .route("/{username}/unfollow", post(profile_unfollow))
        .route("/{username}/{post_id}", get(post_view))
        .route(
            "/{username}/{post_id}/edit",
            get(post_edit_form).post(post_edit),
        )
        .route("/{username}/{post_id}/comment", post(add_comment))
        .fallback(fallback)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome(&state);
    match state.feed.page(FeedScope::All, query.page_number()).await {
        Ok(page) => {
            let view = LayoutContext::new(chrome, FeedPageView::new("Latest posts", &page));
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome(&state);
    let group = match state.groups.find_by_slug(&slug).await {
        Ok(group) => group,
        Err(err) => return error_page(err.into(), chrome),
    };

    match state
        .feed
        .page(FeedScope::ByGroup(group.id), query.page_number())
        .await
    {
        Ok(page) => {
            let content = FeedPageView::new(group.title, &page).with_description(group.description);
            let view = LayoutContext::new(chrome, content);
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    current: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = current.chrome(&state);
    match state
        .feed
        .page(
            FeedScope::ByFollowedAuthors(current.user.id),
            query.page_number(),
        )
        .await
    {
        Ok(page) => {
            let view = LayoutContext::new(chrome, FeedPageView::new("Following", &page));
            render_template_response(FeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let chrome = viewer.chrome(&state);
    let author = match state.users.find_by_username(&username).await {
        Ok(author) => author,
        Err(err) => return error_page(err.into(), chrome),
    };

    let page = match state
        .feed
        .page(FeedScope::ByAuthor(author.id), query.page_number())
        .await
    {
        Ok(page) => page,
        Err(err) => return error_page(err.into(), chrome),
    };

    let viewer_id = viewer.user.as_ref().map(|user| user.id);
    let following = match viewer_id {
        Some(id) if id != author.id => match state.follows.is_following(id, author.id).await {
            Ok(following) => following,
            Err(err) => return error_page(err.into(), chrome),
        },
        _ => false,
    };

    let content = ProfileView {
        author: author.username,
        posts_count: page.total_items(),
        following,
        can_follow: viewer_id.is_some_and(|id| id != author.id),
        posts: page.items().iter().map(PostCard::from).collect(),
        nav: PageNav::from_page(&page),
    };
    let view = LayoutContext::new(chrome, content);
    render_template_response(ProfileTemplate { view }, StatusCode::OK)
}

async fn post_view(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let chrome = viewer.chrome(&state);
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };

    render_post_detail(&state, chrome, &username, post_id, None).await
}

async fn new_post_form(State(state): State<HttpState>, current: CurrentUser) -> Response {
    let chrome = current.chrome(&state);
    match state.groups.list().await {
        Ok(groups) => {
            let form = PostFormView::new("/new", false, &groups, None);
            render_post_form(chrome, form, StatusCode::OK)
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn create_post(
    State(state): State<HttpState>,
    current: CurrentUser,
    Form(form): Form<PostForm>,
) -> Response {
    let chrome = current.chrome(&state);
    let submitted = form.clone();

    let result = match form.into_draft() {
        Ok(draft) => state.posts.create_post(current.user.id, draft).await,
        Err(errors) => Err(PostError::Validation(errors)),
    };

    match result {
        Ok(_) => Redirect::to("/").into_response(),
        Err(PostError::Validation(errors)) => {
            rerender_post_form(&state, chrome, "/new", false, submitted, &errors).await
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn post_edit_form(
    State(state): State<HttpState>,
    current: CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
) -> Response {
    let chrome = current.chrome(&state);
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };

    let (author, post) = match state.posts.find_for_author(&username, post_id).await {
        Ok(found) => found,
        Err(err) => return error_page(err.into(), chrome),
    };
    if author.id != current.user.id {
        return Redirect::to(&post_href(&username, post_id)).into_response();
    }

    let groups = match state.groups.list().await {
        Ok(groups) => groups,
        Err(err) => return error_page(err.into(), chrome),
    };

    let form = PostFormView::new(
        format!("{}/edit", post_href(&username, post_id)),
        true,
        &groups,
        post.group_id().map(|id| id.get()),
    )
    .with_values(post.text, post.image.unwrap_or_default());
    render_post_form(chrome, form, StatusCode::OK)
}

async fn post_edit(
    State(state): State<HttpState>,
    current: CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<PostForm>,
) -> Response {
    let chrome = current.chrome(&state);
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };
    let href = post_href(&username, post_id);
    let submitted = form.clone();

    let result = match form.into_draft() {
        Ok(draft) => {
            state
                .posts
                .update_post(current.user.id, &username, post_id, draft)
                .await
        }
        Err(errors) => Err(PostError::Validation(errors)),
    };

    match result {
        Ok(_) => Redirect::to(&href).into_response(),
        Err(PostError::NotAuthor) => {
            debug!(post_id = %post_id, editor = %current.user.id, "edit by non-author refused");
            Redirect::to(&href).into_response()
        }
        Err(PostError::Validation(errors)) => {
            let action = format!("{href}/edit");
            rerender_post_form(&state, chrome, &action, true, submitted, &errors).await
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    current: CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    Form(form): Form<CommentForm>,
) -> Response {
    let chrome = current.chrome(&state);
    let Some(post_id) = parse_post_id(&post_id) else {
        return render_not_found_response(chrome);
    };

    match state
        .posts
        .add_comment(current.user.id, &username, post_id, form.text.clone())
        .await
    {
        Ok(_) => Redirect::to(&post_href(&username, post_id)).into_response(),
        Err(PostError::Validation(errors)) => {
            let rejected = RejectedComment {
                text: form.text,
                error: errors.for_field("text").map(str::to_string),
            };
            render_post_detail(&state, chrome, &username, post_id, Some(rejected)).await
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Response {
    let chrome = current.chrome(&state);
    let author = match state.users.find_by_username(&username).await {
        Ok(author) => author,
        Err(err) => return error_page(err.into(), chrome),
    };

    match state.follows.follow(current.user.id, author.id).await {
        Ok(outcome) => {
            if outcome == FollowOutcome::SelfFollowIgnored {
                info!(user = %current.user.username, "self-follow request ignored");
            }
            Redirect::to(&format!("/{username}")).into_response()
        }
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    current: CurrentUser,
    Path(username): Path<String>,
) -> Response {
    let chrome = current.chrome(&state);
    let author = match state.users.find_by_username(&username).await {
        Ok(author) => author,
        Err(err) => return error_page(err.into(), chrome),
    };

    match state.follows.unfollow(current.user.id, author.id).await {
        Ok(_) => Redirect::to(&format!("/{username}")).into_response(),
        Err(err) => error_page(err.into(), chrome),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.health.ping().await)
}

async fn fallback(State(state): State<HttpState>, viewer: Viewer) -> Response {
    render_not_found_response(viewer.chrome(&state))
}

struct RejectedComment {
    text: String,
    error: Option<String>,
}

async fn render_post_detail(
    state: &HttpState,
    chrome: LayoutChrome,
    username: &str,
    post_id: PostId,
    rejected: Option<RejectedComment>,
) -> Response {
    let detail = match state.posts.detail(username, post_id).await {
        Ok(detail) => detail,
        Err(err) => return error_page(err.into(), chrome),
    };

    let can_edit = chrome.viewer.as_deref() == Some(detail.author.username.as_str());
    let (status, comment_text, comment_error) = match rejected {
        Some(rejected) => (StatusCode::BAD_REQUEST, rejected.text, rejected.error),
        None => (StatusCode::OK, String::new(), None),
    };

    let content = PostDetailView {
        post: PostCard::from(&detail.post),
        author_posts_count: detail.author_posts_count,
        comments: detail.comments.iter().map(CommentView::from).collect(),
        can_edit,
        comment_text,
        comment_error,
    };
    let view = LayoutContext::new(chrome, content);
    render_template_response(PostTemplate { view }, status)
}

async fn rerender_post_form(
    state: &HttpState,
    chrome: LayoutChrome,
    action: &str,
    editing: bool,
    submitted: PostForm,
    errors: &FieldErrors,
) -> Response {
    let groups: Vec<GroupRecord> = match state.groups.list().await {
        Ok(groups) => groups,
        Err(err) => return error_page(err.into(), chrome),
    };

    let form = PostFormView::new(action, editing, &groups, submitted.selected_group())
        .with_values(submitted.text, submitted.image)
        .with_errors(errors);
    render_post_form(chrome, form, StatusCode::BAD_REQUEST)
}

fn render_post_form(chrome: LayoutChrome, form: PostFormView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome, form);
    let mut response = render_template_response(PostFormTemplate { view }, status);
    if status == StatusCode::BAD_REQUEST {
        ErrorReport::from_message(SOURCE, status, "post form rejected").attach(&mut response);
    }
    response
}

/// Render the failure page matching `err`, with its report attached for the
/// response logger.
fn error_page(err: AppError, chrome: LayoutChrome) -> Response {
    let status = err.status_code();
    let mut response = if status == StatusCode::NOT_FOUND {
        render_not_found_response(chrome)
    } else {
        render_error_response(chrome, status, err.presentation_message())
    };
    ErrorReport::from_error(SOURCE, status, &err).attach(&mut response);
    response
}

fn parse_post_id(raw: &str) -> Option<PostId> {
    raw.parse::<i64>().ok().map(PostId)
}

fn post_href(username: &str, post_id: PostId) -> String {
    format!("/{username}/{post_id}")
}

