use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord};
use crate::domain::posts::{FieldErrors, HUMAN_DATE_FORMAT};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;
use url::form_urlencoded::byte_serialize;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found(&chrome.path);
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render the generic failure page. The caller attaches the diagnostic report.
pub fn render_error_response(chrome: LayoutChrome, status: StatusCode, message: &str) -> Response {
    let content = ErrorPageView::server_error(status, message);
    let view = LayoutContext::new(chrome, content);
    render_template_response(ErrorTemplate { view }, status)
}

const DEFAULT_LOGIN_URL: &str = "/auth/login/";

/// Login page URL that sends the user back to `next` afterwards.
pub fn login_href(login_url: &str, next: &str) -> String {
    let encoded: String = byte_serialize(next.as_bytes()).collect();
    format!("{login_url}?next={encoded}")
}

/// Per-request page furniture: who is looking and at what.
#[derive(Clone, Debug)]
pub struct LayoutChrome {
    pub viewer: Option<String>,
    pub path: String,
    pub login_href: String,
}

impl LayoutChrome {
    pub fn new(viewer: Option<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            viewer,
            login_href: login_href(DEFAULT_LOGIN_URL, &path),
            path,
        }
    }

    pub fn with_login_url(self, login_url: &str) -> Self {
        Self {
            login_href: login_href(login_url, &self.path),
            ..self
        }
    }
}

pub struct LayoutContext<T> {
    pub viewer: Option<String>,
    pub path: String,
    pub login_href: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            viewer: chrome.viewer,
            path: chrome.path,
            login_href: chrome.login_href,
            content,
        }
    }
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub published: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
    pub href: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id.get(),
            author: post.author_username.clone(),
            text: post.text.clone(),
            published: format_human_date(post.created_at),
            group_slug: post.group.as_ref().map(|group| group.slug.clone()),
            group_title: post.group.as_ref().map(|group| group.title.clone()),
            image: post.image.clone(),
            href: format!("/{}/{}", post.author_username, post.id),
        }
    }
}

/// Previous/next links for a paginated listing.
#[derive(Clone, Debug)]
pub struct PageNav {
    pub number: usize,
    pub total_pages: usize,
    pub previous: Option<usize>,
    pub next: Option<usize>,
}

impl PageNav {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            number: page.number(),
            total_pages: page.total_pages(),
            previous: page.previous_number(),
            next: page.next_number(),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.total_pages > 1
    }
}

pub struct FeedPageView {
    pub heading: String,
    pub description: Option<String>,
    pub posts: Vec<PostCard>,
    pub total_count: usize,
    pub nav: PageNav,
}

impl FeedPageView {
    pub fn new(heading: impl Into<String>, page: &Page<PostRecord>) -> Self {
        Self {
            heading: heading.into(),
            description: None,
            posts: page.items().iter().map(PostCard::from).collect(),
            total_count: page.total_items(),
            nav: PageNav::from_page(page),
        }
    }

    pub fn with_description(self, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            description: (!description.trim().is_empty()).then_some(description),
            ..self
        }
    }
}

/// Index, group and follow listings share this template.
#[derive(Template)]
#[template(path = "feed.html")]
pub struct FeedTemplate {
    pub view: LayoutContext<FeedPageView>,
}

pub struct ProfileView {
    pub author: String,
    pub posts_count: usize,
    pub following: bool,
    /// False for anonymous viewers and for the author's own profile.
    pub can_follow: bool,
    pub posts: Vec<PostCard>,
    pub nav: PageNav,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Clone, Debug)]
pub struct CommentView {
    pub author: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author: comment.author_username.clone(),
            text: comment.text.clone(),
            published: format_human_date(comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_posts_count: u64,
    pub comments: Vec<CommentView>,
    pub can_edit: bool,
    pub comment_text: String,
    pub comment_error: Option<String>,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone, Debug)]
pub struct GroupOption {
    pub id: i64,
    pub title: String,
    pub selected: bool,
}

/// Create/edit form state, including whatever the user typed last time.
pub struct PostFormView {
    pub action: String,
    pub editing: bool,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupOption>,
    pub text_error: Option<String>,
    pub group_error: Option<String>,
    pub image_error: Option<String>,
}

impl PostFormView {
    pub fn new(
        action: impl Into<String>,
        editing: bool,
        groups: &[GroupRecord],
        selected: Option<i64>,
    ) -> Self {
        Self {
            action: action.into(),
            editing,
            text: String::new(),
            image: String::new(),
            groups: groups
                .iter()
                .map(|group| GroupOption {
                    id: group.id.get(),
                    title: group.title.clone(),
                    selected: Some(group.id.get()) == selected,
                })
                .collect(),
            text_error: None,
            group_error: None,
            image_error: None,
        }
    }

    pub fn with_values(self, text: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: image.into(),
            ..self
        }
    }

    pub fn with_errors(self, errors: &FieldErrors) -> Self {
        Self {
            text_error: errors.for_field("text").map(str::to_string),
            group_error: errors.for_field("group").map(str::to_string),
            image_error: errors.for_field("image").map(str::to_string),
            ..self
        }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found(path: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND.as_u16(),
            title: "Page not found".to_string(),
            message: format!("The page {path} does not exist."),
        }
    }

    pub fn server_error(status: StatusCode, message: &str) -> Self {
        Self {
            status: status.as_u16(),
            title: "Something went wrong".to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
