mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use support::{EPOCH, MemoryStore, http_state, manual_clock};
use yatube::infra::http::build_router;

const USER_HEADER: &str = "x-forwarded-user";

fn router(store: &Arc<MemoryStore>) -> Router {
    build_router(http_state(store, manual_clock()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_as(uri: &str, username: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_HEADER, username)
        .body(Body::empty())
        .unwrap()
}

fn post_form_as(uri: &str, username: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(USER_HEADER, username)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn index_lists_posts_for_anonymous_visitors() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    store.seed_post(&leo, "hello <world>", None, EPOCH);

    let response = router(&store).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(!html.contains("hello <world>"));
    assert!(html.contains("hello &#60;world&#62;"));
    assert!(html.contains("/leo"));
}

#[tokio::test]
async fn anonymous_create_redirects_to_login_with_next() {
    let store = MemoryStore::new();

    let response = router(&store).oneshot(get("/new")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fnew");
}

#[tokio::test]
async fn unknown_identity_is_treated_as_anonymous() {
    let store = MemoryStore::new();

    let response = router(&store)
        .oneshot(get_as("/follow", "ghost"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Ffollow");
}

#[tokio::test]
async fn unknown_group_renders_not_found_page() {
    let store = MemoryStore::new();

    let response = router(&store)
        .oneshot(get("/group/no-such-group"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("/group/no-such-group"));
}

#[tokio::test]
async fn group_page_shows_only_its_posts() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    let cats = store.seed_group("Cats", "cats");
    store.seed_post(&leo, "about cats", Some(&cats), EPOCH);
    store.seed_post(&leo, "about dogs", None, EPOCH);

    let response = router(&store).oneshot(get("/group/cats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("about cats"));
    assert!(!html.contains("about dogs"));
    assert!(html.contains("About Cats"));
}

#[tokio::test]
async fn unknown_profile_and_bad_post_ids_are_not_found() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    let post = store.seed_post(&leo, "hello", None, EPOCH);
    let app = router(&store);

    let response = app.clone().oneshot(get("/nobody")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/leo/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get(&format!("/ann/{}", post.id.get())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(get(&format!("/leo/{}", post.id.get())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blank_post_rerenders_form_with_bad_request() {
    let store = MemoryStore::new();
    store.seed_user("leo");

    let response = router(&store)
        .oneshot(post_form_as("/new", "leo", "text=&group="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("This field is required."));
    assert_eq!(store.post_count(), 0);
}

#[tokio::test]
async fn valid_post_redirects_to_index() {
    let store = MemoryStore::new();
    store.seed_user("leo");
    let cats = store.seed_group("Cats", "cats");

    let body = format!("text=first+post&group={}", cats.id.get());
    let response = router(&store)
        .oneshot(post_form_as("/new", "leo", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(store.post_count(), 1);
}

#[tokio::test]
async fn non_author_edit_redirects_without_changes() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    store.seed_user("ann");
    let post = store.seed_post(&leo, "original", None, EPOCH);
    let href = format!("/leo/{}", post.id.get());

    let response = router(&store)
        .oneshot(post_form_as(&format!("{href}/edit"), "ann", "text=hijacked"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), href);
    assert_eq!(store.post_text(post.id).as_deref(), Some("original"));
}

#[tokio::test]
async fn follow_and_unfollow_round_trip() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    let ann = store.seed_user("ann");
    let app = router(&store);

    let response = app
        .clone()
        .oneshot(post_form_as("/ann/follow", "leo", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/ann");
    assert!(store.has_follow(leo.id, ann.id));

    let response = app
        .clone()
        .oneshot(post_form_as("/leo/follow", "leo", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(store.follow_count(), 1);

    app.oneshot(post_form_as("/ann/unfollow", "leo", ""))
        .await
        .unwrap();
    assert!(!store.has_follow(leo.id, ann.id));
}

#[tokio::test]
async fn follow_feed_shows_followed_authors() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    let ann = store.seed_user("ann");
    let bob = store.seed_user("bob");
    store.seed_post(&ann, "from ann", None, EPOCH);
    store.seed_post(&bob, "from bob", None, EPOCH);
    let app = router(&store);

    app.clone()
        .oneshot(post_form_as("/ann/follow", "leo", ""))
        .await
        .unwrap();
    assert!(store.has_follow(leo.id, ann.id));

    let response = app.oneshot(get_as("/follow", "leo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("from ann"));
    assert!(!html.contains("from bob"));
}

#[tokio::test]
async fn blank_comment_rerenders_post_page() {
    let store = MemoryStore::new();
    let leo = store.seed_user("leo");
    let post = store.seed_post(&leo, "hello", None, EPOCH);
    let uri = format!("/leo/{}/comment", post.id.get());

    let response = router(&store)
        .oneshot(post_form_as(&uri, "leo", "text="))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("This field is required."));
}

#[tokio::test]
async fn database_health_reports_store_state() {
    let store = MemoryStore::new();
    let app = router(&store);

    let response = app.clone().oneshot(get("/_health/db")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    store.unhealthy.store(true, Ordering::SeqCst);
    let response = app.oneshot(get("/_health/db")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
