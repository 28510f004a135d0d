//! Repository checks against a real Postgres. Run with `DATABASE_URL` set and
//! `--ignored`.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::PgPool;
use time::macros::datetime;

use yatube::application::repos::{
    CreateCommentParams, CreateGroupParams, CreatePostParams, RepoError, Repositories,
};
use yatube::infra::db::PostgresRepositories;

fn repos(pool: PgPool) -> Repositories {
    Repositories::from_store(Arc::new(PostgresRepositories::new(pool)))
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn listing_indexes_exist(pool: PgPool) {
    let rows: Vec<String> = sqlx::query_scalar(
        "SELECT indexname FROM pg_indexes WHERE schemaname = 'public' AND tablename = 'posts'",
    )
    .fetch_all(&pool)
    .await
    .expect("fetch post indexes");

    let indexes: HashSet<String> = rows.into_iter().collect();
    for expected in [
        "posts_created_at_id_idx",
        "posts_author_created_at_idx",
        "posts_group_created_at_idx",
    ] {
        assert!(indexes.contains(expected), "missing {expected}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn posts_come_back_newest_first_with_id_tie_break(pool: PgPool) {
    let repos = repos(pool);
    let leo = repos.users.create_user("leo").await.expect("create user");
    let cats = repos
        .groups
        .create_group(CreateGroupParams {
            title: "Cats".to_string(),
            slug: "cats".to_string(),
            description: String::new(),
        })
        .await
        .expect("create group");

    let same_instant = datetime!(2026-01-01 12:00 UTC);
    let mut ids = Vec::new();
    for (text, group) in [("a", None), ("b", Some(cats.id)), ("c", Some(cats.id))] {
        let post = repos
            .posts
            .create_post(CreatePostParams {
                author: leo.id,
                text: text.to_string(),
                group,
                image: None,
                created_at: same_instant,
            })
            .await
            .expect("create post");
        ids.push(post.id);
    }

    let all: Vec<_> = repos
        .posts
        .list_all()
        .await
        .expect("list all")
        .into_iter()
        .map(|post| post.id)
        .collect();
    ids.reverse();
    assert_eq!(all, ids);

    let in_group = repos.posts.list_by_group(cats.id).await.expect("list group");
    assert_eq!(in_group.len(), 2);
    assert_eq!(in_group[0].group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
    assert_eq!(repos.posts.count_by_author(leo.id).await.expect("count"), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn follow_insert_is_idempotent(pool: PgPool) {
    let repos = repos(pool);
    let leo = repos.users.create_user("leo").await.expect("create leo");
    let ann = repos.users.create_user("ann").await.expect("create ann");

    assert!(repos.follows.insert_follow(leo.id, ann.id).await.expect("first"));
    assert!(!repos.follows.insert_follow(leo.id, ann.id).await.expect("second"));
    assert!(repos.follows.exists(leo.id, ann.id).await.expect("exists"));

    let following = repos.follows.list_following(leo.id).await.expect("list");
    assert_eq!(following.into_iter().collect::<Vec<_>>(), vec![ann.id]);

    assert!(repos.follows.delete_follow(leo.id, ann.id).await.expect("delete"));
    assert!(!repos.follows.delete_follow(leo.id, ann.id).await.expect("delete again"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_username_maps_to_duplicate_error(pool: PgPool) {
    let repos = repos(pool);
    repos.users.create_user("leo").await.expect("create user");
    let err = repos.users.create_user("leo").await.unwrap_err();
    assert!(matches!(err, RepoError::Duplicate { .. }));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comments_are_listed_oldest_first(pool: PgPool) {
    let repos = repos(pool);
    let leo = repos.users.create_user("leo").await.expect("create user");
    let post = repos
        .posts
        .create_post(CreatePostParams {
            author: leo.id,
            text: "hello".to_string(),
            group: None,
            image: None,
            created_at: datetime!(2026-01-01 12:00 UTC),
        })
        .await
        .expect("create post");

    for (text, at) in [
        ("second", datetime!(2026-01-01 12:05 UTC)),
        ("first", datetime!(2026-01-01 12:01 UTC)),
    ] {
        repos
            .comments
            .create_comment(CreateCommentParams {
                post: post.id,
                author: leo.id,
                text: text.to_string(),
                created_at: at,
            })
            .await
            .expect("create comment");
    }

    let comments = repos.comments.list_for_post(post.id).await.expect("list");
    let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    assert_eq!(comments[0].author_username, "leo");
}
