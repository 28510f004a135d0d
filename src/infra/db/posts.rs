use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{CreatePostParams, PostsRepo, RepoError, UpdatePostParams},
    domain::{
        entities::{PostGroup, PostRecord},
        types::{GroupId, PostId, UserId},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

/// Columns of the post read model. Expects `posts p` joined with `users u`
/// and left-joined with `post_groups g`.
const POST_COLUMNS: &str = "p.id, p.text, p.created_at, p.author_id, \
    u.username AS author_username, p.group_id, g.slug AS group_slug, \
    g.title AS group_title, p.image";

const POST_JOINS: &str = " INNER JOIN users u ON u.id = p.author_id \
    LEFT JOIN post_groups g ON g.id = p.group_id ";

const NEWEST_FIRST: &str = " ORDER BY p.created_at DESC, p.id DESC";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: PostId,
    text: String,
    created_at: OffsetDateTime,
    author_id: UserId,
    author_username: String,
    group_id: Option<GroupId>,
    group_slug: Option<String>,
    group_title: Option<String>,
    image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_slug, row.group_title) {
            (Some(id), Some(slug), Some(title)) => Some(PostGroup { id, slug, title }),
            _ => None,
        };

        Self {
            id: row.id,
            text: row.text,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: row.author_username,
            group,
            image: row.image,
        }
    }
}

impl PostgresRepositories {
    fn select_posts<'q>() -> QueryBuilder<'q, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM posts p");
        qb.push(POST_JOINS);
        qb
    }

    async fn fetch_posts(
        &self,
        mut qb: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<PostRecord>, RepoError> {
        qb.push(NEWEST_FIRST);
        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_all(&self) -> Result<Vec<PostRecord>, RepoError> {
        self.fetch_posts(Self::select_posts()).await
    }

    async fn list_by_group(&self, group: GroupId) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = Self::select_posts();
        qb.push(" WHERE p.group_id = ");
        qb.push_bind(group);
        self.fetch_posts(qb).await
    }

    async fn list_by_author(&self, author: UserId) -> Result<Vec<PostRecord>, RepoError> {
        let mut qb = Self::select_posts();
        qb.push(" WHERE p.author_id = ");
        qb.push_bind(author);
        self.fetch_posts(qb).await
    }

    async fn list_by_authors(&self, authors: &[UserId]) -> Result<Vec<PostRecord>, RepoError> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = authors.iter().map(|id| id.get()).collect();
        let mut qb = Self::select_posts();
        qb.push(" WHERE p.author_id = ANY(");
        qb.push_bind(ids);
        qb.push(")");
        self.fetch_posts(qb).await
    }

    async fn count_by_author(&self, author: UserId) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
            .bind(author)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        let mut qb = Self::select_posts();
        qb.push(" WHERE p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "WITH p AS (INSERT INTO posts (text, created_at, author_id, group_id, image) VALUES (",
        );
        let mut values = qb.separated(", ");
        values.push_bind(params.text);
        values.push_bind(params.created_at);
        values.push_bind(params.author);
        values.push_bind(params.group);
        values.push_bind(params.image);
        qb.push(") RETURNING *) SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM p");
        qb.push(POST_JOINS);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("WITH p AS (UPDATE posts SET text = ");
        qb.push_bind(params.text);
        qb.push(", group_id = ");
        qb.push_bind(params.group);
        qb.push(", image = ");
        qb.push_bind(params.image);
        qb.push(" WHERE id = ");
        qb.push_bind(params.id);
        qb.push(" RETURNING *) SELECT ");
        qb.push(POST_COLUMNS);
        qb.push(" FROM p");
        qb.push(POST_JOINS);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: PostId) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
