use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::{
    application::repos::{FollowsRepo, RepoError},
    domain::types::UserId,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl FollowsRepo for PostgresRepositories {
    async fn insert_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower)
        .bind(following)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
                .bind(follower)
                .bind(following)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, follower: UserId, following: UserId) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower)
        .bind(following)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_following(&self, follower: UserId) -> Result<BTreeSet<UserId>, RepoError> {
        let rows = sqlx::query_scalar::<_, UserId>(
            "SELECT following_id FROM follows WHERE follower_id = $1",
        )
        .bind(follower)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().collect())
    }
}
