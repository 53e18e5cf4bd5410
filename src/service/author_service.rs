use crate::errors::{not_found, ApiResult};
use crate::model::author::Author;
use crate::util::time::now_millis;
use sqlx::SqlitePool;
use tracing::info;

impl Author {
    pub async fn get_all(pool: &SqlitePool) -> ApiResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>(
            "SELECT id, username, created_time FROM authors ORDER BY username",
        )
        .fetch_all(pool)
        .await?;

        Ok(authors)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ApiResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "SELECT id, username, created_time FROM authors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(author)
    }

    pub async fn create(pool: &SqlitePool, username: &str) -> ApiResult<Author> {
        let username = username.trim();
        let now = now_millis();

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO authors (username, created_time) VALUES (?, ?) RETURNING id",
        )
        .bind(username)
        .bind(now)
        .fetch_one(pool)
        .await?;

        info!("created author {} ({})", id, username);

        Ok(Author {
            id,
            username: username.to_string(),
            created_time: now,
        })
    }

    /// Deletes the author and, through the foreign key, all of their posts.
    pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found("author not found"));
        }

        info!("deleted author {}", id);
        Ok(())
    }
}
