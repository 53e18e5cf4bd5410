use crate::errors::{not_found, ApiError, ApiResult};
use crate::model::tag::{Tag, TagWithPostCount};
use sqlx::SqlitePool;
use tracing::info;

impl Tag {
    pub async fn get_count(pool: &SqlitePool) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn get_all_with_post_count(pool: &SqlitePool) -> ApiResult<Vec<TagWithPostCount>> {
        let tags = sqlx::query_as::<_, TagWithPostCount>(
            r#"
            SELECT t.id, t.name, COUNT(tpa.post_id) AS post_count
            FROM tags t
            LEFT JOIN tag_post_assoc tpa ON tpa.tag_id = t.id
            GROUP BY t.id, t.name
            ORDER BY t.name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(tags)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ApiResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(tag)
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> ApiResult<Tag> {
        Tag::find_by_id(pool, id).await?.ok_or_else(tag_not_found)
    }

    pub async fn create(pool: &SqlitePool, name: &str) -> ApiResult<Tag> {
        let name = name.trim();
        let id: i64 = sqlx::query_scalar("INSERT INTO tags (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await?;

        info!("created tag {} ({})", id, name);

        Ok(Tag {
            id,
            name: name.to_string(),
        })
    }

    pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> ApiResult<()> {
        let result = sqlx::query("UPDATE tags SET name = ? WHERE id = ?")
            .bind(name.trim())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(tag_not_found());
        }
        Ok(())
    }

    /// Deletes the tag. Tagged posts stay, only the links to them go.
    pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(tag_not_found());
        }

        info!("deleted tag {}", id);
        Ok(())
    }
}

fn tag_not_found() -> ApiError {
    not_found("tag not found")
}
