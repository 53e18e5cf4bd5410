use crate::errors::{not_found, ApiError, ApiResult};
use crate::model::category::{Category, CategoryWithPostCount};
use sqlx::SqlitePool;
use tracing::info;

impl Category {
    pub async fn get_count(pool: &SqlitePool) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }

    pub async fn get_all_with_post_count(pool: &SqlitePool) -> ApiResult<Vec<CategoryWithPostCount>> {
        let categories = sqlx::query_as::<_, CategoryWithPostCount>(
            r#"
            SELECT c.id, c.name, COUNT(p.id) AS post_count
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ApiResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(category)
    }

    pub async fn get(pool: &SqlitePool, id: i64) -> ApiResult<Category> {
        Category::find_by_id(pool, id)
            .await?
            .ok_or_else(category_not_found)
    }

    pub async fn create(pool: &SqlitePool, name: &str) -> ApiResult<Category> {
        let name = name.trim();
        let id: i64 = sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await?;

        info!("created category {} ({})", id, name);

        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn rename(pool: &SqlitePool, id: i64, name: &str) -> ApiResult<()> {
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(name.trim())
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(category_not_found());
        }
        Ok(())
    }

    /// Deletes the category together with every post filed under it.
    /// Returns the number of posts removed.
    pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<i64> {
        let mut tx = pool.begin().await?;

        let post_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category_id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        // posts and their tag links go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(category_not_found());
        }

        tx.commit().await?;

        info!("deleted category {} and {} posts", id, post_count);
        Ok(post_count)
    }
}

fn category_not_found() -> ApiError {
    not_found("category not found")
}
