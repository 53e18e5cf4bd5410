use crate::errors::{not_found, ApiError, ApiResult};
use crate::model::post::{
    ArchiveMonth, CreatePostRequest, Post, PostFilter, PostRow, SaveResponse, UpdatePostRequest,
    EXCERPT_MAX_LENGTH,
};
use crate::model::tag::Tag;
use crate::service::render_service::MarkdownRenderer;
use crate::util::html::{strip_tags, truncate_chars};
use crate::util::time::now_millis;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::collections::{BTreeSet, HashMap};
use tracing::info;

// Posts joined with the names shown next to them on every page.
const SELECT_POSTS: &str = r#"
    SELECT p.id, p.title, p.body, p.excerpt, p.created_time, p.modified_time,
           p.category_id, c.name AS category_name,
           p.author_id, a.username AS author_name
    FROM posts p
    INNER JOIN categories c ON c.id = p.category_id
    INNER JOIN authors a ON a.id = p.author_id
"#;

impl Post {
    /// Finds a post with its tags.
    pub async fn find(pool: &SqlitePool, id: i64) -> ApiResult<Post> {
        let row = Post::find_by_id(pool, id).await?.ok_or_else(post_not_found)?;
        let mut posts = vec![Post::from(row)];
        Self::attach_tags(pool, &mut posts).await?;
        posts.pop().ok_or_else(post_not_found)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> ApiResult<Option<PostRow>> {
        let mut conn = pool.acquire().await?;
        Self::fetch_row(&mut *conn, id).await
    }

    async fn fetch_row(conn: &mut SqliteConnection, id: i64) -> ApiResult<Option<PostRow>> {
        let sql = format!("{SELECT_POSTS} WHERE p.id = ?");
        Ok(sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?)
    }

    /// Lists posts matching `filter`, newest first. Posts created at the same
    /// millisecond are ordered by descending id.
    pub async fn filter_posts(pool: &SqlitePool, filter: &PostFilter) -> ApiResult<Vec<Post>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_POSTS);

        builder.push(" WHERE 1 = 1 ");

        if let Some(category_id) = filter.category_id {
            builder.push(" AND p.category_id = ").push_bind(category_id);
        }

        if let Some(tag_id) = filter.tag_id {
            builder
                .push(" AND EXISTS (SELECT 1 FROM tag_post_assoc tp WHERE tp.post_id = p.id AND tp.tag_id = ")
                .push_bind(tag_id)
                .push(") ");
        }

        if let Some((start, end)) = filter.created_between {
            builder.push(" AND p.created_time >= ").push_bind(start);
            builder.push(" AND p.created_time < ").push_bind(end);
        }

        builder.push(" ORDER BY p.created_time DESC, p.id DESC ");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let mut posts = builder
            .build_query_as::<PostRow>()
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(Post::from)
            .collect::<Vec<_>>();

        Self::attach_tags(pool, &mut posts).await?;

        Ok(posts)
    }

    pub async fn get_count(pool: &SqlitePool) -> ApiResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Months that have posts, newest first, in the site's timezone.
    pub async fn archive_months(
        pool: &SqlitePool,
        offset_minutes: i32,
    ) -> ApiResult<Vec<ArchiveMonth>> {
        let offset_ms = offset_minutes as i64 * 60 * 1000;

        let months = sqlx::query_as::<_, ArchiveMonth>(
            r#"
            SELECT CAST(strftime('%Y', (created_time + ?1) / 1000, 'unixepoch') AS INTEGER) AS year,
                   CAST(strftime('%m', (created_time + ?1) / 1000, 'unixepoch') AS INTEGER) AS month,
                   COUNT(*) AS post_count
            FROM posts
            GROUP BY year, month
            ORDER BY year DESC, month DESC
            "#,
        )
        .bind(offset_ms)
        .fetch_all(pool)
        .await?;

        Ok(months)
    }

    /// Saves a new post. An empty excerpt is derived from the body.
    pub async fn create(
        pool: &SqlitePool,
        renderer: &MarkdownRenderer,
        excerpt_length: usize,
        post: &CreatePostRequest,
    ) -> ApiResult<SaveResponse> {
        let now = now_millis();
        let created_time = post.created_time.unwrap_or(now);
        let modified_time = next_modified_time(now, created_time, None);
        let excerpt = fill_excerpt(renderer, &post.body, &post.excerpt, excerpt_length);

        let mut tx = pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO posts (
                title, body, excerpt, created_time,
                modified_time, category_id, author_id
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.title.trim())
        .bind(&post.body)
        .bind(&excerpt)
        .bind(created_time)
        .bind(modified_time)
        .bind(post.category_id)
        .bind(post.author_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        Post::update_post_tag_assoc(&mut tx, id, &post.tag_ids, true).await?;

        tx.commit().await?;

        info!("created post {} in category {}", id, post.category_id);

        Ok(SaveResponse {
            id,
            excerpt,
            created_time,
            modified_time,
        })
    }

    /// Applies the fields present in `post` and saves the result under the
    /// same rules as `create`.
    pub async fn update(
        pool: &SqlitePool,
        renderer: &MarkdownRenderer,
        excerpt_length: usize,
        post: &UpdatePostRequest,
    ) -> ApiResult<SaveResponse> {
        let mut tx = pool.begin().await?;

        let current = Self::fetch_row(&mut *tx, post.id)
            .await?
            .ok_or_else(post_not_found)?;

        let title = post.title.clone().unwrap_or(current.title);
        let body = post.body.clone().unwrap_or(current.body);
        let excerpt = post.excerpt.clone().unwrap_or(current.excerpt);
        let created_time = post.created_time.clone().unwrap_or(current.created_time);
        let category_id = post.category_id.clone().unwrap_or(current.category_id);
        let author_id = post.author_id.clone().unwrap_or(current.author_id);

        let excerpt = fill_excerpt(renderer, &body, &excerpt, excerpt_length);
        let modified_time =
            next_modified_time(now_millis(), created_time, Some(current.modified_time));

        sqlx::query(
            r#"
            UPDATE posts
            SET title = ?, body = ?, excerpt = ?, created_time = ?,
                modified_time = ?, category_id = ?, author_id = ?
            WHERE id = ?
            "#,
        )
        .bind(title.trim())
        .bind(&body)
        .bind(&excerpt)
        .bind(created_time)
        .bind(modified_time)
        .bind(category_id)
        .bind(author_id)
        .bind(post.id)
        .execute(&mut *tx)
        .await?;

        if let Some(tag_ids) = post.tag_ids.as_option() {
            Post::update_post_tag_assoc(&mut tx, post.id, tag_ids, false).await?;
        }

        tx.commit().await?;

        info!("updated post {}", post.id);

        Ok(SaveResponse {
            id: post.id,
            excerpt,
            created_time,
            modified_time,
        })
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> ApiResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(post_not_found());
        }

        info!("deleted post {}", id);
        Ok(())
    }

    async fn update_post_tag_assoc(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        tag_ids: &[i64],
        is_new_post: bool,
    ) -> ApiResult<()> {
        if !is_new_post {
            sqlx::query("DELETE FROM tag_post_assoc WHERE post_id = ?")
                .bind(post_id)
                .execute(&mut **tx)
                .await?;
        }

        let tag_ids: BTreeSet<i64> = tag_ids.iter().copied().collect();

        for tag_id in tag_ids {
            sqlx::query("INSERT INTO tag_post_assoc (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    async fn attach_tags(pool: &SqlitePool, posts: &mut [Post]) -> ApiResult<()> {
        if posts.is_empty() {
            return Ok(());
        }

        let post_ids: Vec<i64> = posts.iter().map(|post| post.row.id).collect();
        let post_ids = serde_json::to_string(&post_ids).map_err(anyhow::Error::from)?;

        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            r#"
            SELECT tp.post_id, t.id, t.name
            FROM tag_post_assoc AS tp
            INNER JOIN tags t ON tp.tag_id = t.id
            WHERE tp.post_id IN (SELECT value FROM json_each(?1))
            ORDER BY t.name
            "#,
        )
        .bind(post_ids)
        .fetch_all(pool)
        .await?;

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for (post_id, id, name) in rows {
            tags.entry(post_id).or_default().push(Tag { id, name });
        }

        for post in posts {
            post.tags = tags.remove(&post.row.id).unwrap_or_default();
        }

        Ok(())
    }
}

/// Renders `body`, strips the tags and keeps the first `length` characters.
/// Trailing whitespace of the rendered text is dropped first. The result
/// never exceeds the excerpt column limit.
pub fn derive_excerpt(renderer: &MarkdownRenderer, body: &str, length: usize) -> String {
    let length = length.min(EXCERPT_MAX_LENGTH as usize);
    let text = strip_tags(&renderer.render(body));
    truncate_chars(text.trim_end(), length)
}

// An editor's excerpt is kept as written, a blank one is derived.
fn fill_excerpt(renderer: &MarkdownRenderer, body: &str, excerpt: &str, length: usize) -> String {
    if excerpt.trim().is_empty() {
        derive_excerpt(renderer, body, length)
    } else {
        excerpt.to_string()
    }
}

// Never earlier than the creation time or the previous save.
fn next_modified_time(now: i64, created_time: i64, previous: Option<i64>) -> i64 {
    now.max(created_time).max(previous.unwrap_or(i64::MIN))
}

fn post_not_found() -> ApiError {
    not_found("post not found")
}
