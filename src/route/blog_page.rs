use crate::config::AppConfig;
use crate::errors::{PageError, PageResult};
use crate::model::category::{Category, CategoryWithPostCount};
use crate::model::post::{ArchiveMonth, Post, PostFilter};
use crate::model::tag::{Tag, TagWithPostCount};
use crate::util::extractor::PagePath;
use crate::util::time::{format_timestamp, month_range};
use crate::AppState;
use anyhow::Result;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Extension, Router};
use derive_more::Display;
#[cfg(not(debug_assertions))]
use include_dir::{include_dir, Dir};
use minijinja::{context, Environment};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

type HtmlResult = PageResult<Html<String>>;

type Templates = Arc<Environment<'static>>;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn create_routes(config: &AppConfig) -> Result<Router<AppState>> {
    let mut env = Environment::new();
    load_templates(&mut env)?;

    env.add_global("site_title", config.site.title.clone());
    env.add_global("static_url", config.static_url.trim_end_matches('/').to_string());

    Ok(Router::new()
        .route("/", get(index))
        .route("/post/{id}", get(detail))
        .route("/archive/{year}/{month}", get(archive))
        .route("/category/{id}", get(category))
        .route("/tag/{id}", get(tag))
        .layer(Extension(Arc::new(env))))
}

/// What a listing page shows, used as its heading.
#[derive(Debug, Display)]
enum Listing {
    #[display("All posts")]
    All,
    #[display("Archive: {year}-{month:02}")]
    Archive { year: i32, month: u32 },
    #[display("Category: {_0}")]
    Category(String),
    #[display("Tag: {_0}")]
    Tag(String),
}

/// A post as the templates see it, with dates already in the site's timezone.
#[derive(Debug, Serialize)]
struct PostView {
    id: i64,
    title: String,
    excerpt: String,
    category_id: i64,
    category_name: String,
    author_name: String,
    tags: Vec<Tag>,
    created_date: String,
    created_time: String,
    modified_time: String,
}

impl PostView {
    fn new(post: Post, offset_minutes: i32) -> Self {
        let row = post.row;
        PostView {
            id: row.id,
            title: row.title,
            excerpt: row.excerpt,
            category_id: row.category_id,
            category_name: row.category_name,
            author_name: row.author_name,
            tags: post.tags,
            created_date: format_timestamp(row.created_time, offset_minutes, DATE_FORMAT),
            created_time: format_timestamp(row.created_time, offset_minutes, DATETIME_FORMAT),
            modified_time: format_timestamp(row.modified_time, offset_minutes, DATETIME_FORMAT),
        }
    }
}

#[derive(Debug, Serialize)]
struct Sidebar {
    recent_posts: Vec<PostView>,
    archives: Vec<ArchiveMonth>,
    categories: Vec<CategoryWithPostCount>,
    tags: Vec<TagWithPostCount>,
}

impl Sidebar {
    async fn load(state: &AppState) -> PageResult<Self> {
        let site = &state.config.site;
        let pool = &state.db.pool;

        let recent_filter = PostFilter::recent(site.recent_posts);
        let (recent_posts, archives, categories, tags) = tokio::try_join!(
            Post::filter_posts(pool, &recent_filter),
            Post::archive_months(pool, site.utc_offset_minutes),
            Category::get_all_with_post_count(pool),
            Tag::get_all_with_post_count(pool),
        )?;

        Ok(Sidebar {
            recent_posts: views(recent_posts, site.utc_offset_minutes),
            archives,
            categories,
            tags,
        })
    }
}

async fn index(
    State(state): State<AppState>,
    Extension(env): Extension<Templates>,
) -> HtmlResult {
    render_listing(&state, &env, Listing::All, PostFilter::all()).await
}

async fn detail(
    State(state): State<AppState>,
    PagePath(id): PagePath<i64>,
    Extension(env): Extension<Templates>,
) -> HtmlResult {
    let post = Post::find(&state.db.pool, id).await?;
    let rendered = state.renderer.render_with_toc(&post.row.body);
    let sidebar = Sidebar::load(&state).await?;

    let template = env.get_template("detail.html")?;
    Ok(Html(template.render(context! {
        post => PostView::new(post, state.config.site.utc_offset_minutes),
        body => rendered.html,
        toc => rendered.toc,
        sidebar,
    })?))
}

async fn archive(
    State(state): State<AppState>,
    PagePath((year, month)): PagePath<(i32, u32)>,
    Extension(env): Extension<Templates>,
) -> HtmlResult {
    let (start, end) =
        month_range(year, month, state.config.site.utc_offset_minutes).map_err(|e| {
            debug!("no archive page for {}-{}: {}", year, month, e);
            PageError::NotFound
        })?;

    let filter = PostFilter::created_between(start, end);
    render_listing(&state, &env, Listing::Archive { year, month }, filter).await
}

async fn category(
    State(state): State<AppState>,
    PagePath(id): PagePath<i64>,
    Extension(env): Extension<Templates>,
) -> HtmlResult {
    let category = Category::get(&state.db.pool, id).await?;
    let listing = Listing::Category(category.name);
    render_listing(&state, &env, listing, PostFilter::by_category(id)).await
}

async fn tag(
    State(state): State<AppState>,
    PagePath(id): PagePath<i64>,
    Extension(env): Extension<Templates>,
) -> HtmlResult {
    let tag = Tag::get(&state.db.pool, id).await?;
    render_listing(&state, &env, Listing::Tag(tag.name), PostFilter::by_tag(id)).await
}

async fn render_listing(
    state: &AppState,
    env: &Environment<'static>,
    listing: Listing,
    filter: PostFilter,
) -> HtmlResult {
    let posts = Post::filter_posts(&state.db.pool, &filter).await?;
    let sidebar = Sidebar::load(state).await?;

    let template = env.get_template("index.html")?;
    Ok(Html(template.render(context! {
        heading => listing.to_string(),
        posts => views(posts, state.config.site.utc_offset_minutes),
        sidebar,
    })?))
}

fn views(posts: Vec<Post>, offset_minutes: i32) -> Vec<PostView> {
    posts
        .into_iter()
        .map(|post| PostView::new(post, offset_minutes))
        .collect()
}

#[cfg(not(debug_assertions))]
static TEMPLATES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/templates");

#[cfg(debug_assertions)]
fn load_templates(env: &mut Environment<'static>) -> Result<()> {
    use minijinja::path_loader;
    // Read from disk on every render so template edits show up without a rebuild
    env.set_loader(path_loader("templates"));
    Ok(())
}

#[cfg(not(debug_assertions))]
fn load_templates(env: &mut Environment<'static>) -> Result<()> {
    for file in TEMPLATES_DIR.files() {
        let Some(name) = file.path().to_str() else {
            continue;
        };
        let Some(content) = file.contents_utf8() else {
            anyhow::bail!("Template {} is not valid utf-8", name);
        };
        env.add_template(name, content)?;
    }
    Ok(())
}
