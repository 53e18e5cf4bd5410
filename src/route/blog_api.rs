use crate::errors::{bad_request, ApiResult};
use crate::model::author::{Author, CreateAuthorRequest};
use crate::model::category::{
    Category, CategoryWithPostCount, CreateCategoryRequest, DeleteCategoryResponse,
    RenameCategoryRequest,
};
use crate::model::post::{
    BlogStats, CreatePostRequest, FilterPostRequest, Id, Post, PostFilter, RenderRequest,
    RenderResponse, SaveResponse, UpdatePostRequest,
};
use crate::model::tag::{CreateTagRequest, RenameTagRequest, Tag, TagWithPostCount};
use crate::service::post_service::derive_excerpt;
use crate::util::extractor::{Json, Query, ValidatedJson, ValidatedQuery};
use crate::util::fp::Pipe;
use crate::util::time::month_range;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/get-categories", get(get_categories))
        .route("/create-category", post(create_category))
        .route("/rename-category", post(rename_category))
        .route("/delete-category", post(delete_category))
        .route("/get-tags", get(get_tags))
        .route("/create-tag", post(create_tag))
        .route("/rename-tag", post(rename_tag))
        .route("/delete-tag", post(delete_tag))
        .route("/get-authors", get(get_authors))
        .route("/create-author", post(create_author))
        .route("/delete-author", post(delete_author))
        .route("/get-posts", get(get_posts))
        .route("/get-post", get(get_post))
        .route("/create-post", post(create_post))
        .route("/update-post", post(update_post))
        .route("/delete-post", post(delete_post))
        .route("/get-overall-counts", get(get_stats))
        .route("/render", post(render))
}

async fn get_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<CategoryWithPostCount>>> {
    let categories = Category::get_all_with_post_count(&state.db).await?;
    Ok(Json(categories))
}

async fn create_category(State(state): State<AppState>, ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>) -> ApiResult<Json<Category>> {
    Category::create(&state.db, &payload.name).await?.pipe(Json).pipe(Ok)
}

async fn rename_category(State(state): State<AppState>, ValidatedJson(payload): ValidatedJson<RenameCategoryRequest>) -> ApiResult<StatusCode> {
    Category::rename(&state.db, payload.id, &payload.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_category(State(state): State<AppState>, Json(payload): Json<Id>) -> ApiResult<Json<DeleteCategoryResponse>> {
    let deleted_posts = Category::delete(&state.db, payload.id).await?;
    Ok(Json(DeleteCategoryResponse { deleted_posts }))
}

async fn get_tags(State(state): State<AppState>) -> ApiResult<Json<Vec<TagWithPostCount>>> {
    let tags = Tag::get_all_with_post_count(&state.db).await?;
    Ok(Json(tags))
}

async fn create_tag(State(state): State<AppState>, ValidatedJson(payload): ValidatedJson<CreateTagRequest>) -> ApiResult<Json<Tag>> {
    Tag::create(&state.db, &payload.name).await?.pipe(Json).pipe(Ok)
}

async fn rename_tag(State(state): State<AppState>, ValidatedJson(payload): ValidatedJson<RenameTagRequest>) -> ApiResult<StatusCode> {
    Tag::rename(&state.db, payload.id, &payload.name).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_tag(State(state): State<AppState>, Json(payload): Json<Id>) -> ApiResult<StatusCode> {
    Tag::delete(&state.db, payload.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_authors(State(state): State<AppState>) -> ApiResult<Json<Vec<Author>>> {
    let authors = Author::get_all(&state.db).await?;
    Ok(Json(authors))
}

async fn create_author(State(state): State<AppState>, ValidatedJson(payload): ValidatedJson<CreateAuthorRequest>) -> ApiResult<Json<Author>> {
    Author::create(&state.db, &payload.username).await?.pipe(Json).pipe(Ok)
}

async fn delete_author(State(state): State<AppState>, Json(payload): Json<Id>) -> ApiResult<StatusCode> {
    Author::delete(&state.db, payload.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_posts(State(state): State<AppState>, ValidatedQuery(query): ValidatedQuery<FilterPostRequest>) -> ApiResult<Json<Vec<Post>>> {
    let created_between = match (query.year, query.month) {
        (Some(year), Some(month)) => {
            let offset = state.config.site.utc_offset_minutes;
            Some(month_range(year, month, offset).map_err(|e| bad_request(&e.to_string()))?)
        }
        _ => None,
    };

    let filter = PostFilter {
        category_id: query.category_id,
        tag_id: query.tag_id,
        created_between,
        limit: None,
    };

    let posts = Post::filter_posts(&state.db, &filter).await?;
    Ok(Json(posts))
}

async fn get_post(State(state): State<AppState>, Query(query): Query<Id>) -> ApiResult<Json<Post>> {
    let post = Post::find(&state.db, query.id).await?;
    Ok(Json(post))
}

async fn create_post(State(state): State<AppState>, ValidatedJson(post): ValidatedJson<CreatePostRequest>) -> ApiResult<Json<SaveResponse>> {
    let excerpt_length = state.config.site.excerpt_length;
    Post::create(&state.db, &state.renderer, excerpt_length, &post).await?.pipe(Json).pipe(Ok)
}

async fn update_post(State(state): State<AppState>, ValidatedJson(post): ValidatedJson<UpdatePostRequest>) -> ApiResult<Json<SaveResponse>> {
    let excerpt_length = state.config.site.excerpt_length;
    Post::update(&state.db, &state.renderer, excerpt_length, &post).await?.pipe(Json).pipe(Ok)
}

async fn delete_post(State(state): State<AppState>, Json(payload): Json<Id>) -> ApiResult<StatusCode> {
    Post::delete(&state.db, payload.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<BlogStats>> {
    Json(BlogStats {
        post_count: Post::get_count(&state.db).await?,
        category_count: Category::get_count(&state.db).await?,
        tag_count: Tag::get_count(&state.db).await?,
    }).pipe(Ok)
}

// Preview of what saving `body` would store and what the detail page would show.
async fn render(State(state): State<AppState>, Json(payload): Json<RenderRequest>) -> ApiResult<Json<RenderResponse>> {
    let rendered = state.renderer.render_with_toc(&payload.body);
    let excerpt = derive_excerpt(&state.renderer, &payload.body, state.config.site.excerpt_length);

    Json(RenderResponse {
        html: rendered.html,
        toc: rendered.toc,
        excerpt,
    }).pipe(Ok)
}
