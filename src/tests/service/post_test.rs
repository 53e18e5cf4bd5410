#[cfg(test)]
mod tests {
    use crate::tests::common::{create_tag, millis, new_post, save, seed, setup_state};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use scribe::model::post::{Post, PostFilter, UpdatePostRequest};
    use scribe::service::post_service::derive_excerpt;
    use scribe::util::html::strip_tags;
    use scribe::util::time::{month_range, now_millis};

    fn update_request(json: serde_json::Value) -> UpdatePostRequest {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_empty_excerpt_is_derived_from_body() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let mut request = new_post(&seed, "Hello", now_millis());
        request.body =
            "# Hello\n\nThis is **the** body of a post that is long enough to be cut somewhere."
                .to_string();
        let saved = save(&state, &request).await;

        let rendered_text = strip_tags(&state.renderer.render(&request.body));
        assert_eq!(saved.excerpt.chars().count(), 54);
        assert!(rendered_text.starts_with(&saved.excerpt));
        assert!(!saved.excerpt.contains('<'));

        let post = Post::find(&state.db, saved.id).await.unwrap();
        assert_eq!(post.row.excerpt, saved.excerpt);
        assert_eq!(
            post.row.excerpt,
            derive_excerpt(&state.renderer, &request.body, 54)
        );
    }

    #[tokio::test]
    async fn test_editor_excerpt_is_stored_unchanged() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let mut request = new_post(&seed, "Hello", now_millis());
        request.excerpt = "  Written by **hand**  ".to_string();
        let saved = save(&state, &request).await;

        let post = Post::find(&state.db, saved.id).await.unwrap();
        assert_eq!(post.row.excerpt, "  Written by **hand**  ");

        // blank is as good as empty
        let mut request = new_post(&seed, "Blank", now_millis());
        request.excerpt = "   ".to_string();
        let saved = save(&state, &request).await;
        assert_eq!(saved.excerpt, "Blank\nThe body of Blank.");
    }

    #[tokio::test]
    async fn test_modified_time_never_goes_back() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let future = now_millis() + 3_600_000;
        let saved = save(&state, &new_post(&seed, "Scheduled", future)).await;
        assert_eq!(saved.created_time, future);
        assert!(saved.modified_time >= saved.created_time);

        let updated = Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": saved.id, "title": "Renamed"})),
        )
        .await
        .unwrap();
        assert!(updated.modified_time >= saved.modified_time);
        assert!(updated.modified_time >= updated.created_time);

        let saved = save(&state, &new_post(&seed, "Past", 1_000)).await;
        assert!(saved.modified_time >= now_millis() - 60_000);
    }

    #[tokio::test]
    async fn test_update_touches_present_fields_only() {
        let state = setup_state().await;
        let seed = seed(&state).await;
        let rust = create_tag(&state, "rust").await;
        let web = create_tag(&state, "web").await;

        let mut request = new_post(&seed, "First", 1_000);
        request.tag_ids = vec![rust.id, web.id, rust.id];
        let saved = save(&state, &request).await;

        let post = Post::find(&state.db, saved.id).await.unwrap();
        assert_eq!(post.tags, vec![rust.clone(), web.clone()]);

        Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": saved.id, "title": "Second"})),
        )
        .await
        .unwrap();

        let post = Post::find(&state.db, saved.id).await.unwrap();
        assert_eq!(post.row.title, "Second");
        assert_eq!(post.row.body, request.body);
        assert_eq!(post.row.created_time, 1_000);
        assert_eq!(post.tags.len(), 2);

        Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": saved.id, "tag_ids": [web.id]})),
        )
        .await
        .unwrap();

        let post = Post::find(&state.db, saved.id).await.unwrap();
        assert_eq!(post.tags, vec![web]);
    }

    #[tokio::test]
    async fn test_update_with_empty_excerpt_derives_again() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let mut request = new_post(&seed, "Post", 1_000);
        request.excerpt = "Custom".to_string();
        let saved = save(&state, &request).await;

        // a new body alone leaves the editor's excerpt alone
        let updated = Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": saved.id, "body": "Changed"})),
        )
        .await
        .unwrap();
        assert_eq!(updated.excerpt, "Custom");

        let updated = Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": saved.id, "excerpt": ""})),
        )
        .await
        .unwrap();
        assert_eq!(updated.excerpt, "Changed");
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let a = save(&state, &new_post(&seed, "a", 1_000)).await;
        let b = save(&state, &new_post(&seed, "b", 3_000)).await;
        let c = save(&state, &new_post(&seed, "c", 2_000)).await;
        let d = save(&state, &new_post(&seed, "d", 3_000)).await;

        let posts = Post::filter_posts(&state.db, &PostFilter::all())
            .await
            .unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.row.id).collect();
        assert_eq!(ids, vec![d.id, b.id, c.id, a.id]);

        for pair in posts.windows(2) {
            assert!(pair[0].row.created_time >= pair[1].row.created_time);
        }

        let recent = Post::filter_posts(&state.db, &PostFilter::recent(2))
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].row.id, d.id);
        assert_eq!(recent[0].row.category_name, "Notes");
        assert_eq!(recent[0].row.author_name, "alice");
    }

    #[tokio::test]
    async fn test_filter_by_category_and_tag() {
        let state = setup_state().await;
        let seed = seed(&state).await;
        let other = scribe::model::category::Category::create(&state.db, "Other")
            .await
            .unwrap();
        let rust = create_tag(&state, "rust").await;

        let mut tagged = new_post(&seed, "tagged", 1_000);
        tagged.tag_ids = vec![rust.id];
        let tagged = save(&state, &tagged).await;

        let mut elsewhere = new_post(&seed, "elsewhere", 2_000);
        elsewhere.category_id = other.id;
        let elsewhere = save(&state, &elsewhere).await;

        let posts = Post::filter_posts(&state.db, &PostFilter::by_category(other.id))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].row.id, elsewhere.id);
        assert!(posts.iter().all(|p| p.row.category_id == other.id));

        let posts = Post::filter_posts(&state.db, &PostFilter::by_tag(rust.id))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].row.id, tagged.id);
        assert_eq!(posts[0].tags[0].name, "rust");
    }

    #[tokio::test]
    async fn test_archive_month_follows_site_offset() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let january = save(&state, &new_post(&seed, "jan", millis("2024-01-31T23:30:00Z"))).await;
        let february = save(&state, &new_post(&seed, "feb", millis("2024-02-01T00:30:00Z"))).await;

        let (start, end) = month_range(2024, 1, 0).unwrap();
        let posts = Post::filter_posts(&state.db, &PostFilter::created_between(start, end))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].row.id, january.id);

        // an hour east of UTC both posts were written in February
        let (start, end) = month_range(2024, 2, 60).unwrap();
        let posts = Post::filter_posts(&state.db, &PostFilter::created_between(start, end))
            .await
            .unwrap();
        let ids: Vec<i64> = posts.iter().map(|p| p.row.id).collect();
        assert_eq!(ids, vec![february.id, january.id]);

        let months = Post::archive_months(&state.db, 0).await.unwrap();
        let months: Vec<(i64, i64, i64)> = months
            .iter()
            .map(|m| (m.year, m.month, m.post_count))
            .collect();
        assert_eq!(months, vec![(2024, 2, 1), (2024, 1, 1)]);

        let months = Post::archive_months(&state.db, 60).await.unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].post_count, 2);
    }

    #[tokio::test]
    async fn test_missing_post() {
        let state = setup_state().await;

        assert!(Post::find(&state.db, 42).await.unwrap_err().is_not_found());
        assert!(Post::delete(&state.db, 42).await.unwrap_err().is_not_found());

        let error = Post::update(
            &state.db,
            &state.renderer,
            54,
            &update_request(serde_json::json!({"id": 42, "title": "x"})),
        )
        .await
        .unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_category_is_rejected() {
        let state = setup_state().await;
        let seed = seed(&state).await;

        let mut request = new_post(&seed, "orphan", 1_000);
        request.category_id = 999;
        let error = Post::create(&state.db, &state.renderer, 54, &request)
            .await
            .unwrap_err();
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);

        assert_eq!(Post::get_count(&state.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_post() {
        let state = setup_state().await;
        let seed = seed(&state).await;
        let rust = create_tag(&state, "rust").await;

        let mut request = new_post(&seed, "gone", 1_000);
        request.tag_ids = vec![rust.id];
        let saved = save(&state, &request).await;

        Post::delete(&state.db, saved.id).await.unwrap();
        assert!(Post::find_by_id(&state.db, saved.id).await.unwrap().is_none());

        let tags = scribe::model::tag::Tag::get_all_with_post_count(&state.db)
            .await
            .unwrap();
        assert_eq!(tags[0].post_count, 0);
    }
}
