#[cfg(test)]
mod tests {
    use crate::tests::common::{get, post_json, setup_app};
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn parse(body: &str) -> Value {
        serde_json::from_str(body).unwrap()
    }

    // Creates an author and a category, returns their ids.
    async fn seed(app: &axum::Router) -> (i64, i64) {
        let (status, body) = post_json(app, "/api/create-author", json!({"username": "alice"})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let author_id = parse(&body)["id"].as_i64().unwrap();

        let (status, body) = post_json(app, "/api/create-category", json!({"name": "Notes"})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let category_id = parse(&body)["id"].as_i64().unwrap();

        (author_id, category_id)
    }

    #[tokio::test]
    async fn test_post_lifecycle() {
        let (_state, app) = setup_app().await;
        let (author_id, category_id) = seed(&app).await;

        let (_, body) = post_json(&app, "/api/create-tag", json!({"name": "rust"})).await;
        let tag_id = parse(&body)["id"].as_i64().unwrap();

        let (status, body) = post_json(
            &app,
            "/api/create-post",
            json!({
                "title": "Hello",
                "body": "# Hello\n\nFirst post.",
                "created_time": 1_700_000_000_000_i64,
                "category_id": category_id,
                "author_id": author_id,
                "tag_ids": [tag_id],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let saved = parse(&body);
        let id = saved["id"].as_i64().unwrap();
        assert_eq!(saved["excerpt"], "Hello\nFirst post.");
        assert_eq!(saved["created_time"], 1_700_000_000_000_i64);

        let (status, body) = get(&app, &format!("/api/get-post?id={id}")).await;
        assert_eq!(status, StatusCode::OK);
        let post = parse(&body);
        assert_eq!(post["title"], "Hello");
        assert_eq!(post["category_name"], "Notes");
        assert_eq!(post["author_name"], "alice");
        assert_eq!(post["tags"][0]["name"], "rust");

        let (status, body) = post_json(
            &app,
            "/api/update-post",
            json!({"id": id, "title": "Hello again", "tag_ids": []}),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert!(parse(&body)["modified_time"].as_i64().unwrap() >= 1_700_000_000_000);

        let (_, body) = get(&app, &format!("/api/get-post?id={id}")).await;
        let post = parse(&body);
        assert_eq!(post["title"], "Hello again");
        assert_eq!(post["tags"], json!([]));

        let (status, _) = post_json(&app, "/api/delete-post", json!({"id": id})).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = get(&app, &format!("/api/get-post?id={id}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(parse(&body)["code"], 404);
    }

    #[tokio::test]
    async fn test_get_posts_filters() {
        let (_state, app) = setup_app().await;
        let (author_id, category_id) = seed(&app).await;

        // 2024-01-15T00:00:00Z and 2024-02-15T00:00:00Z
        for (title, created_time) in [("jan", 1_705_276_800_000_i64), ("feb", 1_707_955_200_000_i64)] {
            let (status, body) = post_json(
                &app,
                "/api/create-post",
                json!({
                    "title": title,
                    "body": title,
                    "created_time": created_time,
                    "category_id": category_id,
                    "author_id": author_id,
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
        }

        let (status, body) = get(&app, "/api/get-posts").await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<String> = parse(&body)
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["feb", "jan"]);

        let (_, body) = get(&app, "/api/get-posts?year=2024&month=1").await;
        let posts = parse(&body);
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["title"], "jan");

        let (_, body) = get(&app, &format!("/api/get-posts?category_id={category_id}")).await;
        assert_eq!(parse(&body).as_array().unwrap().len(), 2);

        let (status, _) = get(&app, "/api/get-posts?year=2024").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(&app, "/api/get-posts?year=2024&month=13").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get(&app, "/api/get-posts?tag_id=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rejected_input() {
        let (_state, app) = setup_app().await;
        let (author_id, category_id) = seed(&app).await;

        let (status, body) = post_json(&app, "/api/create-category", json!({"name": "Notes"})).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(parse(&body)["code"], 409);

        let (status, _) = post_json(&app, "/api/create-category", json!({"name": "  "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &app,
            "/api/create-post",
            json!({
                "title": "t".repeat(71),
                "body": "body",
                "category_id": category_id,
                "author_id": author_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(
            &app,
            "/api/create-post",
            json!({
                "title": "orphan",
                "body": "body",
                "category_id": 999,
                "author_id": author_id,
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json(&app, "/api/create-post", json!({"title": "missing"})).await;
        assert!(status.is_client_error());

        let (status, _) = post_json(&app, "/api/rename-tag", json!({"id": 99, "name": "x"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_taxonomy_endpoints() {
        let (_state, app) = setup_app().await;
        let (author_id, category_id) = seed(&app).await;

        let (_, body) = post_json(&app, "/api/create-tag", json!({"name": "rust"})).await;
        let tag_id = parse(&body)["id"].as_i64().unwrap();

        let (status, _) = post_json(
            &app,
            "/api/create-post",
            json!({
                "title": "tagged",
                "body": "body",
                "category_id": category_id,
                "author_id": author_id,
                "tag_ids": [tag_id],
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = post_json(
            &app,
            "/api/rename-category",
            json!({"id": category_id, "name": "Journal"}),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = get(&app, "/api/get-categories").await;
        let categories = parse(&body);
        assert_eq!(categories[0]["name"], "Journal");
        assert_eq!(categories[0]["post_count"], 1);

        let (_, body) = get(&app, "/api/get-tags").await;
        assert_eq!(parse(&body)[0]["post_count"], 1);

        let (_, body) = get(&app, "/api/get-authors").await;
        assert_eq!(parse(&body)[0]["username"], "alice");

        let (_, body) = get(&app, "/api/get-overall-counts").await;
        assert_eq!(
            parse(&body),
            json!({"post_count": 1, "category_count": 1, "tag_count": 1})
        );

        let (status, _) = post_json(&app, "/api/delete-tag", json!({"id": tag_id})).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) =
            post_json(&app, "/api/delete-category", json!({"id": category_id})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse(&body)["deleted_posts"], 1);

        let (status, _) = post_json(&app, "/api/delete-author", json!({"id": author_id})).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = get(&app, "/api/get-overall-counts").await;
        assert_eq!(
            parse(&body),
            json!({"post_count": 0, "category_count": 0, "tag_count": 0})
        );
    }

    #[tokio::test]
    async fn test_render_preview() {
        let (_state, app) = setup_app().await;

        let (status, body) = post_json(
            &app,
            "/api/render",
            json!({"body": "# Intro\n\nSome *text*.\n\n## Details"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let rendered = parse(&body);
        assert!(rendered["html"].as_str().unwrap().contains("<h1 id=\"intro\">Intro</h1>"));
        assert!(rendered["toc"].as_str().unwrap().contains("href=\"#details\""));
        assert_eq!(rendered["excerpt"], "Intro\nSome text.\nDetails");
    }

    #[tokio::test]
    async fn test_unknown_api_routes_answer_json() {
        let (_state, app) = setup_app().await;

        let (status, body) = get(&app, "/api/no-such-endpoint").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(parse(&body)["error"], "Not Found");

        let (status, body) = get(&app, "/api/create-post").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(parse(&body)["code"], 405);
    }
}
