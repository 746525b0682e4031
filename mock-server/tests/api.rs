use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::{app, Post};
use serde_json::Value;
use tower::{Service, ServiceExt};

type App = RouterIntoService<String>;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

async fn call(app: &mut App, request: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(request).await.unwrap()
}

async fn login(app: &mut App) -> String {
    let resp = call(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            r#"{"username":"admin","password":"admin123"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

fn post_body(slug: &str) -> String {
    serde_json::json!({
        "title": format!("Post {slug}"),
        "slug": slug,
        "excerpt": "excerpt",
        "content": "x".repeat(1000),
        "author": "admin",
        "category": "technology",
        "tags": ["Rust"],
    })
    .to_string()
}

// --- auth ---

#[tokio::test]
async fn login_returns_enveloped_token() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            r#"{"username":"admin","password":"admin123"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["expiresIn"], 86400);
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert!(body["data"]["token"].as_str().unwrap().starts_with("token_"));
}

#[tokio::test]
async fn wrong_password_returns_401_envelope() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            None,
            r#"{"username":"admin","password":"wrong"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 401);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn profile_requires_bearer_token() {
    let resp = app().oneshot(get("/api/auth/profile")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, json_request("GET", "/api/auth/profile", Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, json_request("POST", "/api/auth/logout", Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, json_request("GET", "/api/auth/profile", Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn change_password_checks_old_password() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            r#"{"oldPassword":"nope","newPassword":"next"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "old password is incorrect");
}

// --- posts ---

#[tokio::test]
async fn list_posts_empty_page() {
    let resp = app().oneshot(get("/api/posts")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["items"], serde_json::json!([]));
    assert_eq!(body["data"]["total"], 0);
    assert_eq!(body["data"]["pageSize"], 10);
}

#[tokio::test]
async fn create_post_requires_auth() {
    let resp = app()
        .oneshot(json_request("POST", "/api/posts", None, &post_body("a")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_post_returns_422() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    let resp = call(
        &mut app,
        json_request("POST", "/api/posts", Some(&token), r#"{"title":1}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_post_not_found_envelope() {
    let resp = app().oneshot(get("/api/posts/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "post not found");
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn duplicate_slug_returns_409() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body("dup"))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body("dup"))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn list_posts_filters_and_paginates() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    for slug in ["one", "two", "three"] {
        call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body(slug))).await;
    }

    let resp = call(&mut app, get("/api/posts?page=2&pageSize=2&sortBy=title&sortOrder=asc")).await;
    let body = body_json(resp).await;
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["totalPages"], 2);
    let items: Vec<Post> = serde_json::from_value(body["data"]["items"].clone()).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].slug, "two");

    let resp = call(&mut app, get("/api/posts?search=post%20thr")).await;
    let body = body_json(resp).await;
    assert_eq!(body["data"]["total"], 1);
}

// --- full post lifecycle ---

#[tokio::test]
async fn post_lifecycle() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    // create
    let resp = call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body("walk"))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Post = serde_json::from_value(body_json(resp).await["data"].clone()).unwrap();
    assert_eq!(created.read_time, 5);
    assert!(!created.featured);
    let id = created.id.clone();

    // get by slug
    let resp = call(&mut app, get("/api/posts/slug/walk")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Post = serde_json::from_value(body_json(resp).await["data"].clone()).unwrap();
    assert_eq!(fetched.id, id);

    // update, partial
    let resp = call(
        &mut app,
        json_request(
            "PUT",
            &format!("/api/posts/{id}"),
            Some(&token),
            r#"{"featured":true,"content":"short"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Post = serde_json::from_value(body_json(resp).await["data"].clone()).unwrap();
    assert_eq!(updated.title, "Post walk");
    assert!(updated.featured);
    assert_eq!(updated.read_time, 1);

    // delete
    let resp = call(&mut app, json_request("DELETE", &format!("/api/posts/{id}"), Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);

    // delete again
    let resp = call(&mut app, json_request("DELETE", &format!("/api/posts/{id}"), Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // get after delete
    let resp = call(&mut app, get(&format!("/api/posts/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- categories ---

#[tokio::test]
async fn category_lifecycle() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/api/categories",
            Some(&token),
            r#"{"name":"Rust","slug":"rust"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await["data"].clone();
    assert_eq!(created["count"], 0);
    assert_eq!(created["description"], "");

    let resp = call(&mut app, get("/api/categories/slug/rust")).await;
    assert_eq!(body_json(resp).await["data"]["name"], "Rust");

    let id = created["id"].as_str().unwrap();
    let resp = call(
        &mut app,
        json_request(
            "PUT",
            &format!("/api/categories/{id}"),
            Some(&token),
            r#"{"description":"Systems"}"#,
        ),
    )
    .await;
    assert_eq!(body_json(resp).await["data"]["description"], "Systems");

    let resp = call(&mut app, json_request("DELETE", &format!("/api/categories/{id}"), Some(&token), "")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = call(&mut app, get("/api/categories")).await;
    assert_eq!(body_json(resp).await["data"], serde_json::json!([]));
}

// --- upload & stats ---

fn multipart_request(token: &str, content_type: &str) -> Request<String> {
    let body = format!(
        "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\nContent-Type: {content_type}\r\n\r\nPNGDATA\r\n--XBOUNDARY--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/upload/image")
        .header(http::header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn upload_accepts_images_only() {
    let mut app = app().into_service();
    let token = login(&mut app).await;

    let resp = call(&mut app, multipart_request(&token, "image/png")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["filename"], "cover.png");
    assert_eq!(body["data"]["size"], 7);
    assert_eq!(body["data"]["mimeType"], "image/png");

    let resp = call(&mut app, multipart_request(&token, "text/plain")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_reflect_posts() {
    let mut app = app().into_service();
    let token = login(&mut app).await;
    call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body("a"))).await;
    call(&mut app, json_request("POST", "/api/posts", Some(&token), &post_body("b"))).await;

    let resp = call(&mut app, get("/api/stats/blog")).await;
    let body = body_json(resp).await;
    assert_eq!(body["data"]["totalPosts"], 2);
    assert_eq!(body["data"]["totalTags"], 1);
    assert_eq!(body["data"]["totalViews"], 300);
    assert_eq!(body["data"]["draftPosts"], 0);
}
