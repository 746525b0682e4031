use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
const TOKEN_TTL_SECS: u64 = 86_400;
const VIEWS_PER_POST: u64 = 150;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub published_at: String,
    pub updated_at: String,
    pub category: String,
    pub tags: Vec<String>,
    pub cover_image: String,
    pub read_time: u32,
    pub featured: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub featured: Option<bool>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePost {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub count: u32,
}

#[derive(Deserialize)]
pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Query string accepted by `GET /api/posts`. `tags` is comma separated.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Default)]
pub struct Db {
    posts: Vec<Post>,
    categories: Vec<Category>,
    password: String,
    tokens: HashSet<String>,
    next_id: u64,
}

impl Db {
    fn new() -> Self {
        Self {
            password: ADMIN_PASSWORD.to_string(),
            next_id: 1,
            ..Default::default()
        }
    }

    fn next_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }
}

pub type SharedDb = Arc<RwLock<Db>>;

pub fn app() -> Router {
    let db: SharedDb = Arc::new(RwLock::new(Db::new()));
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/profile", get(profile))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/posts/slug/{slug}", get(get_post_by_slug))
        .route("/api/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categories/slug/{slug}", get(get_category_by_slug))
        .route(
            "/api/categories/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/api/upload/image", post(upload_image))
        .route("/api/stats/blog", get(blog_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

fn read_time(content: &str) -> u32 {
    u32::try_from(content.chars().count().div_ceil(200)).unwrap_or(u32::MAX)
}

fn admin() -> Value {
    json!({
        "id": "1",
        "username": ADMIN_USERNAME,
        "email": "admin@luxuryblog.com",
        "role": "admin",
    })
}

fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data, "timestamp": now_timestamp() }))
}

fn ok_message(message: &str) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "timestamp": now_timestamp() }))
}

/// Error response in the shared `{success: false, ...}` shape.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn slug_taken(slug: &str) -> Self {
        Self::new(StatusCode::CONFLICT, format!("slug `{slug}` already exists"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "message": self.message,
            "code": self.status.as_u16(),
            "timestamp": now_timestamp(),
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn authorize(db: &Db, headers: &HeaderMap) -> Result<String, ApiError> {
    match bearer(headers) {
        Some(token) if db.tokens.contains(token) => Ok(token.to_string()),
        _ => Err(ApiError::new(StatusCode::UNAUTHORIZED, "authentication required")),
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(())
}

// --- auth ---

async fn login(State(db): State<SharedDb>, Json(input): Json<LoginRequest>) -> ApiResult {
    let mut db = db.write().await;
    if input.username != ADMIN_USERNAME || input.password != db.password {
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "invalid username or password"));
    }
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
    let token = format!("token_{}_{suffix}", Utc::now().timestamp_millis());
    db.tokens.insert(token.clone());
    info!(username = %input.username, "login");
    Ok(ok(json!({ "user": admin(), "token": token, "expiresIn": TOKEN_TTL_SECS })))
}

async fn logout(State(db): State<SharedDb>, headers: HeaderMap) -> ApiResult {
    let mut db = db.write().await;
    let token = authorize(&db, &headers)?;
    db.tokens.remove(&token);
    Ok(ok_message("logged out"))
}

async fn profile(State(db): State<SharedDb>, headers: HeaderMap) -> ApiResult {
    authorize(&*db.read().await, &headers)?;
    Ok(ok(admin()))
}

async fn change_password(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<ChangePasswordRequest>,
) -> ApiResult {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    if input.old_password != db.password {
        return Err(ApiError::bad_request("old password is incorrect"));
    }
    require_text("newPassword", &input.new_password)?;
    db.password = input.new_password;
    Ok(ok_message("password changed"))
}

// --- posts ---

fn matches(post: &Post, params: &ListParams) -> bool {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    if let Some(category) = non_empty(&params.category) {
        if post.category != category {
            return false;
        }
    }
    if let Some(search) = non_empty(&params.search) {
        let needle = search.to_lowercase();
        let hit = post.title.to_lowercase().contains(&needle)
            || post.excerpt.to_lowercase().contains(&needle)
            || post.tags.iter().any(|t| t.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    if let Some(featured) = params.featured {
        if post.featured != featured {
            return false;
        }
    }
    if let Some(author) = non_empty(&params.author) {
        if post.author != author {
            return false;
        }
    }
    if let Some(tags) = non_empty(&params.tags) {
        if !tags.split(',').any(|t| post.tags.iter().any(|p| p == t)) {
            return false;
        }
    }
    true
}

async fn list_posts(State(db): State<SharedDb>, Query(params): Query<ListParams>) -> ApiResult {
    let db = db.read().await;
    let mut posts: Vec<Post> = db.posts.iter().filter(|p| matches(p, &params)).cloned().collect();

    // Dates are `YYYY-MM-DD`, so string order is date order.
    let descending = params.sort_order.as_deref() != Some("asc");
    let sort_by = params.sort_by.as_deref().unwrap_or("publishedAt");
    posts.sort_by(|a, b| {
        let ord = match sort_by {
            "title" => a.title.cmp(&b.title),
            "updatedAt" => a.updated_at.cmp(&b.updated_at),
            _ => a.published_at.cmp(&b.published_at),
        };
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).max(1);
    let total = posts.len();
    let items: Vec<Post> = posts.into_iter().skip((page - 1) * page_size).take(page_size).collect();

    Ok(ok(json!({
        "items": items,
        "total": total,
        "page": page,
        "pageSize": page_size,
        "totalPages": total.div_ceil(page_size),
    })))
}

async fn get_post(State(db): State<SharedDb>, Path(id): Path<String>) -> ApiResult {
    let db = db.read().await;
    db.posts
        .iter()
        .find(|p| p.id == id)
        .map(ok)
        .ok_or_else(|| ApiError::not_found("post"))
}

async fn get_post_by_slug(State(db): State<SharedDb>, Path(slug): Path<String>) -> ApiResult {
    let db = db.read().await;
    db.posts
        .iter()
        .find(|p| p.slug == slug)
        .map(ok)
        .ok_or_else(|| ApiError::not_found("post"))
}

async fn create_post(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    require_text("title", &input.title)?;
    require_text("slug", &input.slug)?;
    if db.posts.iter().any(|p| p.slug == input.slug) {
        return Err(ApiError::slug_taken(&input.slug));
    }

    let today = today();
    let post = Post {
        id: db.next_id(),
        read_time: read_time(&input.content),
        title: input.title,
        slug: input.slug,
        excerpt: input.excerpt,
        content: input.content,
        author: input.author,
        published_at: today.clone(),
        updated_at: today,
        category: input.category,
        tags: input.tags,
        cover_image: input.cover_image.unwrap_or_default(),
        featured: input.featured.unwrap_or(false),
    };
    db.posts.insert(0, post.clone());
    debug!(id = %post.id, "created post");
    Ok((StatusCode::CREATED, ok(post)))
}

async fn update_post(
    State(db): State<SharedDb>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdatePost>,
) -> ApiResult {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    if let Some(slug) = &input.slug {
        if db.posts.iter().any(|p| p.id != id && &p.slug == slug) {
            return Err(ApiError::slug_taken(slug));
        }
    }
    let post = db
        .posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| ApiError::not_found("post"))?;

    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(slug) = input.slug {
        post.slug = slug;
    }
    if let Some(excerpt) = input.excerpt {
        post.excerpt = excerpt;
    }
    if let Some(content) = input.content {
        post.read_time = read_time(&content);
        post.content = content;
    }
    if let Some(author) = input.author {
        post.author = author;
    }
    if let Some(category) = input.category {
        post.category = category;
    }
    if let Some(tags) = input.tags {
        post.tags = tags;
    }
    if let Some(cover_image) = input.cover_image {
        post.cover_image = cover_image;
    }
    if let Some(featured) = input.featured {
        post.featured = featured;
    }
    post.updated_at = today();
    Ok(ok(post.clone()))
}

async fn delete_post(
    State(db): State<SharedDb>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    let index = db
        .posts
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| ApiError::not_found("post"))?;
    db.posts.remove(index);
    Ok(ok_message("post deleted"))
}

// --- categories ---

async fn list_categories(State(db): State<SharedDb>) -> ApiResult {
    Ok(ok(&db.read().await.categories))
}

async fn get_category(State(db): State<SharedDb>, Path(id): Path<String>) -> ApiResult {
    let db = db.read().await;
    db.categories
        .iter()
        .find(|c| c.id == id)
        .map(ok)
        .ok_or_else(|| ApiError::not_found("category"))
}

async fn get_category_by_slug(State(db): State<SharedDb>, Path(slug): Path<String>) -> ApiResult {
    let db = db.read().await;
    db.categories
        .iter()
        .find(|c| c.slug == slug)
        .map(ok)
        .ok_or_else(|| ApiError::not_found("category"))
}

async fn create_category(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    Json(input): Json<CreateCategory>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    require_text("name", &input.name)?;
    require_text("slug", &input.slug)?;
    if db.categories.iter().any(|c| c.slug == input.slug) {
        return Err(ApiError::slug_taken(&input.slug));
    }
    let category = Category {
        id: db.next_id(),
        name: input.name,
        slug: input.slug,
        description: input.description.unwrap_or_default(),
        count: 0,
    };
    db.categories.push(category.clone());
    Ok((StatusCode::CREATED, ok(category)))
}

async fn update_category(
    State(db): State<SharedDb>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<UpdateCategory>,
) -> ApiResult {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    if let Some(slug) = &input.slug {
        if db.categories.iter().any(|c| c.id != id && &c.slug == slug) {
            return Err(ApiError::slug_taken(slug));
        }
    }
    let category = db
        .categories
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found("category"))?;
    if let Some(name) = input.name {
        category.name = name;
    }
    if let Some(slug) = input.slug {
        category.slug = slug;
    }
    if let Some(description) = input.description {
        category.description = description;
    }
    Ok(ok(category.clone()))
}

async fn delete_category(
    State(db): State<SharedDb>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let mut db = db.write().await;
    authorize(&db, &headers)?;
    let index = db
        .categories
        .iter()
        .position(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found("category"))?;
    db.categories.remove(index);
    Ok(ok_message("category deleted"))
}

// --- upload & stats ---

async fn upload_image(
    State(db): State<SharedDb>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult {
    authorize(&*db.read().await, &headers)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field.content_type().unwrap_or("application/octet-stream").to_string();
        if !mime_type.starts_with("image/") {
            return Err(ApiError::bad_request(format!(
                "only images can be uploaded, got {mime_type}"
            )));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;

        return Ok(ok(json!({
            "url": format!("/uploads/{}-{filename}", Uuid::new_v4().simple()),
            "filename": filename,
            "size": bytes.len(),
            "mimeType": mime_type,
        })));
    }
    Err(ApiError::bad_request("missing `file` field"))
}

async fn blog_stats(State(db): State<SharedDb>) -> ApiResult {
    let db = db.read().await;
    let tags: HashSet<&str> = db
        .posts
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .collect();
    Ok(ok(json!({
        "totalPosts": db.posts.len(),
        "totalCategories": db.categories.len(),
        "totalTags": tags.len(),
        "totalViews": db.posts.len() as u64 * VIEWS_PER_POST,
        "featuredPosts": db.posts.iter().filter(|p| p.featured).count(),
        "publishedPosts": db.posts.len(),
        "draftPosts": 0,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_post_optional_fields_default() {
        let input: CreatePost = serde_json::from_str(
            r#"{"title":"T","slug":"t","excerpt":"e","content":"c","author":"a","category":"x"}"#,
        )
        .unwrap();
        assert!(input.tags.is_empty());
        assert!(input.cover_image.is_none());
        assert!(input.featured.is_none());
    }

    #[test]
    fn create_post_rejects_missing_title() {
        let result: Result<CreatePost, _> = serde_json::from_str(r#"{"slug":"t"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn post_serializes_camel_case() {
        let post = Post {
            id: "1".into(),
            title: "T".into(),
            slug: "t".into(),
            excerpt: String::new(),
            content: String::new(),
            author: "a".into(),
            published_at: "2024-01-15".into(),
            updated_at: "2024-01-15".into(),
            category: "x".into(),
            tags: vec![],
            cover_image: String::new(),
            read_time: 0,
            featured: false,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["publishedAt"], "2024-01-15");
        assert_eq!(json["readTime"], 0);
    }

    #[test]
    fn read_time_rounds_up() {
        assert_eq!(read_time(&"a".repeat(1000)), 5);
        assert_eq!(read_time(&"a".repeat(201)), 2);
        assert_eq!(read_time(""), 0);
        assert_eq!(read_time("é".repeat(200).as_str()), 1);
    }

    #[test]
    fn error_renders_envelope() {
        let response = ApiError::not_found("post").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn ids_increase() {
        let mut db = Db::new();
        assert_eq!(db.next_id(), "1");
        assert_eq!(db.next_id(), "2");
    }

    #[test]
    fn tag_filter_matches_any_listed_tag() {
        let post = Post {
            id: "1".into(),
            title: "T".into(),
            slug: "t".into(),
            excerpt: String::new(),
            content: String::new(),
            author: "a".into(),
            published_at: "2024-01-15".into(),
            updated_at: "2024-01-15".into(),
            category: "x".into(),
            tags: vec!["Rust".into()],
            cover_image: String::new(),
            read_time: 0,
            featured: false,
        };
        let params = ListParams {
            tags: Some("Go,Rust".into()),
            ..Default::default()
        };
        assert!(matches(&post, &params));
        let params = ListParams {
            tags: Some("Go".into()),
            ..Default::default()
        };
        assert!(!matches(&post, &params));
    }
}
