//! Request builder and response parser for the blog admin API.
//!
//! # Design
//! `BlogApiClient` holds the base URL, default headers and default timeout,
//! and carries no mutable state between calls. Each endpoint has a `build_*`
//! method producing an `HttpRequest`; every response goes through the single
//! `parse` method, which turns status, content type and body into an
//! `Envelope<T>` or an `ApiError`. Executing the round-trip, and attaching
//! the bearer token, is the job of `HttpClient` in `transport.rs`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::envelope::{normalize, Envelope};
use crate::error::{ApiError, SetupError};
use crate::http::{reason_phrase, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::types::{
    ChangePasswordRequest, CreateCategory, CreatePost, ImageUpload, LoginRequest, PostQuery,
    UpdateCategory, UpdatePost,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API paths.
pub mod endpoints {
    pub const LOGIN: &str = "/api/auth/login";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const PROFILE: &str = "/api/auth/profile";
    pub const CHANGE_PASSWORD: &str = "/api/auth/change-password";
    pub const POSTS: &str = "/api/posts";
    pub const CATEGORIES: &str = "/api/categories";
    pub const UPLOAD_IMAGE: &str = "/api/upload/image";
    pub const BLOG_STATS: &str = "/api/stats/blog";
    /// Segment between a collection and a slug, as in `/api/posts/slug/:slug`.
    pub const SLUG: &str = "slug";
}

/// Per-call request description handed to `BlogApiClient::build`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get() -> Self {
        Self::new(HttpMethod::Get)
    }

    pub fn post() -> Self {
        Self::new(HttpMethod::Post)
    }

    pub fn put() -> Self {
        Self::new(HttpMethod::Put)
    }

    pub fn patch() -> Self {
        Self::new(HttpMethod::Patch)
    }

    pub fn delete() -> Self {
        Self::new(HttpMethod::Delete)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Add every non-null field of `value` as a query parameter.
    pub fn params<T: Serialize>(mut self, value: &T) -> Result<Self, ApiError> {
        self.params.extend(query_pairs(value)?);
        Ok(self)
    }

    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, ApiError> {
        let body =
            serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.body = Some(RequestBody::Json(body));
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Flatten a serializable struct into query pairs.
///
/// Null fields are skipped, lists are joined with commas, scalars use their
/// textual form.
pub fn query_pairs<T: Serialize>(value: &T) -> Result<Vec<(String, String)>, ApiError> {
    let value =
        serde_json::to_value(value).map_err(|e| ApiError::Serialization(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(ApiError::Serialization(
            "query parameters must serialize to an object".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, param_text(&v)))
        .collect())
}

fn param_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(param_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Stateless client for the blog admin API.
#[derive(Debug, Clone)]
pub struct BlogApiClient {
    base_url: Url,
    default_headers: Vec<(String, String)>,
    timeout: Duration,
}

impl BlogApiClient {
    pub fn new(base_url: &str) -> Result<Self, SetupError> {
        let base_url =
            Url::parse(base_url).map_err(|e| SetupError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(SetupError::InvalidUrl(format!(
                "{base_url}: scheme must be http or https"
            )));
        }
        Ok(Self {
            base_url,
            default_headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        merge_header(&mut self.default_headers, name.into(), value.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve `endpoint` against the base URL and assemble the request.
    ///
    /// The endpoint is resolved with standard URL rules, so an absolute path
    /// replaces any path on the base URL. Bodies are dropped from GET requests,
    /// and multipart bodies drop the content type so the transport can add
    /// its boundary.
    pub fn build(&self, endpoint: &str, options: RequestOptions) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoint, &[], options)
    }

    /// Like `build`, appending `segments` to the endpoint path. Each segment
    /// is percent-encoded as a single path segment, so `/`, `?` and `#` in an
    /// id or slug never leave it.
    pub fn build_at(
        &self,
        endpoint: &str,
        segments: &[&str],
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ApiError::Serialization(format!("invalid endpoint {endpoint}: {e}")))?;
        if !segments.is_empty() {
            if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
                return Err(ApiError::validation(format!("invalid path segment `{bad}`")));
            }
            url.path_segments_mut()
                .map_err(|()| ApiError::Serialization(format!("{endpoint} cannot take path segments")))?
                .extend(segments);
        }
        if !options.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &options.params {
                pairs.append_pair(k, v);
            }
        }

        let mut headers = self.default_headers.clone();
        for (k, v) in options.headers {
            merge_header(&mut headers, k, v);
        }

        let body = match options.method {
            HttpMethod::Get => None,
            _ => options.body,
        };
        if matches!(body, Some(RequestBody::Multipart(_))) {
            headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        }

        Ok(HttpRequest {
            method: options.method,
            url: url.into(),
            headers,
            body,
            timeout: options.timeout,
        })
    }

    /// Turn a response into an envelope.
    ///
    /// JSON content types are parsed as JSON, anything else as text. Non-2xx
    /// statuses always fail, taking the message from the body when it has
    /// one. 2xx bodies are normalized (see `envelope::normalize`) and the
    /// payload is decoded into `T`.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Envelope<T>, ApiError> {
        let body = if response.body.trim().is_empty() {
            Value::Null
        } else if response.is_json() {
            match serde_json::from_str(&response.body) {
                Ok(value) => value,
                Err(_) if !response.is_success() => Value::String(response.body.clone()),
                Err(e) => return Err(ApiError::Deserialization(e.to_string())),
            }
        } else {
            Value::String(response.body.clone())
        };

        if !response.is_success() {
            let status = response.status;
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {status}: {}", reason_phrase(status)));
            warn!(status, message = %message, "request failed");
            let details = (!body.is_null()).then_some(body);
            return Err(ApiError::from_status(status, message, details));
        }

        normalize(body)?.decode()
    }

    pub fn build_login(&self, input: &LoginRequest) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::LOGIN, RequestOptions::post().json(input)?)
    }

    pub fn build_logout(&self) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::LOGOUT, RequestOptions::post())
    }

    pub fn build_profile(&self) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::PROFILE, RequestOptions::get())
    }

    pub fn build_change_password(&self, input: &ChangePasswordRequest) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::CHANGE_PASSWORD, RequestOptions::post().json(input)?)
    }

    pub fn build_list_posts(&self, query: &PostQuery) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::POSTS, RequestOptions::get().params(query)?)
    }

    pub fn build_get_post(&self, id: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::POSTS, &[id], RequestOptions::get())
    }

    pub fn build_get_post_by_slug(&self, slug: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::POSTS, &[endpoints::SLUG, slug], RequestOptions::get())
    }

    pub fn build_create_post(&self, input: &CreatePost) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::POSTS, RequestOptions::post().json(input)?)
    }

    pub fn build_update_post(&self, id: &str, input: &UpdatePost) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::POSTS, &[id], RequestOptions::put().json(input)?)
    }

    pub fn build_delete_post(&self, id: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::POSTS, &[id], RequestOptions::delete())
    }

    pub fn build_list_categories(&self) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::CATEGORIES, RequestOptions::get())
    }

    pub fn build_get_category(&self, id: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::CATEGORIES, &[id], RequestOptions::get())
    }

    pub fn build_get_category_by_slug(&self, slug: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::CATEGORIES, &[endpoints::SLUG, slug], RequestOptions::get())
    }

    pub fn build_create_category(&self, input: &CreateCategory) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::CATEGORIES, RequestOptions::post().json(input)?)
    }

    pub fn build_update_category(&self, id: &str, input: &UpdateCategory) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::CATEGORIES, &[id], RequestOptions::put().json(input)?)
    }

    pub fn build_delete_category(&self, id: &str) -> Result<HttpRequest, ApiError> {
        self.build_at(endpoints::CATEGORIES, &[id], RequestOptions::delete())
    }

    pub fn build_upload_image(&self, image: &ImageUpload) -> Result<HttpRequest, ApiError> {
        let form = MultipartForm::new().file(
            "file",
            image.file_name.clone(),
            image.mime_type.clone(),
            image.bytes.clone(),
        );
        self.build(endpoints::UPLOAD_IMAGE, RequestOptions::post().multipart(form))
    }

    pub fn build_blog_stats(&self) -> Result<HttpRequest, ApiError> {
        self.build(endpoints::BLOG_STATS, RequestOptions::get())
    }
}

/// Insert or replace a header, comparing names case-insensitively.
fn merge_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
    headers.push((name, value));
}
