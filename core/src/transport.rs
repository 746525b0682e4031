//! Executes `HttpRequest`s over the network.
//!
//! `Transport` is the seam between the pure request/response code in
//! `client.rs` and real I/O. `HttpClient` adds the stateful parts: the bearer
//! token and the per-call timeout. The timeout wraps the transport future in
//! `tokio::time::timeout`, so an expired call is dropped mid-flight and
//! reported as `ApiError::Timeout`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::client::BlogApiClient;
use crate::envelope::Envelope;
use crate::error::{ApiError, SetupError};
use crate::http::{FormPart, HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the round-trip. Non-2xx statuses are returned as data; only
    /// transport-level failures are errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, SetupError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("blog-admin/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SetupError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn to_reqwest_form(form: MultipartForm) -> Result<Form, ApiError> {
    let mut out = Form::new();
    for part in form.parts {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File {
                name,
                file_name,
                mime_type,
                bytes,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| ApiError::Serialization(format!("invalid mime type {mime_type}: {e}")))?;
                out.part(name, part)
            }
        };
    }
    Ok(out)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut builder = self
            .http
            .request(to_reqwest_method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(text)) => builder.body(text),
            Some(RequestBody::Multipart(form)) => builder.multipart(to_reqwest_form(form)?),
            None => builder,
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Request executor: builds with `BlogApiClient`, attaches the bearer token,
/// races the transport against the timeout and parses the result.
pub struct HttpClient {
    api: BlogApiClient,
    transport: Arc<dyn Transport>,
    token: RwLock<Option<String>>,
}

impl HttpClient {
    pub fn new(api: BlogApiClient, transport: Arc<dyn Transport>) -> Self {
        Self {
            api,
            transport,
            token: RwLock::new(None),
        }
    }

    pub fn api(&self) -> &BlogApiClient {
        &self.api
    }

    pub async fn set_auth_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Execute `request` and decode the envelope payload as `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<Envelope<T>, ApiError> {
        let request = match self.token.read().await.as_deref() {
            Some(token) => request.with_bearer(token),
            None => request,
        };
        let timeout = request.timeout.unwrap_or_else(|| self.api.timeout());
        let method = request.method;
        let url = request.url.clone();

        debug!(%method, url = %url, timeout_ms = timeout.as_millis() as u64, "sending request");

        let response = match tokio::time::timeout(timeout, self.transport.execute(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(%method, url = %url, "request timed out");
                return Err(ApiError::Timeout);
            }
        };

        debug!(%method, url = %url, status = response.status, "received response");
        self.api.parse(response)
    }

    /// Convenience for callers that want a different deadline for one call.
    pub async fn send_with_timeout<T: DeserializeOwned>(
        &self,
        mut request: HttpRequest,
        timeout: Duration,
    ) -> Result<Envelope<T>, ApiError> {
        request.timeout = Some(timeout);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requests and answers with a canned response after `delay`.
    struct ScriptedTransport {
        delay: Duration,
        response: HttpResponse,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(delay: Duration, status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                delay,
                response: HttpResponse {
                    status,
                    headers: vec![("content-type".into(), "application/json".into())],
                    body: body.to_string(),
                },
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            Ok(self.response.clone())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::network("connection refused"))
        }
    }

    fn api() -> BlogApiClient {
        BlogApiClient::new("http://localhost:8080").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn slow_transport_times_out_with_408() {
        let transport = ScriptedTransport::new(Duration::from_secs(30), 200, "{}");
        let client = HttpClient::new(api().with_timeout(Duration::from_secs(10)), transport);

        let err = client
            .send::<serde_json::Value>(client.api().build_blog_stats().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
        assert_eq!(err.envelope().code, 408);
        assert_eq!(err.envelope().message, "request timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn per_call_timeout_overrides_default() {
        let transport = ScriptedTransport::new(Duration::from_secs(2), 200, r#"{"ok":true}"#);
        let client = HttpClient::new(api(), transport);

        let err = client
            .send_with_timeout::<serde_json::Value>(
                client.api().build_blog_stats().unwrap(),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Timeout));

        let env = client
            .send::<serde_json::Value>(client.api().build_blog_stats().unwrap())
            .await
            .unwrap();
        assert_eq!(env.data.unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn bearer_token_is_attached_once_set() {
        let transport = ScriptedTransport::new(Duration::ZERO, 200, r#"{"success":true}"#);
        let client = HttpClient::new(api(), transport.clone());

        client.send::<()>(client.api().build_profile().unwrap()).await.unwrap();
        client.set_auth_token(Some("token_1_abc".into())).await;
        client.send::<()>(client.api().build_profile().unwrap()).await.unwrap();
        client.set_auth_token(None).await;
        client.send::<()>(client.api().build_profile().unwrap()).await.unwrap();

        let seen = transport.seen.lock().unwrap();
        assert!(seen[0].header("authorization").is_none());
        assert_eq!(seen[1].header("authorization"), Some("Bearer token_1_abc"));
        assert!(seen[2].header("authorization").is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        let client = HttpClient::new(api(), Arc::new(FailingTransport));
        let err = client
            .send::<()>(client.api().build_logout().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
        assert_eq!(err.code(), 0);
    }

    #[tokio::test]
    async fn error_status_is_raised() {
        let transport = ScriptedTransport::new(
            Duration::ZERO,
            401,
            r#"{"success":false,"message":"invalid username or password","code":401}"#,
        );
        let client = HttpClient::new(api(), transport);
        let err = client
            .send::<()>(client.api().build_profile().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized { .. }));
    }
}
