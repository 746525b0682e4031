//! Client core for the blog admin API.
//!
//! # Overview
//! Every blog admin operation (session, posts, categories, image upload,
//! statistics) is reachable through the `BlogBackend` trait. The remote
//! implementation talks HTTP; the mock implementation answers from local
//! key-value storage so the whole application runs without a server.
//!
//! # Design
//! - `BlogApiClient` is sans-IO: `build_*` methods produce an `HttpRequest`
//!   and `parse` consumes an `HttpResponse`. Anything that can execute a
//!   request can drive it; `transport::HttpClient` does so over `reqwest`.
//! - Every operation yields an `Envelope<T>` on success and an `ApiError` on
//!   failure. `ApiError::envelope` turns any error into the wire-level error
//!   envelope.
//! - Backend selection happens once, in `AppContext::build`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod backend;
pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod http;
pub mod query;
pub mod session;
pub mod storage;
pub mod store;
pub mod transport;
pub mod types;

pub use backend::{BlogBackend, MockBackend, MockLatency, RemoteBackend};
pub use client::BlogApiClient;
pub use config::{AppConfig, DeployTarget};
pub use context::AppContext;
pub use envelope::{Envelope, ErrorEnvelope, Paginated};
pub use error::{ApiError, SetupError};
pub use guard::{Navigation, NavigationGuard};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{ActionResult, AuthStore, BlogStore};
pub use transport::{HttpClient, ReqwestTransport, Transport};
pub use types::{
    BlogStats, Category, CreateCategory, CreatePost, ImageUpload, LoginRequest, LoginResponse, Post,
    PostQuery, Role, UpdateCategory, UpdatePost, UploadResponse, User,
};
