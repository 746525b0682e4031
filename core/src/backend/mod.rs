//! Data access for every blog admin operation.
//!
//! # Design
//! `BlogBackend` is the one interface the stores and the CLI talk to. Two
//! implementations exist: `RemoteBackend` forwards each call to the HTTP API,
//! `MockBackend` answers from a `KeyValueStore`. The choice is made once,
//! when the application context is built; no operation branches on the mode.

mod fixtures;
mod mock;
mod remote;

pub use fixtures::{default_categories, default_posts, demo_admin, DEMO_PASSWORD, DEMO_USERNAME};
pub use mock::{MockBackend, MockLatency};
pub use remote::RemoteBackend;

use async_trait::async_trait;

use crate::envelope::{Envelope, Paginated};
use crate::error::Result;
use crate::types::{
    BlogStats, Category, ChangePasswordRequest, CreateCategory, CreatePost, ImageUpload,
    LoginRequest, LoginResponse, Post, PostQuery, UpdateCategory, UpdatePost, UploadResponse, User,
};

#[async_trait]
pub trait BlogBackend: Send + Sync {
    /// Short label for logs (`"mock"` or `"remote"`).
    fn mode(&self) -> &'static str;

    /// Attach (or clear) the bearer token used for subsequent calls.
    async fn set_auth_token(&self, _token: Option<String>) {}

    async fn login(&self, request: &LoginRequest) -> Result<Envelope<LoginResponse>>;
    async fn logout(&self) -> Result<Envelope<()>>;
    async fn profile(&self) -> Result<Envelope<User>>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Envelope<()>>;

    async fn list_posts(&self, query: &PostQuery) -> Result<Envelope<Paginated<Post>>>;
    async fn get_post(&self, id: &str) -> Result<Envelope<Post>>;
    async fn get_post_by_slug(&self, slug: &str) -> Result<Envelope<Post>>;
    async fn create_post(&self, input: &CreatePost) -> Result<Envelope<Post>>;
    async fn update_post(&self, id: &str, input: &UpdatePost) -> Result<Envelope<Post>>;
    async fn delete_post(&self, id: &str) -> Result<Envelope<()>>;

    async fn list_categories(&self) -> Result<Envelope<Vec<Category>>>;
    async fn get_category(&self, id: &str) -> Result<Envelope<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Envelope<Category>>;
    async fn create_category(&self, input: &CreateCategory) -> Result<Envelope<Category>>;
    async fn update_category(&self, id: &str, input: &UpdateCategory) -> Result<Envelope<Category>>;
    async fn delete_category(&self, id: &str) -> Result<Envelope<()>>;

    async fn upload_image(&self, image: &ImageUpload) -> Result<Envelope<UploadResponse>>;
    async fn blog_stats(&self) -> Result<Envelope<BlogStats>>;
}
