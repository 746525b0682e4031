use async_trait::async_trait;

use super::BlogBackend;
use crate::envelope::{Envelope, Paginated};
use crate::error::Result;
use crate::transport::HttpClient;
use crate::types::{
    BlogStats, Category, ChangePasswordRequest, CreateCategory, CreatePost, ImageUpload,
    LoginRequest, LoginResponse, Post, PostQuery, UpdateCategory, UpdatePost, UploadResponse, User,
};

/// `BlogBackend` that talks to the HTTP API.
pub struct RemoteBackend {
    http: HttpClient,
}

impl RemoteBackend {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[async_trait]
impl BlogBackend for RemoteBackend {
    fn mode(&self) -> &'static str {
        "remote"
    }

    async fn set_auth_token(&self, token: Option<String>) {
        self.http.set_auth_token(token).await;
    }

    async fn login(&self, request: &LoginRequest) -> Result<Envelope<LoginResponse>> {
        self.http.send(self.http.api().build_login(request)?).await
    }

    async fn logout(&self) -> Result<Envelope<()>> {
        self.http.send(self.http.api().build_logout()?).await
    }

    async fn profile(&self) -> Result<Envelope<User>> {
        self.http.send(self.http.api().build_profile()?).await
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Envelope<()>> {
        self.http.send(self.http.api().build_change_password(request)?).await
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Envelope<Paginated<Post>>> {
        self.http.send(self.http.api().build_list_posts(query)?).await
    }

    async fn get_post(&self, id: &str) -> Result<Envelope<Post>> {
        self.http.send(self.http.api().build_get_post(id)?).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Envelope<Post>> {
        self.http.send(self.http.api().build_get_post_by_slug(slug)?).await
    }

    async fn create_post(&self, input: &CreatePost) -> Result<Envelope<Post>> {
        self.http.send(self.http.api().build_create_post(input)?).await
    }

    async fn update_post(&self, id: &str, input: &UpdatePost) -> Result<Envelope<Post>> {
        self.http.send(self.http.api().build_update_post(id, input)?).await
    }

    async fn delete_post(&self, id: &str) -> Result<Envelope<()>> {
        self.http.send(self.http.api().build_delete_post(id)?).await
    }

    async fn list_categories(&self) -> Result<Envelope<Vec<Category>>> {
        self.http.send(self.http.api().build_list_categories()?).await
    }

    async fn get_category(&self, id: &str) -> Result<Envelope<Category>> {
        self.http.send(self.http.api().build_get_category(id)?).await
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Envelope<Category>> {
        self.http.send(self.http.api().build_get_category_by_slug(slug)?).await
    }

    async fn create_category(&self, input: &CreateCategory) -> Result<Envelope<Category>> {
        self.http.send(self.http.api().build_create_category(input)?).await
    }

    async fn update_category(&self, id: &str, input: &UpdateCategory) -> Result<Envelope<Category>> {
        self.http.send(self.http.api().build_update_category(id, input)?).await
    }

    async fn delete_category(&self, id: &str) -> Result<Envelope<()>> {
        self.http.send(self.http.api().build_delete_category(id)?).await
    }

    async fn upload_image(&self, image: &ImageUpload) -> Result<Envelope<UploadResponse>> {
        self.http.send(self.http.api().build_upload_image(image)?).await
    }

    async fn blog_stats(&self) -> Result<Envelope<BlogStats>> {
        self.http.send(self.http.api().build_blog_stats()?).await
    }
}
