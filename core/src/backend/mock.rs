//! `BlogBackend` that simulates the API on top of a `KeyValueStore`.
//!
//! Each collection lives under one storage key as a JSON list. Reads load the
//! whole list; writes load, mutate and store it back while holding
//! `write_lock`, so two writes through the same backend cannot lose each
//! other's changes. Separate processes sharing a file still race, and the
//! last one to write wins.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::fixtures::{default_categories, default_posts, demo_admin, DEMO_PASSWORD, DEMO_USERNAME};
use super::BlogBackend;
use crate::clock::Clock;
use crate::envelope::{Envelope, Paginated};
use crate::error::{ApiError, Result};
use crate::query::{read_time, run_query};
use crate::session::{issue_token, TOKEN_TTL_SECS};
use crate::storage::{keys, read_list, write_json, KeyValueStore};
use crate::types::{
    BlogStats, Category, ChangePasswordRequest, CreateCategory, CreatePost, ImageUpload,
    LoginRequest, LoginResponse, Post, PostQuery, UpdateCategory, UpdatePost, UploadResponse, User,
};

const POST_NOT_FOUND: &str = "post not found";
const CATEGORY_NOT_FOUND: &str = "category not found";
/// Placeholder views per post reported by `blog_stats`.
const VIEWS_PER_POST: u64 = 150;

/// Artificial delays applied before answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockLatency {
    /// Login and change-password.
    pub auth: Duration,
    pub upload: Duration,
}

impl MockLatency {
    pub fn none() -> Self {
        Self::default()
    }

    /// Delays that feel like a real server.
    pub fn realistic() -> Self {
        Self {
            auth: Duration::from_secs(1),
            upload: Duration::from_secs(2),
        }
    }
}

pub struct MockBackend {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    latency: MockLatency,
    write_lock: Mutex<()>,
}

impl MockBackend {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            latency: MockLatency::none(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_latency(mut self, latency: MockLatency) -> Self {
        self.latency = latency;
        self
    }

    /// Write the demo posts and categories under any key that is still empty.
    /// Returns whether anything was written.
    pub async fn seed_defaults(&self) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut seeded = false;
        if self.store.get(keys::POSTS)?.is_none() {
            write_json(self.store.as_ref(), keys::POSTS, &default_posts())?;
            seeded = true;
        }
        if self.store.get(keys::CATEGORIES)?.is_none() {
            write_json(self.store.as_ref(), keys::CATEGORIES, &default_categories())?;
            seeded = true;
        }
        if seeded {
            info!("seeded mock storage with demo content");
        }
        Ok(seeded)
    }

    /// Replace both collections with the demo content.
    pub async fn reset_to_default(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        write_json(self.store.as_ref(), keys::POSTS, &default_posts())?;
        write_json(self.store.as_ref(), keys::CATEGORIES, &default_categories())?;
        info!("reset mock storage to demo content");
        Ok(())
    }

    /// Remove both collections.
    pub async fn clear_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(keys::POSTS)?;
        self.store.remove(keys::CATEGORIES)?;
        info!("cleared mock storage");
        Ok(())
    }

    fn load_posts(&self) -> Result<Vec<Post>> {
        Ok(read_list(self.store.as_ref(), keys::POSTS)?)
    }

    fn save_posts(&self, posts: &[Post]) -> Result<()> {
        write_json(self.store.as_ref(), keys::POSTS, posts)?;
        debug!(count = posts.len(), "stored posts");
        Ok(())
    }

    fn load_categories(&self) -> Result<Vec<Category>> {
        Ok(read_list(self.store.as_ref(), keys::CATEGORIES)?)
    }

    fn save_categories(&self, categories: &[Category]) -> Result<()> {
        write_json(self.store.as_ref(), keys::CATEGORIES, categories)?;
        debug!(count = categories.len(), "stored categories");
        Ok(())
    }

    /// Millisecond timestamp, bumped past every numeric id already in use.
    fn next_id<'a>(&self, existing: impl Iterator<Item = &'a str>) -> String {
        let floor = existing
            .filter_map(|id| id.parse::<i64>().ok())
            .max()
            .map_or(i64::MIN, |max| max.saturating_add(1));
        self.clock.now_millis().max(floor).to_string()
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

fn slug_taken<'a>(mut slugs: impl Iterator<Item = &'a str>, slug: &str) -> Result<()> {
    if slugs.any(|s| s == slug) {
        return Err(ApiError::conflict(format!("slug `{slug}` already exists")));
    }
    Ok(())
}

#[async_trait]
impl BlogBackend for MockBackend {
    fn mode(&self) -> &'static str {
        "mock"
    }

    async fn login(&self, request: &LoginRequest) -> Result<Envelope<LoginResponse>> {
        self.pause(self.latency.auth).await;

        if request.username != DEMO_USERNAME || request.password != DEMO_PASSWORD {
            return Err(ApiError::unauthorized("invalid username or password"));
        }

        let token = issue_token(self.clock.now());
        info!(username = %request.username, "mock login succeeded");
        Ok(Envelope::ok(LoginResponse {
            user: demo_admin(),
            token,
            refresh_token: None,
            expires_in: TOKEN_TTL_SECS,
        }))
    }

    async fn logout(&self) -> Result<Envelope<()>> {
        Ok(Envelope::empty())
    }

    async fn profile(&self) -> Result<Envelope<User>> {
        Ok(Envelope::ok(demo_admin()))
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Envelope<()>> {
        self.pause(self.latency.auth).await;

        if request.old_password != DEMO_PASSWORD {
            return Err(ApiError::validation("old password is incorrect"));
        }
        Ok(Envelope::empty())
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<Envelope<Paginated<Post>>> {
        let posts = self.load_posts()?;
        Ok(Envelope::ok(run_query(posts, query)))
    }

    async fn get_post(&self, id: &str) -> Result<Envelope<Post>> {
        self.load_posts()?
            .into_iter()
            .find(|p| p.id == id)
            .map(Envelope::ok)
            .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Envelope<Post>> {
        self.load_posts()?
            .into_iter()
            .find(|p| p.slug == slug)
            .map(Envelope::ok)
            .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))
    }

    async fn create_post(&self, input: &CreatePost) -> Result<Envelope<Post>> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load_posts()?;
        slug_taken(posts.iter().map(|p| p.slug.as_str()), &input.slug)?;

        let today = self.clock.today();
        let post = Post {
            id: self.next_id(posts.iter().map(|p| p.id.as_str())),
            title: input.title.clone(),
            slug: input.slug.clone(),
            excerpt: input.excerpt.clone(),
            content: input.content.clone(),
            author: input.author.clone(),
            published_at: today.clone(),
            updated_at: today,
            category: input.category.clone(),
            tags: input.tags.clone(),
            cover_image: input.cover_image.clone().unwrap_or_default(),
            read_time: read_time(&input.content),
            featured: input.featured.unwrap_or(false),
        };
        posts.insert(0, post.clone());
        self.save_posts(&posts)?;

        info!(id = %post.id, slug = %post.slug, "created post");
        Ok(Envelope::ok(post))
    }

    async fn update_post(&self, id: &str, input: &UpdatePost) -> Result<Envelope<Post>> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load_posts()?;
        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;

        if let Some(slug) = &input.slug {
            slug_taken(
                posts.iter().filter(|p| p.id != id).map(|p| p.slug.as_str()),
                slug,
            )?;
        }

        let today = self.clock.today();
        let post = &mut posts[index];
        if let Some(title) = &input.title {
            post.title = title.clone();
        }
        if let Some(slug) = &input.slug {
            post.slug = slug.clone();
        }
        if let Some(excerpt) = &input.excerpt {
            post.excerpt = excerpt.clone();
        }
        if let Some(content) = &input.content {
            post.content = content.clone();
            post.read_time = read_time(content);
        }
        if let Some(author) = &input.author {
            post.author = author.clone();
        }
        if let Some(category) = &input.category {
            post.category = category.clone();
        }
        if let Some(tags) = &input.tags {
            post.tags = tags.clone();
        }
        if let Some(cover_image) = &input.cover_image {
            post.cover_image = cover_image.clone();
        }
        if let Some(featured) = input.featured {
            post.featured = featured;
        }
        post.updated_at = today;

        let updated = post.clone();
        self.save_posts(&posts)?;
        debug!(id = %updated.id, "updated post");
        Ok(Envelope::ok(updated))
    }

    async fn delete_post(&self, id: &str) -> Result<Envelope<()>> {
        let _guard = self.write_lock.lock().await;
        let mut posts = self.load_posts()?;
        let index = posts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found(POST_NOT_FOUND))?;
        posts.remove(index);
        self.save_posts(&posts)?;

        info!(id, "deleted post");
        Ok(Envelope::empty())
    }

    async fn list_categories(&self) -> Result<Envelope<Vec<Category>>> {
        Ok(Envelope::ok(self.load_categories()?))
    }

    async fn get_category(&self, id: &str) -> Result<Envelope<Category>> {
        self.load_categories()?
            .into_iter()
            .find(|c| c.id == id)
            .map(Envelope::ok)
            .ok_or_else(|| ApiError::not_found(CATEGORY_NOT_FOUND))
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Envelope<Category>> {
        self.load_categories()?
            .into_iter()
            .find(|c| c.slug == slug)
            .map(Envelope::ok)
            .ok_or_else(|| ApiError::not_found(CATEGORY_NOT_FOUND))
    }

    async fn create_category(&self, input: &CreateCategory) -> Result<Envelope<Category>> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories()?;
        slug_taken(categories.iter().map(|c| c.slug.as_str()), &input.slug)?;

        let category = Category {
            id: self.next_id(categories.iter().map(|c| c.id.as_str())),
            name: input.name.clone(),
            slug: input.slug.clone(),
            description: input.description.clone().unwrap_or_default(),
            count: 0,
        };
        categories.push(category.clone());
        self.save_categories(&categories)?;

        info!(id = %category.id, slug = %category.slug, "created category");
        Ok(Envelope::ok(category))
    }

    async fn update_category(&self, id: &str, input: &UpdateCategory) -> Result<Envelope<Category>> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories()?;
        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ApiError::not_found(CATEGORY_NOT_FOUND))?;

        if let Some(slug) = &input.slug {
            slug_taken(
                categories.iter().filter(|c| c.id != id).map(|c| c.slug.as_str()),
                slug,
            )?;
        }

        let category = &mut categories[index];
        if let Some(name) = &input.name {
            category.name = name.clone();
        }
        if let Some(slug) = &input.slug {
            category.slug = slug.clone();
        }
        if let Some(description) = &input.description {
            category.description = description.clone();
        }
        let updated = category.clone();
        self.save_categories(&categories)?;
        Ok(Envelope::ok(updated))
    }

    async fn delete_category(&self, id: &str) -> Result<Envelope<()>> {
        let _guard = self.write_lock.lock().await;
        let mut categories = self.load_categories()?;
        let index = categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ApiError::not_found(CATEGORY_NOT_FOUND))?;
        categories.remove(index);
        self.save_categories(&categories)?;

        info!(id, "deleted category");
        Ok(Envelope::empty())
    }

    async fn upload_image(&self, image: &ImageUpload) -> Result<Envelope<UploadResponse>> {
        if !image.mime_type.starts_with("image/") {
            return Err(ApiError::validation(format!(
                "only images can be uploaded, got {}",
                image.mime_type
            )));
        }
        self.pause(self.latency.upload).await;

        Ok(Envelope::ok(UploadResponse {
            url: format!(
                "https://images.unsplash.com/photo-{}?w=800&h=400&fit=crop",
                self.clock.now_millis()
            ),
            filename: image.file_name.clone(),
            size: image.bytes.len() as u64,
            mime_type: image.mime_type.clone(),
        }))
    }

    async fn blog_stats(&self) -> Result<Envelope<BlogStats>> {
        let posts = self.load_posts()?;
        let categories = self.load_categories()?;
        let tags: BTreeSet<&str> = posts
            .iter()
            .flat_map(|p| p.tags.iter().map(String::as_str))
            .collect();

        Ok(Envelope::ok(BlogStats {
            total_posts: posts.len(),
            total_categories: categories.len(),
            total_tags: tags.len(),
            total_views: posts.len() as u64 * VIEWS_PER_POST,
            featured_posts: posts.iter().filter(|p| p.featured).count(),
            published_posts: posts.len(),
            draft_posts: 0,
        }))
    }
}
