use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::BlogBackend;
use crate::error::Result;
use crate::query::{filter_posts, sort_posts};
use crate::types::{Category, CreatePost, Post, PostQuery, SortField, SortOrder, UpdatePost};

/// Number of posts in `recent_posts`.
pub const RECENT_POSTS: usize = 3;

/// Page size used when pulling the whole collection into the cache.
const LOAD_PAGE_SIZE: usize = 100;

#[derive(Debug, Default)]
struct BlogState {
    posts: Vec<Post>,
    categories: Vec<Category>,
    search_query: String,
    selected_category: String,
}

/// Cached posts and categories plus the current search and category filter.
///
/// Mutations go through the backend first; the cache only changes once the
/// backend has accepted them.
pub struct BlogStore {
    backend: Arc<dyn BlogBackend>,
    state: RwLock<BlogState>,
}

impl BlogStore {
    pub fn new(backend: Arc<dyn BlogBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(BlogState::default()),
        }
    }

    /// Replace the cache with everything the backend holds.
    pub async fn load(&self) -> Result<()> {
        let mut posts = Vec::new();
        let mut page = 1;
        loop {
            let query = PostQuery {
                page: Some(page),
                page_size: Some(LOAD_PAGE_SIZE),
                ..Default::default()
            };
            let chunk = self.backend.list_posts(&query).await?.into_data()?;
            let done = chunk.items.is_empty() || page >= chunk.total_pages;
            posts.extend(chunk.items);
            if done {
                break;
            }
            page += 1;
        }
        let categories = self.backend.list_categories().await?.data.unwrap_or_default();

        debug!(posts = posts.len(), categories = categories.len(), "loaded blog cache");
        let mut state = self.state.write().await;
        state.posts = posts;
        state.categories = categories;
        Ok(())
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.state.read().await.posts.clone()
    }

    pub async fn categories(&self) -> Vec<Category> {
        self.state.read().await.categories.clone()
    }

    pub async fn set_search_query(&self, query: impl Into<String>) {
        self.state.write().await.search_query = query.into();
    }

    pub async fn search_query(&self) -> String {
        self.state.read().await.search_query.clone()
    }

    pub async fn set_selected_category(&self, category: impl Into<String>) {
        self.state.write().await.selected_category = category.into();
    }

    pub async fn selected_category(&self) -> String {
        self.state.read().await.selected_category.clone()
    }

    /// Cached posts matching the search and category filter, newest first.
    pub async fn filtered_posts(&self) -> Vec<Post> {
        let state = self.state.read().await;
        let query = PostQuery {
            search: Some(state.search_query.clone()),
            category: Some(state.selected_category.clone()),
            ..Default::default()
        };
        let mut posts = filter_posts(state.posts.clone(), &query);
        sort_posts(&mut posts, SortField::PublishedAt, SortOrder::Desc);
        posts
    }

    pub async fn featured_posts(&self) -> Vec<Post> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .filter(|p| p.featured)
            .cloned()
            .collect()
    }

    /// The first `RECENT_POSTS` posts in cache order.
    pub async fn recent_posts(&self) -> Vec<Post> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .take(RECENT_POSTS)
            .cloned()
            .collect()
    }

    pub async fn post_by_slug(&self, slug: &str) -> Option<Post> {
        self.state.read().await.posts.iter().find(|p| p.slug == slug).cloned()
    }

    pub async fn category_by_slug(&self, slug: &str) -> Option<Category> {
        self.state
            .read()
            .await
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
    }

    pub async fn add_post(&self, input: &CreatePost) -> Result<Post> {
        let post = self.backend.create_post(input).await?.into_data()?;
        self.state.write().await.posts.insert(0, post.clone());
        Ok(post)
    }

    pub async fn update_post(&self, id: &str, input: &UpdatePost) -> Result<Post> {
        let post = self.backend.update_post(id, input).await?.into_data()?;
        let mut state = self.state.write().await;
        match state.posts.iter_mut().find(|p| p.id == id) {
            Some(cached) => *cached = post.clone(),
            None => state.posts.insert(0, post.clone()),
        }
        Ok(post)
    }

    pub async fn delete_post(&self, id: &str) -> Result<()> {
        self.backend.delete_post(id).await?;
        self.state.write().await.posts.retain(|p| p.id != id);
        Ok(())
    }
}
