//! Demo account and seed content for mock mode.

use crate::types::{Category, Post, Role, User};

pub const DEMO_USERNAME: &str = "admin";
pub const DEMO_PASSWORD: &str = "admin123";

const DEMO_AVATAR: &str =
    "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=100&h=100&fit=crop&crop=face";

pub fn demo_admin() -> User {
    User {
        id: "1".to_string(),
        username: DEMO_USERNAME.to_string(),
        email: "admin@luxuryblog.com".to_string(),
        role: Role::Admin,
        avatar: Some(DEMO_AVATAR.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn seed_post(
    id: &str,
    title: &str,
    slug: &str,
    excerpt: &str,
    content: &str,
    author: &str,
    date: &str,
    category: &str,
    tags: &[&str],
    cover: &str,
    read_time: u32,
    featured: bool,
) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        slug: slug.to_string(),
        excerpt: excerpt.to_string(),
        content: content.to_string(),
        author: author.to_string(),
        published_at: date.to_string(),
        updated_at: date.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        cover_image: cover.to_string(),
        read_time,
        featured,
    }
}

pub fn default_posts() -> Vec<Post> {
    vec![
        seed_post(
            "1",
            "Where Modern Web Development Is Heading",
            "future-of-web-development",
            "A look at the latest trends in web development: AI integration, edge computing and new frameworks.",
            "# Where Modern Web Development Is Heading\n\nWeb development is going through a revolution...\n\n## AI integration\nAI is changing how we build and use web applications...\n\n## Edge computing\nEdge computing moves compute closer to users...\n\n## New frameworks\nNew frameworks and tools keep appearing...",
            "Zhang San",
            "2024-01-15",
            "technology",
            &["Web", "AI", "Frontend"],
            "https://images.unsplash.com/photo-1461749280684-dccba630e2f6?w=800&h=400&fit=crop",
            8,
            true,
        ),
        seed_post(
            "2",
            "Vue.js 3 Composition API Best Practices",
            "vue3-composition-api-best-practices",
            "How to use the Vue.js 3 Composition API to build maintainable applications.",
            "# Vue.js 3 Composition API Best Practices\n\nVue.js 3 introduced the Composition API, a more flexible way to organize code...",
            "Li Si",
            "2024-01-10",
            "frontend",
            &["Vue.js", "Frontend", "JavaScript"],
            "https://images.unsplash.com/photo-1555066931-4365d14bab8c?w=800&h=400&fit=crop",
            12,
            false,
        ),
        seed_post(
            "3",
            "Design Systems: Building a Consistent User Experience",
            "design-systems-consistent-ux",
            "How to create and maintain a design system that keeps a product consistent and scalable.",
            "# Design Systems: Building a Consistent User Experience\n\nDesign systems are the foundation of modern product development...",
            "Wang Wu",
            "2024-01-05",
            "design",
            &["Design Systems", "UX", "UI"],
            "https://images.unsplash.com/photo-1558655146-9f40138edfeb?w=800&h=400&fit=crop",
            6,
            true,
        ),
    ]
}

pub fn default_categories() -> Vec<Category> {
    let category = |id: &str, name: &str, slug: &str, description: &str, count: u32| Category {
        id: id.to_string(),
        name: name.to_string(),
        slug: slug.to_string(),
        description: description.to_string(),
        count,
    };
    vec![
        category("1", "Technology", "technology", "Latest technology trends and insights", 5),
        category("2", "Frontend", "frontend", "Frontend techniques and best practices", 8),
        category("3", "Design", "design", "UI/UX design and user experience", 3),
        category("4", "Lifestyle", "lifestyle", "Balancing work and life", 2),
    ]
}
