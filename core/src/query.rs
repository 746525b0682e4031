//! In-memory filtering, sorting and pagination of posts.
//!
//! Used by the mock backend to answer list queries and by the blog store for
//! its local views. Every filter is an independent predicate, so the order in
//! which they are applied does not change the result.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};

use crate::envelope::Paginated;
use crate::types::{Post, PostQuery, SortField, SortOrder};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PAGE_SIZE: usize = 10;

pub fn matches_category(post: &Post, category: &str) -> bool {
    post.category == category
}

/// Case-insensitive substring match over title, excerpt and tags.
pub fn matches_search(post: &Post, search: &str) -> bool {
    let needle = search.to_lowercase();
    post.title.to_lowercase().contains(&needle)
        || post.excerpt.to_lowercase().contains(&needle)
        || post.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
}

pub fn matches_featured(post: &Post, featured: bool) -> bool {
    post.featured == featured
}

pub fn matches_author(post: &Post, author: &str) -> bool {
    post.author == author
}

/// True when the post carries at least one of `tags`.
pub fn matches_tags(post: &Post, tags: &[String]) -> bool {
    tags.is_empty() || tags.iter().any(|tag| post.tags.contains(tag))
}

/// Whether `post` passes every filter set on `query`. Empty strings count as
/// "no filter".
pub fn matches(post: &Post, query: &PostQuery) -> bool {
    let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    non_empty(&query.category).map_or(true, |c| matches_category(post, &c))
        && non_empty(&query.search).map_or(true, |s| matches_search(post, &s))
        && query.featured.map_or(true, |f| matches_featured(post, f))
        && non_empty(&query.author).map_or(true, |a| matches_author(post, &a))
        && query.tags.as_deref().map_or(true, |t| matches_tags(post, t))
}

pub fn filter_posts(posts: Vec<Post>, query: &PostQuery) -> Vec<Post> {
    posts.into_iter().filter(|post| matches(post, query)).collect()
}

/// Milliseconds since the epoch for `YYYY-MM-DD` or RFC 3339 dates.
pub fn parse_date_millis(value: &str) -> Option<i64> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn compare(a: &Post, b: &Post, field: SortField) -> Ordering {
    match field {
        // Unparseable dates compare as `None` and sort before real dates.
        SortField::PublishedAt => parse_date_millis(&a.published_at).cmp(&parse_date_millis(&b.published_at)),
        SortField::UpdatedAt => parse_date_millis(&a.updated_at).cmp(&parse_date_millis(&b.updated_at)),
        SortField::Title => a.title.cmp(&b.title),
    }
}

/// Stable sort; equal keys keep their stored order in both directions.
pub fn sort_posts(posts: &mut [Post], field: SortField, order: SortOrder) {
    posts.sort_by(|a, b| {
        let ord = compare(a, b, field);
        match order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
}

/// Slice out one page. `page` and `page_size` below 1 are raised to 1.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Paginated<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let start = (page - 1).saturating_mul(page_size);
    let items = items.into_iter().skip(start).take(page_size).collect();
    Paginated {
        items,
        total,
        page,
        page_size,
        total_pages: total.div_ceil(page_size),
    }
}

/// Filter, sort and paginate in one go, applying the query defaults.
pub fn run_query(posts: Vec<Post>, query: &PostQuery) -> Paginated<Post> {
    let mut filtered = filter_posts(posts, query);
    sort_posts(
        &mut filtered,
        query.sort_by.unwrap_or_default(),
        query.sort_order.unwrap_or_default(),
    );
    paginate(
        filtered,
        query.page.unwrap_or(DEFAULT_PAGE),
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    )
}

/// Reading time in minutes at 200 characters per minute.
pub fn read_time(content: &str) -> u32 {
    let chars = content.chars().count();
    u32::try_from(chars.div_ceil(200)).unwrap_or(u32::MAX)
}
