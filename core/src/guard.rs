//! Route table and the pre-navigation check.
//!
//! # Design
//! Routes declare whether they need a session (`RequiresAuth`), forbid one
//! (`GuestOnly`) or do not care (`Public`). `NavigationGuard::before_each`
//! decides for a full destination path (path plus query) whether to proceed
//! or where to redirect. Unknown paths proceed; rendering a not-found page is
//! the caller's business.

use std::sync::Arc;

use tracing::debug;
use url::form_urlencoded;

use crate::store::AuthStore;

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_PATH: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    Public,
    GuestOnly,
    RequiresAuth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Pattern; a segment starting with `:` matches any single segment.
    pub pattern: &'static str,
    pub name: &'static str,
    pub access: RouteAccess,
}

pub const ROUTES: &[Route] = &[
    Route { pattern: "/", name: "home", access: RouteAccess::Public },
    Route { pattern: "/about", name: "about", access: RouteAccess::Public },
    Route { pattern: "/blog", name: "blog", access: RouteAccess::Public },
    Route { pattern: "/blog/:slug", name: "blog-post", access: RouteAccess::Public },
    Route { pattern: "/contact", name: "contact", access: RouteAccess::Public },
    Route { pattern: LOGIN_PATH, name: "login", access: RouteAccess::GuestOnly },
    Route { pattern: ADMIN_PATH, name: "admin", access: RouteAccess::RequiresAuth },
];

/// Path component of a full path, without query or fragment.
fn path_of(full_path: &str) -> &str {
    let end = full_path.find(['?', '#']).unwrap_or(full_path.len());
    &full_path[..end]
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut pattern = segments(pattern);
    let mut path = segments(path);
    loop {
        match (pattern.next(), path.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p.starts_with(':') || p == s => continue,
            _ => return false,
        }
    }
}

/// The route serving `full_path`, if any.
pub fn match_route(full_path: &str) -> Option<&'static Route> {
    let path = path_of(full_path);
    ROUTES.iter().find(|route| pattern_matches(route.pattern, path))
}

/// Login location that sends the user back to `full_path` afterwards.
pub fn login_redirect(full_path: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirect", full_path)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// The `redirect` target carried by a login location, if present.
pub fn redirect_target(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "redirect")
        .map(|(_, value)| value.into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

pub struct NavigationGuard {
    auth: Arc<AuthStore>,
}

impl NavigationGuard {
    pub fn new(auth: Arc<AuthStore>) -> Self {
        Self { auth }
    }

    pub async fn before_each(&self, full_path: &str) -> Navigation {
        let access = match_route(full_path).map_or(RouteAccess::Public, |route| route.access);

        let decision = match access {
            RouteAccess::Public => Navigation::Proceed,
            RouteAccess::RequiresAuth => {
                // validate_token logs out on an expired or malformed token.
                if self.auth.is_authenticated().await && self.auth.validate_token().await {
                    Navigation::Proceed
                } else {
                    Navigation::Redirect(login_redirect(full_path))
                }
            }
            RouteAccess::GuestOnly => {
                if self.auth.is_authenticated().await {
                    Navigation::Redirect(ADMIN_PATH.to_string())
                } else {
                    Navigation::Proceed
                }
            }
        };
        debug!(path = full_path, ?decision, "navigation");
        decision
    }
}
