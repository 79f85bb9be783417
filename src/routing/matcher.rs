//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path against a mount prefix
//! - Rewrite the path when the prefix is stripped before forwarding
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Prefixes match whole segments: `/api` matches `/api` and `/api/x`,
//!   never `/apix`
//! - No regex to guarantee O(n) matching

use axum::body::Body;
use axum::http::{Request, Uri};

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    /// A missing leading slash is added and trailing slashes are dropped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim().trim_end_matches('/');
        let prefix = if trimmed.is_empty() {
            "/".to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{}", trimmed)
        };
        Self { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the request path falls under this prefix.
    pub fn matches(&self, req: &Request<Body>) -> bool {
        self.matches_path(req.uri().path())
    }

    pub fn matches_path(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The path with this prefix removed (always starting with `/`).
    pub fn strip(&self, path: &str) -> String {
        if self.prefix == "/" {
            return path.to_string();
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") => "/".to_string(),
            Some(rest) if rest.starts_with('/') => rest.to_string(),
            _ => path.to_string(),
        }
    }

    /// Rewrite a URI with the prefix stripped, keeping the query string.
    pub fn strip_uri(&self, uri: &Uri) -> Option<Uri> {
        let path = self.strip(uri.path());
        let path_and_query = match uri.query() {
            Some(q) => format!("{}?{}", path, q),
            None => path,
        };
        path_and_query.parse().ok()
    }
}
