//! Declaration of the canonical taxonomy and its routes

use super::term::GroupName;
use serde::{Deserialize, Serialize};

/// Placeholder substituted with a term slug when routes are expanded
pub const TERM_PLACEHOLDER: &str = "{term}";

/// A route pattern generated for the canonical taxonomy
///
/// `path` and `query` may contain `{term}`, which is replaced by each
/// canonical term's slug when the route table is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePattern {
    pub path: String,
    pub query: String,
}

impl RoutePattern {
    pub fn new(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: query.into(),
        }
    }

    /// Concrete (path, query) pair for one term slug
    pub fn expand(&self, term_slug: &str) -> (String, String) {
        (
            self.path.replace(TERM_PLACEHOLDER, term_slug),
            self.query.replace(TERM_PLACEHOLDER, term_slug),
        )
    }
}

/// The canonical grouping system, as registered with the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub group: GroupName,
    pub label: String,
    pub rewrite_slug: String,
    pub routes: Vec<RoutePattern>,
}

impl CanonicalSchema {
    /// Schema with the standard archive and paged-archive routes
    pub fn new(group: GroupName, label: impl Into<String>, rewrite_slug: impl Into<String>) -> Self {
        let rewrite_slug = rewrite_slug.into();
        let routes = vec![
            RoutePattern::new(
                format!("{}/{}", rewrite_slug, TERM_PLACEHOLDER),
                format!("{}={}", group, TERM_PLACEHOLDER),
            ),
            RoutePattern::new(
                format!("{}/{}/page/{{n}}", rewrite_slug, TERM_PLACEHOLDER),
                format!("{}={}&paged={{n}}", group, TERM_PLACEHOLDER),
            ),
        ];
        Self {
            group,
            label: label.into(),
            rewrite_slug,
            routes,
        }
    }
}
