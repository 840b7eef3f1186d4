//! Route filters and predicates.
//!
//! A route predicate decides whether a request belongs to a route. The
//! [`RouteFilter`] trait lets [`Router::with`](crate::Router::with) accept
//! either an explicit predicate closure or the path-string shorthand.

use std::sync::Arc;

use crate::event::RequestMessage;

/// A route-matching decision over a request's method and path.
pub type RequestPredicate = Arc<dyn Fn(&RequestMessage) -> bool + Send + Sync>;

/// Anything that can be turned into a [`RequestPredicate`].
///
/// Implemented for predicate closures and for path strings. The string
/// shorthand comes in two forms: `"*"` matches every request regardless of
/// method, so a fallback route really is a fallback; any other string
/// matches a GET request whose path equals it exactly.
pub trait RouteFilter {
    /// Converts this filter into a predicate.
    fn into_predicate(self) -> RequestPredicate;
}

impl<F> RouteFilter for F
where
    F: Fn(&RequestMessage) -> bool + Send + Sync + 'static,
{
    fn into_predicate(self) -> RequestPredicate {
        Arc::new(self)
    }
}

impl RouteFilter for String {
    fn into_predicate(self) -> RequestPredicate {
        path_predicate(self)
    }
}

impl RouteFilter for &str {
    fn into_predicate(self) -> RequestPredicate {
        path_predicate(self.to_string())
    }
}

/// The path-string shorthand: catch-all `*`, or GET-only exact path match.
fn path_predicate(path: String) -> RequestPredicate {
    if path == "*" {
        Arc::new(|_| true)
    } else {
        Arc::new(move |req| req.method == "GET" && path == req.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(predicate: &RequestPredicate, method: &str, path: &str) -> bool {
        predicate.as_ref()(&RequestMessage::new(method, path))
    }

    #[test]
    fn test_path_shorthand_matches_exact_get() {
        let predicate = "/status".into_predicate();
        assert!(matches(&predicate, "GET", "/status"));
        assert!(!matches(&predicate, "GET", "/other"));
    }

    #[test]
    fn test_path_shorthand_is_get_only() {
        let predicate = "/status".into_predicate();
        assert!(!matches(&predicate, "POST", "/status"));
        assert!(!matches(&predicate, "get", "/status"));
    }

    #[test]
    fn test_wildcard_matches_any_method_and_path() {
        let predicate = "*".into_predicate();
        assert!(matches(&predicate, "GET", "/anything"));
        assert!(matches(&predicate, "GET", "/"));
        assert!(matches(&predicate, "DELETE", "/anything"));
        assert!(matches(&predicate, "POST", "/status"));
    }

    #[test]
    fn test_closure_filters_pass_through() {
        let predicate = (|req: &RequestMessage| req.method == "POST").into_predicate();
        assert!(matches(&predicate, "POST", "/submit"));
        assert!(!matches(&predicate, "GET", "/submit"));
    }
}
