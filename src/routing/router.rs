//! Endpoint lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the route for a method and path
//! - Return the matched target with its path parameters, or no match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Routes with more literal segments are checked first
//! - O(n) scan (acceptable for typical endpoint counts)

use std::collections::BTreeMap;

use axum::http::Method;

use crate::routing::matcher::PathPattern;

#[derive(Debug)]
struct Route<T> {
    method: Method,
    pattern: PathPattern,
    target: T,
}

/// Matched route.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub target: &'a T,
    pub pattern: &'a str,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: Method, pattern: PathPattern, target: T) {
        self.routes.push(Route {
            method,
            pattern,
            target,
        });

        // Stable sort keeps registration order among equally specific routes.
        self.routes
            .sort_by_key(|route| std::cmp::Reverse(route.pattern.specificity()));
    }

    pub fn match_request(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.pattern.matches(path).map(|params| RouteMatch {
                    target: &route.target,
                    pattern: route.pattern.as_str(),
                    params,
                })
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        let mut router = Router::new();
        router.add(Method::GET, PathPattern::parse("/users/{id}").unwrap(), "by-id");
        router.add(Method::GET, PathPattern::parse("/users/me").unwrap(), "me");
        router.add(Method::POST, PathPattern::parse("/users").unwrap(), "create");
        router
    }

    #[test]
    fn test_literal_wins() {
        let router = router();
        let matched = router.match_request(&Method::GET, "/users/me").unwrap();
        assert_eq!(*matched.target, "me");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn test_params() {
        let router = router();
        let matched = router.match_request(&Method::GET, "/users/7").unwrap();
        assert_eq!(*matched.target, "by-id");
        assert_eq!(matched.pattern, "/users/{id}");
        assert_eq!(matched.params["id"], "7");
    }

    #[test]
    fn test_method_mismatch() {
        let router = router();
        assert!(router.match_request(&Method::GET, "/users").is_none());
        assert!(router.match_request(&Method::POST, "/users").is_some());
    }
}
