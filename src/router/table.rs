//! Built-in table-driven router.
//!
//! Routes are `(method, path pattern)` pairs compiled to anchored regexes.
//! Patterns use `{name}` placeholders for single path segments, captured
//! into route params under `name`.

use super::{
    param_set, RouteKind, RouteParams, Router, NAMESPACE_PARAM, PRESENTER_PARAM, TARGET_PARAM,
};
use crate::error::Error;
use crate::request::Request;
use http::Method;
use regex::Regex;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// What a table entry resolves to when it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Presenter route, dispatched as [`RouteKind::Mvp`].
    Presenter { namespace: String, presenter: String },
    /// Callback route, dispatched as [`RouteKind::Callback`].
    Callback { target: String },
    /// Bare callback route, dispatched as [`RouteKind::Simple`].
    Simple { target: String },
}

#[derive(Debug)]
struct RouteEntry {
    method: Method,
    pattern: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    target: RouteTarget,
}

/// Table router matching in insertion order; the first hit wins.
#[derive(Debug, Default)]
pub struct TableRouter {
    routes: Vec<RouteEntry>,
}

impl TableRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a presenter route.
    pub fn presenter(
        self,
        method: Method,
        pattern: &str,
        namespace: &str,
        presenter: &str,
    ) -> Result<Self, Error> {
        self.route(
            method,
            pattern,
            RouteTarget::Presenter {
                namespace: namespace.to_string(),
                presenter: presenter.to_string(),
            },
        )
    }

    /// Register a callback route.
    pub fn callback(self, method: Method, pattern: &str, target: &str) -> Result<Self, Error> {
        self.route(
            method,
            pattern,
            RouteTarget::Callback {
                target: target.to_string(),
            },
        )
    }

    /// Register a bare callback route.
    pub fn simple(self, method: Method, pattern: &str, target: &str) -> Result<Self, Error> {
        self.route(
            method,
            pattern,
            RouteTarget::Simple {
                target: target.to_string(),
            },
        )
    }

    pub fn route(
        mut self,
        method: Method,
        pattern: &str,
        target: RouteTarget,
    ) -> Result<Self, Error> {
        let (regex_src, param_names) = path_to_regex(pattern);
        let regex = Regex::new(&regex_src)
            .map_err(|e| Error::config(format!("invalid route pattern `{pattern}`: {e}")))?;
        self.routes.push(RouteEntry {
            method,
            pattern: pattern.to_string(),
            regex,
            param_names,
            target,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Request path with the base path prefix stripped, normalized to a
    /// leading slash.
    fn effective_path<'a>(&self, req: &'a Request) -> Cow<'a, str> {
        let path = req.path();
        let stripped = match req.base_path() {
            Some(base) if !base.is_empty() => path.strip_prefix(base).unwrap_or(path),
            _ => path,
        };
        if stripped.is_empty() {
            Cow::Borrowed("/")
        } else if stripped.starts_with('/') {
            Cow::Borrowed(stripped)
        } else {
            Cow::Owned(format!("/{stripped}"))
        }
    }
}

impl Router for TableRouter {
    fn match_route(&self, req: &Request, params: &mut RouteParams) -> RouteKind {
        let path = self.effective_path(req);
        for entry in &self.routes {
            if entry.method != *req.method() {
                continue;
            }
            let Some(caps) = entry.regex.captures(&path) else {
                continue;
            };
            for name in &entry.param_names {
                if let Some(m) = caps.name(name) {
                    params.push((Arc::clone(name), m.as_str().to_string()));
                }
            }
            let kind = match &entry.target {
                RouteTarget::Presenter {
                    namespace,
                    presenter,
                } => {
                    param_set(params, NAMESPACE_PARAM, namespace.clone());
                    param_set(params, PRESENTER_PARAM, presenter.clone());
                    RouteKind::Mvp
                }
                RouteTarget::Callback { target } => {
                    param_set(params, TARGET_PARAM, target.clone());
                    RouteKind::Callback
                }
                RouteTarget::Simple { target } => {
                    param_set(params, TARGET_PARAM, target.clone());
                    RouteKind::Simple
                }
            };
            debug!(
                path = %path,
                pattern = %entry.pattern,
                kind = %kind,
                "route matched"
            );
            return kind;
        }
        debug!(path = %path, method = %req.method(), "no route matched");
        RouteKind::None
    }
}

/// Compile a `{name}` path pattern into an anchored regex and the ordered
/// list of placeholder names.
fn path_to_regex(pattern: &str) -> (String, Vec<Arc<str>>) {
    let mut regex = String::from("^");
    let mut names = Vec::new();
    for segment in pattern.split('/') {
        if segment.is_empty() {
            continue;
        }
        regex.push('/');
        if let Some(name) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            names.push(Arc::from(name));
            regex.push_str("(?P<");
            regex.push_str(name);
            regex.push_str(">[^/]+)");
        } else {
            regex.push_str(&regex::escape(segment));
        }
    }
    if regex == "^" {
        regex.push('/');
    }
    regex.push('$');
    (regex, names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::param_get;

    fn router() -> TableRouter {
        TableRouter::new()
            .presenter(Method::GET, "/pets/{id}", "shop", "pet")
            .and_then(|r| r.callback(Method::POST, "/orders", "create_order"))
            .and_then(|r| r.simple(Method::GET, "/ping", "ping"))
            .unwrap()
    }

    #[test]
    fn test_presenter_route_captures_params() {
        let mut params = RouteParams::new();
        let req = Request::new(Method::GET, "/pets/42");
        assert_eq!(router().match_route(&req, &mut params), RouteKind::Mvp);
        assert_eq!(param_get(&params, "id"), Some("42"));
        assert_eq!(param_get(&params, NAMESPACE_PARAM), Some("shop"));
        assert_eq!(param_get(&params, PRESENTER_PARAM), Some("pet"));
    }

    #[test]
    fn test_callback_route_sets_target() {
        let mut params = RouteParams::new();
        let req = Request::new(Method::POST, "/orders");
        assert_eq!(
            router().match_route(&req, &mut params),
            RouteKind::Callback
        );
        assert_eq!(param_get(&params, TARGET_PARAM), Some("create_order"));
    }

    #[test]
    fn test_method_mismatch_is_no_match() {
        let mut params = RouteParams::new();
        let req = Request::new(Method::DELETE, "/ping");
        assert_eq!(router().match_route(&req, &mut params), RouteKind::None);
        assert!(params.is_empty());
    }

    #[test]
    fn test_base_path_is_stripped_before_matching() {
        let mut params = RouteParams::new();
        let mut req = Request::new(Method::GET, "/api/v1/pets/7");
        req.set_base_path("/api/v1");
        assert_eq!(router().match_route(&req, &mut params), RouteKind::Mvp);
        assert_eq!(param_get(&params, "id"), Some("7"));
    }

    #[test]
    fn test_root_pattern_matches_root() {
        let r = TableRouter::new()
            .simple(Method::GET, "/", "home")
            .unwrap();
        let mut params = RouteParams::new();
        let req = Request::new(Method::GET, "/");
        assert_eq!(r.match_route(&req, &mut params), RouteKind::Simple);
    }

    #[test]
    fn test_invalid_pattern_is_a_config_error() {
        let err = TableRouter::new()
            .presenter(Method::GET, "/x/{bad-name}", "n", "p")
            .unwrap_err();
        assert!(err.to_string().contains("invalid route pattern"));
    }
}
