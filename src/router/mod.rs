//! Route matching contract.
//!
//! The engine does not route by itself: it asks a [`Router`] to classify
//! each request and to deposit whatever the match learned (namespace,
//! presenter, callback target, path captures) into a parameter vector.
//! [`TableRouter`] is the built-in implementation; hosts with their own
//! routing scheme implement [`Router`] directly.

mod table;

pub use table::{RouteTarget, TableRouter};

use crate::request::Request;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

/// Route parameter vector sized for the common case of a handful of params.
///
/// Lookups scan from the back so later writes shadow earlier ones.
pub type RouteParams = SmallVec<[(Arc<str>, String); 8]>;

/// Reserved param: namespace of the matched presenter.
pub const NAMESPACE_PARAM: &str = "namespace";
/// Reserved param: name of the matched presenter.
pub const PRESENTER_PARAM: &str = "presenter";
/// Reserved param: callback target of a `Simple`/`Callback` match.
pub const TARGET_PARAM: &str = "target";

/// Last occurrence of `key` in `params`, if any.
pub fn param_get<'a>(params: &'a RouteParams, key: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.as_str())
}

/// Append a param. Existing entries for the same key are shadowed, not
/// replaced.
pub fn param_set(params: &mut RouteParams, key: &str, value: impl Into<String>) {
    params.push((Arc::from(key), value.into()));
}

/// Collapse the vector into a map, last write winning, for merging into a
/// request's params.
pub fn params_map(params: &RouteParams) -> HashMap<String, Value> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
        .collect()
}

/// What kind of handler a match resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Presenter-backed route: `namespace`/`presenter` params name a
    /// registered presenter factory.
    Mvp,
    /// Bare callback route: `target` names a registered callback.
    Simple,
    /// Callback route with the same dispatch contract as [`RouteKind::Simple`].
    Callback,
    /// No route matched, or the router opted out of this request.
    None,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Mvp => "MVP",
            RouteKind::Simple => "SIMPLE",
            RouteKind::Callback => "CALLBACK",
            RouteKind::None => "NONE",
        }
    }
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Route classification contract.
///
/// Implementations inspect the request (path, method, params) and return
/// the kind of handler it maps to, appending any params the match produced.
/// Returning [`RouteKind::None`] means "not mine"; the engine turns that
/// into a routing failure.
pub trait Router: Send + Sync {
    fn match_route(&self, req: &Request, params: &mut RouteParams) -> RouteKind;
}

impl<R: Router + ?Sized> Router for Arc<R> {
    fn match_route(&self, req: &Request, params: &mut RouteParams) -> RouteKind {
        (**self).match_route(req, params)
    }
}
