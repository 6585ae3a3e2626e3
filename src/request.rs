//! Per-dispatch request context.
//!
//! A [`Request`] carries everything one dispatch needs (method, path,
//! params, nesting depth) and owns the [`Response`] the engine and the
//! handlers write into. Handlers never construct deep requests by hand;
//! depth only grows through [`Request::subrequest`].

use crate::ids::RequestId;
use crate::response::Response;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;

/// Ceiling on recursive dispatch depth.
///
/// A handler may issue sub-requests back into the same engine; this bounds
/// that recursion. It is a depth guard, nothing more; there is no deadlock
/// detection behind it.
pub const MAX_DISPATCH_DEPTH: u32 = 10;

/// Mutable per-call context handed to [`Application::execute`](crate::Application::execute).
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    method: Method,
    path: String,
    params: HashMap<String, Value>,
    depth: u32,
    base_path: Option<String>,
    transport: bool,
    response: Response,
}

impl Request {
    /// Internal (non-transport) request: detached response, no status or
    /// headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            id: RequestId::new(),
            method,
            path: path.into(),
            params: HashMap::new(),
            depth: 0,
            base_path: None,
            transport: false,
            response: Response::detached(),
        }
    }

    /// Transport-bound request: the query string (if any) is split off the
    /// target and decoded into params, and the response carries a status
    /// code and headers.
    pub fn http(method: Method, target: &str) -> Self {
        let (path, query_params) = split_target(target);
        Request {
            id: RequestId::new(),
            method,
            path,
            params: query_params,
            depth: 0,
            base_path: None,
            transport: true,
            response: Response::bound(),
        }
    }

    /// Child request for a nested dispatch, one level deeper than `self`.
    ///
    /// Sub-requests compose internal output, so they are always detached;
    /// the parent's base path is carried along for routing.
    pub fn subrequest(&self, method: Method, path: impl Into<String>) -> Self {
        Request {
            id: RequestId::new(),
            method,
            path: path.into(),
            params: HashMap::new(),
            depth: self.depth + 1,
            base_path: self.base_path.clone(),
            transport: false,
            response: Response::detached(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Nesting level: 0 for a top-level request, +1 per nested dispatch.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_transport_bound(&self) -> bool {
        self.transport
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub fn set_base_path(&mut self, base_path: impl Into<String>) {
        self.base_path = Some(base_path.into());
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Param value as a string slice, for the common case.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}

/// Split `path?query` and decode the query pairs. Duplicate keys keep the
/// last occurrence.
fn split_target(target: &str) -> (String, HashMap<String, Value>) {
    match target.split_once('?') {
        Some((path, query)) => {
            let params = url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            (path.to_string(), params)
        }
        None => (target.to_string(), HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_decodes_query() {
        let req = Request::http(Method::GET, "/pets?limit=10&name=Max%20Jr");
        assert_eq!(req.path(), "/pets");
        assert_eq!(req.param_str("limit"), Some("10"));
        assert_eq!(req.param_str("name"), Some("Max Jr"));
        assert!(req.is_transport_bound());
    }

    #[test]
    fn test_duplicate_query_keys_keep_last() {
        let req = Request::http(Method::GET, "/items?tag=a&tag=b");
        assert_eq!(req.param_str("tag"), Some("b"));
    }

    #[test]
    fn test_subrequest_increments_depth_and_detaches() {
        let top = Request::http(Method::GET, "/compose");
        let sub = top.subrequest(Method::GET, "/fragment");
        let deeper = sub.subrequest(Method::GET, "/fragment/inner");
        assert_eq!(top.depth(), 0);
        assert_eq!(sub.depth(), 1);
        assert_eq!(deeper.depth(), 2);
        assert!(!sub.is_transport_bound());
        assert_ne!(top.id(), sub.id());
    }

    #[test]
    fn test_subrequest_carries_base_path() {
        let mut top = Request::http(Method::GET, "/api/x");
        top.set_base_path("/api");
        let sub = top.subrequest(Method::GET, "/api/y");
        assert_eq!(sub.base_path(), Some("/api"));
    }
}
