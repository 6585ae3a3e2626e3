use crate::error::Error;
use serde_json::{Map, Value};

/// Reserved body field the engine writes error payloads under.
pub const ERROR_FIELD: &str = "error";

const NO_HEADERS: &[(String, String)] = &[];

/// Mutable output sink owned by a [`Request`](crate::Request).
///
/// The body is a JSON value that starts as an empty object. Handlers either
/// set named fields ([`insert`](Response::insert)) or overwrite the whole
/// body ([`set_value`](Response::set_value)). A transport-bound response
/// additionally carries a status code and headers; on a detached response
/// those operations are accepted and ignored.
#[derive(Debug, Clone)]
pub struct Response {
    body: Value,
    transport: Option<Transport>,
}

#[derive(Debug, Clone)]
struct Transport {
    status: u16,
    headers: Vec<(String, String)>,
}

impl Response {
    /// Plain sink with no transport surface (internal dispatches).
    pub fn detached() -> Self {
        Response {
            body: Value::Object(Map::new()),
            transport: None,
        }
    }

    /// Sink with a status code and headers (transport-bound dispatches).
    pub fn bound() -> Self {
        Response {
            body: Value::Object(Map::new()),
            transport: Some(Transport {
                status: 200,
                headers: Vec::new(),
            }),
        }
    }

    pub fn is_transport_bound(&self) -> bool {
        self.transport.is_some()
    }

    /// Discard all previously set output. Status and headers survive; the
    /// error path overwrites the status separately.
    pub fn clear(&mut self) {
        self.body = Value::Object(Map::new());
    }

    /// Set a named body field. A non-object body (after
    /// [`set_value`](Response::set_value)) is replaced by a fresh object
    /// first.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if !self.body.is_object() {
            self.body = Value::Object(Map::new());
        }
        if let Some(map) = self.body.as_object_mut() {
            map.insert(name.into(), value.into());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.body.as_object().and_then(|map| map.get(name))
    }

    /// Overwrite the whole body with one value.
    pub fn set_value(&mut self, value: Value) {
        self.body = value;
    }

    pub fn value(&self) -> &Value {
        &self.body
    }

    /// True when no output has been produced yet.
    pub fn is_empty(&self) -> bool {
        match &self.body {
            Value::Object(map) => map.is_empty(),
            Value::Null => true,
            _ => false,
        }
    }

    /// Status code; detached responses always report 200.
    pub fn status(&self) -> u16 {
        self.transport.as_ref().map(|t| t.status).unwrap_or(200)
    }

    /// Set the status code. Ignored on a detached response.
    pub fn set_status(&mut self, status: u16) {
        if let Some(transport) = self.transport.as_mut() {
            transport.status = status;
        }
    }

    /// Add or replace a header (case-insensitive on the name). Ignored on a
    /// detached response.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        if let Some(transport) = self.transport.as_mut() {
            transport
                .headers
                .retain(|(k, _)| !k.eq_ignore_ascii_case(name));
            transport.headers.push((name.to_string(), value.into()));
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.transport.as_ref().and_then(|t| {
            t.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn headers(&self) -> &[(String, String)] {
        self.transport
            .as_ref()
            .map(|t| t.headers.as_slice())
            .unwrap_or(NO_HEADERS)
    }

    /// Serialize the body for emission. Failures here belong to the
    /// response phase; the engine answers them with its static fallback,
    /// never with the payload formatter.
    pub fn render(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(&self.body).map_err(Error::emission)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::detached()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clear_discards_fields_but_keeps_status() {
        let mut res = Response::bound();
        res.insert("greeting", "hello");
        res.set_status(201);
        res.clear();
        assert!(res.is_empty());
        assert_eq!(res.status(), 201);
    }

    #[test]
    fn test_insert_after_whole_value_starts_fresh_object() {
        let mut res = Response::detached();
        res.set_value(json!("plain text"));
        res.insert("key", 1);
        assert_eq!(res.value(), &json!({"key": 1}));
    }

    #[test]
    fn test_detached_ignores_status_and_headers() {
        let mut res = Response::detached();
        res.set_status(404);
        res.set_header("X-Test", "1");
        assert_eq!(res.status(), 200);
        assert!(res.header("X-Test").is_none());
        assert!(res.headers().is_empty());
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut res = Response::bound();
        res.set_header("Content-Type", "text/plain");
        res.set_header("content-type", "application/json");
        assert_eq!(res.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(res.headers().len(), 1);
    }
}
