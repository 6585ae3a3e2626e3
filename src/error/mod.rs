//! # Error Module
//!
//! The engine's failure taxonomy and the environment-aware payload formatter.
//!
//! ## Overview
//!
//! Every failure the dispatch engine can intercept is an [`Error`]: a kind
//! from the fixed taxonomy plus the source location where it was raised and
//! a lazily captured backtrace. The taxonomy maps onto four categories:
//!
//! - **routing** - [`ErrorKind::NotFound`]: no route matched (404)
//! - **framework** - engine-level faults: missing router, bad handler,
//!   nesting limit, misconfiguration, failed access validation (500, with
//!   401 as the explicit hint on [`ErrorKind::Unauthorized`])
//! - **database** - [`ErrorKind::Database`]: statement failures surfaced by
//!   the [`db`](crate::db) collaborator (500)
//! - **handler** - [`ErrorKind::Handler`]: anything a presenter or callback
//!   raised through `anyhow` (500)
//!
//! [`ErrorKind::Emission`] sits outside the normal flow: it marks a failure
//! while serializing an already-populated response and is handled by the
//! engine's last-resort path, never by the payload formatter.
//!
//! Constructors are `#[track_caller]`, so the `file`/`line` that development
//! error payloads expose point at the raise site, not at this module.

mod payload;

pub use payload::error_payload;

use crate::db::DbError;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

/// Failure kinds intercepted at the dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// No route (or no registered presenter) for the requested path.
    #[error("no route matched `{path}`")]
    NotFound { path: String },

    /// The engine finished initialization without a router bound.
    #[error("routing is missing")]
    RouterMissing,

    /// A SIMPLE/CALLBACK route named a target that is not invokable.
    #[error("handler `{target}` is not a function")]
    BadHandler { target: String },

    /// Recursive dispatch exceeded the depth ceiling.
    #[error("dispatch depth limit of {limit} exceeded at `{path}`")]
    NestingLimit { limit: u32, path: String },

    /// Engine or host configuration fault.
    #[error("{message}")]
    Config { message: String },

    /// Request failed access validation against the configured secret.
    #[error("access denied: {reason}")]
    Unauthorized { reason: String },

    /// Statement failure raised by the database collaborator.
    #[error(transparent)]
    Database(#[from] DbError),

    /// Arbitrary failure raised inside a presenter or callback.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),

    /// The response body could not be serialized for emission.
    #[error("response serialization failed: {source}")]
    Emission {
        #[source]
        source: serde_json::Error,
    },
}

/// A dispatch failure: taxonomy kind plus raise-site metadata.
///
/// The engine converts every `Error` into response output; none escape
/// [`Application::execute`](crate::Application::execute).
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    location: &'static Location<'static>,
    backtrace: Backtrace,
}

impl Error {
    #[track_caller]
    fn with_kind(kind: ErrorKind) -> Self {
        Error {
            kind,
            location: Location::caller(),
            // Respects RUST_BACKTRACE; stays cheap when capture is disabled.
            backtrace: Backtrace::capture(),
        }
    }

    #[track_caller]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NotFound { path: path.into() })
    }

    #[track_caller]
    pub fn router_missing() -> Self {
        Self::with_kind(ErrorKind::RouterMissing)
    }

    #[track_caller]
    pub fn bad_handler(target: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::BadHandler {
            target: target.into(),
        })
    }

    #[track_caller]
    pub fn nesting_limit(limit: u32, path: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::NestingLimit {
            limit,
            path: path.into(),
        })
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Config {
            message: message.into(),
        })
    }

    #[track_caller]
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Unauthorized {
            reason: reason.into(),
        })
    }

    /// Wrap a handler-origin failure, keeping its message.
    #[track_caller]
    pub fn handler(source: impl Into<anyhow::Error>) -> Self {
        Self::with_kind(ErrorKind::Handler(source.into()))
    }

    #[track_caller]
    pub fn emission(source: serde_json::Error) -> Self {
        Self::with_kind(ErrorKind::Emission { source })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Source location where the error was raised.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Status code applied to transport-bound responses: 500 unless the
    /// kind carries an explicit hint.
    pub fn status(&self) -> u16 {
        match &self.kind {
            ErrorKind::NotFound { .. } => 404,
            ErrorKind::Unauthorized { .. } => 401,
            _ => 500,
        }
    }

    /// Short category tag stored as `error.type`, never a fully qualified
    /// type name.
    pub fn kind_tag(&self) -> &'static str {
        match &self.kind {
            ErrorKind::NotFound { .. } => "not_found",
            ErrorKind::RouterMissing
            | ErrorKind::BadHandler { .. }
            | ErrorKind::NestingLimit { .. }
            | ErrorKind::Config { .. }
            | ErrorKind::Unauthorized { .. } => "framework",
            ErrorKind::Database(_) => "database",
            ErrorKind::Handler(_) => "handler",
            ErrorKind::Emission { .. } => "response",
        }
    }

    /// Stable internal code, exposed only inside development debug blocks.
    pub fn code(&self) -> u16 {
        match &self.kind {
            ErrorKind::NotFound { .. } => 1,
            ErrorKind::RouterMissing => 2,
            ErrorKind::BadHandler { .. } => 3,
            ErrorKind::NestingLimit { .. } => 4,
            ErrorKind::Config { .. } => 5,
            ErrorKind::Unauthorized { .. } => 6,
            ErrorKind::Database(_) => 7,
            ErrorKind::Handler(_) => 8,
            ErrorKind::Emission { .. } => 9,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<DbError> for Error {
    fn from(err: DbError) -> Self {
        Self::with_kind(ErrorKind::Database(err))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::with_kind(ErrorKind::Handler(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_hints() {
        assert_eq!(Error::not_found("/x").status(), 404);
        assert_eq!(Error::unauthorized("bad secret").status(), 401);
        assert_eq!(Error::router_missing().status(), 500);
        assert_eq!(Error::bad_handler("f").status(), 500);
    }

    #[test]
    fn test_kind_tags_follow_categories() {
        assert_eq!(Error::not_found("/x").kind_tag(), "not_found");
        assert_eq!(Error::nesting_limit(10, "/x").kind_tag(), "framework");
        assert_eq!(
            Error::from(anyhow::anyhow!("presenter blew up")).kind_tag(),
            "handler"
        );
    }

    #[test]
    fn test_location_points_at_raise_site() {
        let err = Error::router_missing();
        assert!(err.location().file().ends_with("mod.rs"));
        assert!(err.location().line() > 0);
    }

    #[test]
    fn test_display_has_no_internal_type_names() {
        let msg = Error::bad_handler("do_thing").to_string();
        assert_eq!(msg, "handler `do_thing` is not a function");
        assert!(!msg.contains("ErrorKind"));
    }
}
