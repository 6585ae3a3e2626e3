//! # dais
//!
//! A compact presenter-dispatch core. You hand the engine a request; it
//! resolves a route, runs the matching handler (a structured [`Presenter`]
//! or a plain [`Callback`]), and guarantees that whatever happens, the
//! request ends with a well-formed response. Failures never propagate to
//! the caller: they are translated into a structured `error` payload, with
//! full diagnostics in development and a terse message in production.
//!
//! ## Anatomy of a dispatch
//!
//! 1. **Lazy init** - on first use the engine propagates the configured
//!    base path, validates the access secret, binds the router, and runs
//!    the host's init hook. A failed step leaves the gate open for the
//!    next request to retry.
//! 2. **Nesting guard** - handlers may dispatch sub-requests back into
//!    the engine; depth is capped at [`MAX_DISPATCH_DEPTH`].
//! 3. **Routing** - a [`Router`] classifies the request as `MVP`,
//!    `SIMPLE`/`CALLBACK`, or `NONE` and extracts params.
//! 4. **Dispatch** - presenters are looked up by `(namespace, presenter)`
//!    in the registry, callbacks by target name.
//! 5. **Failure translation** - anything that went wrong above is caught
//!    once, at the engine boundary, and written into the response.
//!
//! ## Example
//!
//! ```
//! use dais::{Application, Config, Request, TableRouter};
//! use http::Method;
//! use serde_json::json;
//!
//! let router = TableRouter::new()
//!     .presenter(Method::GET, "/pets/{id}", "shop", "pet")?;
//!
//! let app = Application::builder(Config::builder().build())
//!     .router(router)
//!     .presenter("shop", "pet", |_app, req| {
//!         let id = req.param_str("id").unwrap_or_default().to_string();
//!         req.response_mut().insert("pet", json!({ "id": id }));
//!         Ok(())
//!     })
//!     .build();
//!
//! let mut req = Request::http(Method::GET, "/pets/7");
//! app.execute(&mut req);
//! assert_eq!(req.response().get("pet"), Some(&json!({ "id": "7" })));
//! # Ok::<(), dais::Error>(())
//! ```

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod presenter;
pub mod registry;
pub mod request;
pub mod response;
pub mod router;
pub mod security;

pub use app::{Application, ApplicationBuilder};
pub use config::{Config, ConfigBuilder, Environment};
pub use error::{Error, ErrorKind};
pub use ids::RequestId;
pub use presenter::{Callback, FnPresenter, Presenter, PresenterFactory};
pub use registry::{CallbackRegistry, PresenterRegistry};
pub use request::{Request, MAX_DISPATCH_DEPTH};
pub use response::{Response, ERROR_FIELD};
pub use router::{RouteKind, RouteParams, RouteTarget, Router, TableRouter};
pub use security::{AccessValidator, SecretParamValidator};
