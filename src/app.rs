//! The dispatch engine.
//!
//! [`Application`] owns the configuration, the handler registries, an
//! optional database, an access validator, and a lazily bound router.
//! [`Application::execute`] is the single entry point: it initializes the
//! engine on first use, guards recursion depth, routes, dispatches, and
//! converts every failure into response content. It never returns an
//! error to the caller.
//!
//! The one-time gate is mutex-backed, so sharing one engine across
//! threads is safe even when the first requests race; handlers issuing
//! nested dispatches re-enter `execute` on the same stack and skip the
//! gate.
//!
//! ```
//! use dais::{Application, Config, Request, TableRouter};
//! use http::Method;
//! use serde_json::json;
//!
//! let router = TableRouter::new().simple(Method::GET, "/ping", "ping")?;
//! let app = Application::builder(Config::builder().build())
//!     .router(router)
//!     .callback("ping", |_app, _req| Ok(Some(json!({ "pong": true }))))
//!     .build();
//!
//! let mut req = Request::http(Method::GET, "/ping");
//! app.execute(&mut req);
//! assert_eq!(req.response().get("pong"), Some(&json!(true)));
//! # Ok::<(), dais::Error>(())
//! ```

use crate::config::{Config, Environment};
use crate::db::Database;
use crate::error::{error_payload, Error, ErrorKind};
use crate::presenter::PresenterFactory;
use crate::registry::{CallbackRegistry, PresenterRegistry};
use crate::request::{Request, MAX_DISPATCH_DEPTH};
use crate::response::ERROR_FIELD;
use crate::router::{
    param_get, params_map, RouteKind, RouteParams, Router, NAMESPACE_PARAM, PRESENTER_PARAM,
    TARGET_PARAM,
};
use crate::security::{AccessValidator, SecretParamValidator};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, error, info, warn};

/// One-time setup hook, run inside the lazy-init gate with the engine's
/// configuration.
pub type InitHook = Box<dyn Fn(&Config) -> Result<(), Error> + Send + Sync>;

type RouterFactory = Box<dyn Fn(&Config) -> Result<Arc<dyn Router>, Error> + Send + Sync>;

/// Emitted verbatim when the response layer itself has failed; kept free
/// of the error formatter so a broken response cannot recurse into it.
const EMISSION_FALLBACK: &[u8] = b"Internal error: the response could not be serialized.\n";

enum RouterSource {
    Ready(Arc<dyn Router>),
    Factory(RouterFactory),
}

impl RouterSource {
    fn make(&self, config: &Config) -> Result<Arc<dyn Router>, Error> {
        match self {
            RouterSource::Ready(router) => Ok(Arc::clone(router)),
            RouterSource::Factory(factory) => factory(config),
        }
    }
}

/// The dispatch engine. Build one with [`Application::builder`], share it
/// freely, and feed it requests through [`Application::execute`].
pub struct Application {
    config: Arc<Config>,
    env: Environment,
    presenters: PresenterRegistry,
    callbacks: CallbackRegistry,
    router_source: Option<RouterSource>,
    router: OnceCell<Arc<dyn Router>>,
    db: Option<Arc<dyn Database>>,
    validator: Arc<dyn AccessValidator>,
    init_hook: Option<InitHook>,
    initialized: OnceCell<()>,
}

impl Application {
    pub fn builder(config: Config) -> ApplicationBuilder {
        ApplicationBuilder {
            config,
            presenters: PresenterRegistry::new(),
            callbacks: CallbackRegistry::new(),
            router: None,
            db: None,
            validator: None,
            init_hook: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.env
    }

    /// Database collaborator, if one was attached.
    pub fn database(&self) -> Option<&dyn Database> {
        self.db.as_deref()
    }

    /// Whether the one-time init has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized.get().is_some()
    }

    /// Run one dispatch. The outcome, success or any failure, lands in
    /// the request's response; nothing escapes to the caller.
    pub fn execute(&self, req: &mut Request) {
        let span = debug_span!(
            "dispatch",
            id = %req.id(),
            method = %req.method(),
            path = %req.path(),
            depth = req.depth()
        );
        let _guard = span.enter();
        let start = Instant::now();
        if let Err(err) = self.dispatch(req) {
            self.handle_error(req, &err);
        }
        info!(
            status = req.response().status(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "dispatch complete"
        );
    }

    /// Serialize the response for emission. A serialization failure is the
    /// one class of fault `execute` cannot translate, handled here by the
    /// last-resort path instead.
    pub fn finish(&self, req: &mut Request) -> Vec<u8> {
        match req.response_mut().render() {
            Ok(bytes) => bytes,
            Err(err) => self.handle_response_error(req, &err),
        }
    }

    fn dispatch(&self, req: &mut Request) -> Result<(), Error> {
        self.ensure_initialized(req)?;

        if req.depth() > MAX_DISPATCH_DEPTH {
            warn!(
                depth = req.depth(),
                limit = MAX_DISPATCH_DEPTH,
                path = %req.path(),
                "dispatch depth ceiling hit"
            );
            return Err(Error::nesting_limit(MAX_DISPATCH_DEPTH, req.path()));
        }

        let Some(router) = self.router.get() else {
            return Err(Error::router_missing());
        };

        let mut params = RouteParams::new();
        let kind = router.match_route(req, &mut params);
        debug!(kind = %kind, path = %req.path(), depth = req.depth(), "route resolved");

        match kind {
            RouteKind::Mvp => self.dispatch_presenter(req, &params),
            RouteKind::Simple | RouteKind::Callback => self.dispatch_callback(req, &params),
            RouteKind::None => Err(Error::not_found(req.path())),
        }
    }

    /// Lazy one-time setup: base-path propagation, access validation,
    /// router binding, then the user hook. The initialized flag flips only
    /// after every step succeeds; a failed attempt leaves the gate open so
    /// the next dispatch retries from the top.
    fn ensure_initialized(&self, req: &mut Request) -> Result<(), Error> {
        if self.initialized.get().is_some() {
            return Ok(());
        }

        if req.is_transport_bound() && req.base_path().is_none() {
            if let Some(base) = self.config.base_path() {
                req.set_base_path(base);
            }
        }

        let req = &*req;
        self.initialized
            .get_or_try_init(|| -> Result<(), Error> {
                debug!(env = %self.env, "initializing dispatch engine");
                self.validator.validate(&self.config, req)?;
                if let Some(source) = &self.router_source {
                    // A router constructed by an earlier failed attempt is
                    // kept and reused rather than rebuilt.
                    self.router.get_or_try_init(|| source.make(&self.config))?;
                }
                if let Some(hook) = &self.init_hook {
                    hook(&self.config)?;
                }
                info!(env = %self.env, "dispatch engine initialized");
                Ok(())
            })
            .map(|_| ())
    }

    fn dispatch_presenter(&self, req: &mut Request, params: &RouteParams) -> Result<(), Error> {
        let namespace = param_get(params, NAMESPACE_PARAM).unwrap_or_default();
        let presenter = param_get(params, PRESENTER_PARAM).unwrap_or_default();
        let Some(mut instance) = self.presenters.create(namespace, presenter) else {
            warn!(namespace, presenter, path = %req.path(), "no presenter registered");
            return Err(Error::not_found(req.path()));
        };
        self.merge_params(req, params);
        info!(namespace, presenter, path = %req.path(), "dispatching presenter");
        self.invoke(req, |app, req| instance.present(app, req))
    }

    fn dispatch_callback(&self, req: &mut Request, params: &RouteParams) -> Result<(), Error> {
        let target = param_get(params, TARGET_PARAM).unwrap_or_default();
        let Some(callback) = self.callbacks.get(target) else {
            warn!(target, path = %req.path(), "callback target is not invokable");
            return Err(Error::bad_handler(target));
        };
        self.merge_params(req, params);
        info!(target, path = %req.path(), "dispatching callback");
        let produced = self.invoke(req, |app, req| callback(app, req))?;
        if let Some(value) = produced {
            req.response_mut().set_value(value);
        }
        Ok(())
    }

    /// Route params land in the request's own params so handlers and the
    /// debug snapshot see them.
    fn merge_params(&self, req: &mut Request, params: &RouteParams) {
        for (key, value) in params_map(params) {
            req.set_param(key, value);
        }
    }

    /// Call into handler code with a panic net: a panicking handler turns
    /// into a handler-category failure instead of unwinding through the
    /// engine.
    fn invoke<T>(
        &self,
        req: &mut Request,
        f: impl FnOnce(&Application, &mut Request) -> Result<T, Error>,
    ) -> Result<T, Error> {
        match catch_unwind(AssertUnwindSafe(|| f(self, req))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(message = %message, path = %req.path(), "handler panicked");
                Err(Error::handler(anyhow::anyhow!(
                    "handler panicked: {message}"
                )))
            }
        }
    }

    /// Failure interception: clear the response, apply the status hint,
    /// and write the formatted payload under the reserved `error` field.
    fn handle_error(&self, req: &mut Request, err: &Error) {
        match err.kind() {
            ErrorKind::NotFound { .. } | ErrorKind::Unauthorized { .. } => warn!(
                code = err.code(),
                kind = err.kind_tag(),
                status = err.status(),
                path = %req.path(),
                error = %err,
                "dispatch failed"
            ),
            _ => error!(
                code = err.code(),
                kind = err.kind_tag(),
                status = err.status(),
                location = %err.location(),
                path = %req.path(),
                error = %err,
                "dispatch failed"
            ),
        }
        let payload = error_payload(err, self.env, Some(req));
        let resp = req.response_mut();
        resp.clear();
        resp.set_status(err.status());
        resp.insert(ERROR_FIELD, payload);
    }

    /// Last-resort path for response-phase failures: clear, force a 500 on
    /// transport-bound responses, and emit a static diagnostic without
    /// touching the error formatter.
    fn handle_response_error(&self, req: &mut Request, err: &Error) -> Vec<u8> {
        error!(
            code = err.code(),
            path = %req.path(),
            error = %err,
            "response emission failed, sending static fallback"
        );
        let resp = req.response_mut();
        resp.clear();
        resp.set_status(500);
        EMISSION_FALLBACK.to_vec()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Configures and assembles an [`Application`].
pub struct ApplicationBuilder {
    config: Config,
    presenters: PresenterRegistry,
    callbacks: CallbackRegistry,
    router: Option<RouterSource>,
    db: Option<Arc<dyn Database>>,
    validator: Option<Arc<dyn AccessValidator>>,
    init_hook: Option<InitHook>,
}

impl ApplicationBuilder {
    /// Bind a ready-made router.
    pub fn router(mut self, router: impl Router + 'static) -> Self {
        self.router = Some(RouterSource::Ready(Arc::new(router)));
        self
    }

    /// Defer router construction to the init gate; the factory receives
    /// the configuration and runs at most once.
    pub fn router_with<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Config) -> Result<Arc<dyn Router>, Error> + Send + Sync + 'static,
    {
        self.router = Some(RouterSource::Factory(Box::new(factory)));
        self
    }

    /// Register a closure-backed presenter under `(namespace, presenter)`.
    pub fn presenter<F>(mut self, namespace: &str, presenter: &str, f: F) -> Self
    where
        F: FnMut(&Application, &mut Request) -> Result<(), Error> + Clone + Send + Sync + 'static,
    {
        self.presenters.register_fn(namespace, presenter, f);
        self
    }

    /// Register a presenter factory under `(namespace, presenter)`.
    pub fn presenter_factory(
        mut self,
        namespace: &str,
        presenter: &str,
        factory: PresenterFactory,
    ) -> Self {
        self.presenters.register(namespace, presenter, factory);
        self
    }

    /// Register a callback under `target`.
    pub fn callback<F>(mut self, target: &str, f: F) -> Self
    where
        F: Fn(&Application, &mut Request) -> Result<Option<Value>, Error> + Send + Sync + 'static,
    {
        self.callbacks.register_fn(target, f);
        self
    }

    /// Replace the presenter registry wholesale.
    pub fn presenters(mut self, registry: PresenterRegistry) -> Self {
        self.presenters = registry;
        self
    }

    /// Replace the callback registry wholesale.
    pub fn callbacks(mut self, registry: CallbackRegistry) -> Self {
        self.callbacks = registry;
        self
    }

    pub fn database(mut self, db: Arc<dyn Database>) -> Self {
        self.db = Some(db);
        self
    }

    /// Override the access validator. The default checks the request's
    /// secret query parameter whenever the configuration carries one.
    pub fn validator(mut self, validator: impl AccessValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// One-time setup hook, run inside the lazy-init gate.
    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Config) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.init_hook = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Application {
        let env = self.config.environment();
        Application {
            config: Arc::new(self.config),
            env,
            presenters: self.presenters,
            callbacks: self.callbacks,
            router_source: self.router,
            router: OnceCell::new(),
            db: self.db,
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(SecretParamValidator::new())),
            init_hook: self.init_hook,
            initialized: OnceCell::new(),
        }
    }
}
