//! Handler contracts: presenters and callbacks.
//!
//! A presenter is a short-lived object created by a registered factory for
//! exactly one dispatch; a callback is a bare function. Both receive the
//! engine so they can issue nested dispatches, and write their output into
//! the request's response.

use crate::app::Application;
use crate::error::Error;
use crate::request::Request;
use serde_json::Value;
use std::sync::Arc;

/// Presenter-side handler contract for `MVP` routes.
///
/// One instance serves one dispatch, so implementations are free to keep
/// per-call state in `&mut self`. Failures should go through
/// [`Error::handler`] unless a more specific kind applies.
pub trait Presenter {
    fn present(&mut self, app: &Application, req: &mut Request) -> Result<(), Error>;
}

/// Creates a fresh presenter per dispatch.
pub type PresenterFactory = Arc<dyn Fn() -> Box<dyn Presenter> + Send + Sync>;

/// Handler contract for `SIMPLE` and `CALLBACK` routes.
///
/// Returning `Ok(Some(value))` replaces the response body wholesale;
/// `Ok(None)` keeps whatever the callback wrote into the request's
/// response directly.
pub type Callback =
    Arc<dyn Fn(&Application, &mut Request) -> Result<Option<Value>, Error> + Send + Sync>;

/// Adapter turning a plain closure into a [`Presenter`].
pub struct FnPresenter<F>(F);

impl<F> FnPresenter<F>
where
    F: FnMut(&Application, &mut Request) -> Result<(), Error>,
{
    pub fn new(f: F) -> Self {
        FnPresenter(f)
    }
}

impl<F> Presenter for FnPresenter<F>
where
    F: FnMut(&Application, &mut Request) -> Result<(), Error>,
{
    fn present(&mut self, app: &Application, req: &mut Request) -> Result<(), Error> {
        (self.0)(app, req)
    }
}
