//! Handler registries.
//!
//! The engine never instantiates handlers by name reflection; it only
//! knows what was registered here. Presenters are keyed by
//! `(namespace, presenter)`, callbacks by their target name. Both
//! registries are filled while building the [`Application`](crate::Application)
//! and are immutable afterwards.

use crate::app::Application;
use crate::error::Error;
use crate::presenter::{Callback, FnPresenter, Presenter, PresenterFactory};
use crate::request::Request;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Presenter factories keyed by `(namespace, presenter)`.
#[derive(Default)]
pub struct PresenterRegistry {
    factories: HashMap<(String, String), PresenterFactory>,
}

impl PresenterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, namespace: &str, presenter: &str, factory: PresenterFactory) {
        self.factories
            .insert((namespace.to_string(), presenter.to_string()), factory);
    }

    /// Register a factory closure without wrapping it in an `Arc` yourself.
    pub fn register_with<F>(&mut self, namespace: &str, presenter: &str, factory: F)
    where
        F: Fn() -> Box<dyn Presenter> + Send + Sync + 'static,
    {
        self.register(namespace, presenter, Arc::new(factory));
    }

    /// Register a closure-backed presenter. The closure is cloned into each
    /// fresh instance.
    pub fn register_fn<F>(&mut self, namespace: &str, presenter: &str, f: F)
    where
        F: FnMut(&Application, &mut Request) -> Result<(), Error> + Clone + Send + Sync + 'static,
    {
        self.register_with(namespace, presenter, move || {
            Box::new(FnPresenter::new(f.clone())) as Box<dyn Presenter>
        });
    }

    /// Instantiate a fresh presenter, or `None` if nothing is registered
    /// under the pair.
    pub fn create(&self, namespace: &str, presenter: &str) -> Option<Box<dyn Presenter>> {
        self.factories
            .get(&(namespace.to_string(), presenter.to_string()))
            .map(|factory| factory())
    }

    pub fn contains(&self, namespace: &str, presenter: &str) -> bool {
        self.factories
            .contains_key(&(namespace.to_string(), presenter.to_string()))
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Callbacks keyed by target name.
#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: HashMap<String, Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: &str, callback: Callback) {
        self.callbacks.insert(target.to_string(), callback);
    }

    pub fn register_fn<F>(&mut self, target: &str, f: F)
    where
        F: Fn(&Application, &mut Request) -> Result<Option<Value>, Error> + Send + Sync + 'static,
    {
        self.register(target, Arc::new(f));
    }

    pub fn get(&self, target: &str) -> Option<Callback> {
        self.callbacks.get(target).cloned()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.callbacks.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_create_builds_a_fresh_instance_per_call() {
        let made = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&made);
        let mut reg = PresenterRegistry::new();
        reg.register_with("shop", "pet", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(FnPresenter::new(|_app, _req| Ok(()))) as Box<dyn Presenter>
        });

        assert!(reg.create("shop", "pet").is_some());
        assert!(reg.create("shop", "pet").is_some());
        assert_eq!(made.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregistered_presenter_is_none() {
        let reg = PresenterRegistry::new();
        assert!(reg.create("shop", "missing").is_none());
        assert!(!reg.contains("shop", "missing"));
    }

    #[test]
    fn test_callback_lookup() {
        let mut reg = CallbackRegistry::new();
        reg.register_fn("ping", |_app, _req| Ok(Some(Value::from("pong"))));
        assert!(reg.contains("ping"));
        assert!(reg.get("ping").is_some());
        assert!(reg.get("pong").is_none());
    }
}
