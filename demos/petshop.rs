//! Minimal pet-shop host: a presenter, a couple of callbacks, and the
//! failure paths, all driven through one engine.
//!
//! Run with `cargo run --example petshop`; set `RUST_LOG=dais=debug` to
//! watch the dispatch internals.

use dais::{Application, Config, Environment, Error, Presenter, Request, TableRouter};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Serves one pet per dispatch, looked up from a fixed kennel.
struct PetPresenter;

impl Presenter for PetPresenter {
    fn present(&mut self, _app: &Application, req: &mut Request) -> Result<(), Error> {
        let id = req.param_str("id").unwrap_or_default();
        let pet = match id {
            "1" => json!({ "id": 1, "name": "Rex", "breed": "Golden Retriever" }),
            "2" => json!({ "id": 2, "name": "Bella", "breed": "Dachshund" }),
            _ => return Err(Error::not_found(req.path())),
        };
        req.response_mut().insert("pet", pet);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let router = TableRouter::new()
        .presenter(Method::GET, "/pets/{id}", "shop", "pet")?
        .presenter(Method::GET, "/overview", "pages", "overview")?
        .callback(Method::GET, "/pets", "list_pets")?
        .simple(Method::GET, "/health", "health")?;

    let config = Config::builder()
        .environment(Environment::Development)
        .build();

    let app = Application::builder(config)
        .router(router)
        .presenter_factory(
            "shop",
            "pet",
            Arc::new(|| Box::new(PetPresenter) as Box<dyn Presenter>),
        )
        .presenter("pages", "overview", |app, req| {
            // Compose the health sub-response into this page.
            let mut sub = req.subrequest(Method::GET, "/health");
            app.execute(&mut sub);
            let health = sub.response().value().clone();
            req.response_mut().insert("health", health);
            req.response_mut().insert("page", json!("overview"));
            Ok(())
        })
        .callback("list_pets", |_app, _req| {
            Ok(Some(json!({ "pets": [
                { "id": 1, "name": "Rex" },
                { "id": 2, "name": "Bella" },
            ]})))
        })
        .callback("health", |_app, req| {
            req.response_mut().insert("status", json!("ok"));
            Ok(None)
        })
        .on_init(|_config| {
            println!("engine initialized");
            Ok(())
        })
        .build();

    for target in ["/pets/1", "/pets", "/overview", "/pets/99", "/nowhere"] {
        let mut req = Request::http(Method::GET, target);
        app.execute(&mut req);
        let status = req.response().status();
        let body = app.finish(&mut req);
        println!("GET {target} -> {status} {}", String::from_utf8_lossy(&body));
    }

    Ok(())
}
