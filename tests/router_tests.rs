//! Tests for route matching and the router contract.
//!
//! # Test Coverage
//!
//! - Insertion-order precedence in the table router
//! - Multi-placeholder capture and literal-segment escaping
//! - Route params flowing through the engine into handler-visible
//!   request params
//! - Custom `Router` implementations plugged into the engine

mod tracing_util;

use dais::{
    Application, Config, Environment, Request, RouteKind, RouteParams, Router, TableRouter,
};
use http::Method;
use serde_json::json;
use tracing_util::TestTracing;

fn dev_config() -> Config {
    Config::builder().environment(Environment::Development).build()
}

#[test]
fn test_first_matching_route_wins() {
    let _tracing = TestTracing::init();
    let router = TableRouter::new()
        .simple(Method::GET, "/pets/special", "special")
        .and_then(|r| r.simple(Method::GET, "/pets/{id}", "by_id"))
        .expect("route table");

    let mut params = RouteParams::new();
    let req = Request::new(Method::GET, "/pets/special");
    assert_eq!(router.match_route(&req, &mut params), RouteKind::Simple);
    assert_eq!(
        dais::router::param_get(&params, dais::router::TARGET_PARAM),
        Some("special")
    );
}

#[test]
fn test_multiple_placeholders_capture_independently() {
    let _tracing = TestTracing::init();
    let router = TableRouter::new()
        .presenter(Method::GET, "/users/{user_id}/posts/{post_id}", "blog", "post")
        .expect("route table");

    let mut params = RouteParams::new();
    let req = Request::new(Method::GET, "/users/abc-123/posts/post1");
    assert_eq!(router.match_route(&req, &mut params), RouteKind::Mvp);
    assert_eq!(dais::router::param_get(&params, "user_id"), Some("abc-123"));
    assert_eq!(dais::router::param_get(&params, "post_id"), Some("post1"));
}

#[test]
fn test_literal_segments_are_escaped() {
    let _tracing = TestTracing::init();
    let router = TableRouter::new()
        .simple(Method::GET, "/v1.0/status", "status")
        .expect("route table");

    let mut params = RouteParams::new();
    let dotted = Request::new(Method::GET, "/v1.0/status");
    assert_eq!(router.match_route(&dotted, &mut params), RouteKind::Simple);

    // A dot in the pattern is a literal dot, not a wildcard.
    let mut params = RouteParams::new();
    let spoofed = Request::new(Method::GET, "/v1x0/status");
    assert_eq!(router.match_route(&spoofed, &mut params), RouteKind::None);
}

#[test]
fn test_route_params_are_visible_to_handlers() {
    let _tracing = TestTracing::init();
    let router = TableRouter::new()
        .presenter(Method::GET, "/pets/{id}", "shop", "pet")
        .expect("route table");
    let app = Application::builder(dev_config())
        .router(router)
        .presenter("shop", "pet", |_app, req| {
            let seen = json!({
                "id": req.param_str("id"),
                "namespace": req.param_str("namespace"),
                "presenter": req.param_str("presenter"),
            });
            req.response_mut().insert("seen", seen);
            Ok(())
        })
        .build();

    let mut req = Request::http(Method::GET, "/pets/42?id=ignored");
    app.execute(&mut req);

    // Route captures shadow query params of the same name.
    assert_eq!(
        req.response().get("seen"),
        Some(&json!({
            "id": "42",
            "namespace": "shop",
            "presenter": "pet",
        }))
    );
}

#[test]
fn test_custom_router_drives_the_engine() {
    let _tracing = TestTracing::init();

    /// Routes everything under `/jobs/` to one callback target.
    struct PrefixRouter;

    impl Router for PrefixRouter {
        fn match_route(&self, req: &Request, params: &mut RouteParams) -> RouteKind {
            if req.path().starts_with("/jobs/") {
                dais::router::param_set(params, dais::router::TARGET_PARAM, "run_job");
                dais::router::param_set(params, "job", req.path()["/jobs/".len()..].to_string());
                RouteKind::Callback
            } else {
                RouteKind::None
            }
        }
    }

    let app = Application::builder(dev_config())
        .router(PrefixRouter)
        .callback("run_job", |_app, req| {
            Ok(Some(json!({ "job": req.param_str("job") })))
        })
        .build();

    let mut req = Request::http(Method::GET, "/jobs/reindex");
    app.execute(&mut req);
    assert_eq!(req.response().value(), &json!({ "job": "reindex" }));

    let mut miss = Request::http(Method::GET, "/tasks/reindex");
    app.execute(&mut miss);
    assert_eq!(miss.response().value()["error"]["type"], json!("not_found"));
}
