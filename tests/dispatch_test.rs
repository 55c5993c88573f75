//! Dispatch behaviour: routing, groups, redirects and status escalation.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use switchyard::context::ErrorType;
use switchyard::{handler, Engine, EngineConfig, GroupId};

mod common;
use common::{body_text, get, location, request};

fn echo_params() -> switchyard::Handler {
    handler(|ctx| {
        let body = ctx
            .params()
            .iter()
            .map(|p| format!("{}={}", p.key, p.value))
            .collect::<Vec<_>>()
            .join("&");
        ctx.writer_mut().write_str(&body);
    })
}

#[test]
fn test_literal_routes_have_no_params() {
    let mut engine = Engine::new();
    let mut root = engine.root();
    for path in ["/", "/a", "/a/b", "/contact", "/co", "/c"] {
        root.get(path, echo_params());
    }

    for path in ["/", "/a", "/a/b", "/contact", "/co", "/c"] {
        let hit = engine.lookup(&Method::GET, path);
        assert!(hit.value.is_some(), "{path} should match");
        assert!(hit.params.is_empty());

        let response = engine.dispatch(get(path));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(&response), "");
    }
}

#[test]
fn test_param_extraction() {
    let mut engine = Engine::new();
    engine.root().get("/users/:id", echo_params());

    let hit = engine.lookup(&Method::GET, "/users/42");
    assert_eq!(hit.params.get("id"), Some("42"));
    assert!(engine.lookup(&Method::GET, "/users/").value.is_none());

    let response = engine.dispatch(get("/users/42"));
    assert_eq!(body_text(&response), "id=42");

    let response = engine.dispatch(get("/users/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_catch_all_route() {
    let mut engine = Engine::new();
    engine.root().get("/static/*filepath", echo_params());

    let response = engine.dispatch(get("/static/css/site.css"));
    assert_eq!(body_text(&response), "filepath=css/site.css");
}

#[test]
fn test_group_prefix_and_ownership() {
    let mut engine = Engine::new();
    let api = engine.root().group("/api").id();
    let v1 = engine.group(api).unwrap().group("/v1").id();
    engine.group(v1).unwrap().get(
        "/whoami",
        handler(|ctx| {
            let body = ctx.group().to_string();
            ctx.writer_mut().write_str(&body);
        }),
    );

    assert_eq!(engine.groups().get(v1).unwrap().prefix(), "/api/v1");
    assert_eq!(engine.lookup(&Method::GET, "/api/v1/whoami").value.unwrap().group(), v1);

    let response = engine.dispatch(get("/api/v1/whoami"));
    assert_eq!(body_text(&response), v1.to_string());
}

#[test]
fn test_trailing_slash_redirect() {
    let mut engine = Engine::new();
    engine
        .root()
        .get("/test_group", echo_params())
        .post("/test_group", echo_params());

    let response = engine.dispatch(get("/test_group/"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), Some("/test_group"));

    let response = engine.dispatch(request(Method::POST, "/test_group/"));
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), Some("/test_group"));

    let response = engine.dispatch(get("/test_group/?page=2"));
    assert_eq!(location(&response), Some("/test_group?page=2"));
}

#[test]
fn test_trailing_slash_redirect_disabled() {
    let config = EngineConfig::builder()
        .redirect_trailing_slash(false)
        .build()
        .unwrap();
    let mut engine = Engine::with_config(config);
    engine.root().get("/test_group", echo_params());

    let response = engine.dispatch(get("/test_group/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(location(&response).is_none());
}

#[test]
fn test_fixed_path_redirect() {
    let mut engine = Engine::new();
    engine.root().get("/User/:name", echo_params());

    let response = engine.dispatch(get("/user/Bob"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), Some("/User/Bob"));

    let response = engine.dispatch(get("/USER/../User/Bob"));
    assert_eq!(location(&response), Some("/User/Bob"));

    let config = EngineConfig::builder()
        .redirect_fixed_path(false)
        .build()
        .unwrap();
    let mut engine = Engine::with_config(config);
    engine.root().get("/User/:name", echo_params());
    assert_eq!(engine.dispatch(get("/user/Bob")).status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_no_redirect_for_connect_or_root() {
    let mut engine = Engine::new();
    engine
        .root()
        .handle(Method::CONNECT, "/tunnel", [echo_params()])
        .get("/Home", echo_params());

    let response = engine.dispatch(request(Method::CONNECT, "/tunnel/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = engine.dispatch(get("/"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_status_override_runs_between_before_and_after() {
    let config = EngineConfig::builder().html_status(true).build().unwrap();
    let mut engine = Engine::with_config(config);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let brew = handler(|ctx| ctx.status(StatusCode::IM_A_TEAPOT));
    let a = engine.root().group("/a").id();
    let b = engine.root().group("/b").id();

    let log = Arc::clone(&seen);
    engine
        .group(a)
        .unwrap()
        .get("/brew", brew.clone())
        .status(
            StatusCode::IM_A_TEAPOT,
            [handler(move |ctx| {
                log.lock()
                    .unwrap()
                    .push((ctx.writer().status(), ctx.writer().written()));
            })],
        );
    engine.group(b).unwrap().get("/brew", brew);

    let response = engine.dispatch(get("/a/brew"));
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    // before already set the status, after has not written yet
    assert_eq!(*seen.lock().unwrap(), vec![(StatusCode::IM_A_TEAPOT, false)]);
    assert!(body_text(&response).contains("<title>418 I'm a teapot</title>"));

    let response = engine.dispatch(get("/b/brew"));
    assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(seen.lock().unwrap().len(), 1);

    assert_eq!(engine.groups().resolve(a, StatusCode::IM_A_TEAPOT).unwrap().len(), 3);
    assert_eq!(engine.groups().resolve(b, StatusCode::IM_A_TEAPOT).unwrap().len(), 2);
    assert_eq!(
        engine.groups().resolve(GroupId::ROOT, StatusCode::IM_A_TEAPOT).unwrap().len(),
        2
    );
}

#[test]
fn test_custom_handler_writes_first() {
    let mut engine = Engine::new();
    engine.root().status(
        StatusCode::NOT_FOUND,
        [handler(|ctx| {
            ctx.writer_mut().write_str("nothing here");
        })],
    );

    let response = engine.dispatch(get("/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(&response), "nothing here");
}

#[test]
fn test_status_pages() {
    let response = Engine::new().dispatch(get("/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.body().is_empty());

    let config = EngineConfig::builder().html_status(true).build().unwrap();
    let response = Engine::with_config(config).dispatch(get("/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    let body = body_text(&response);
    assert!(body.starts_with("<!DOCTYPE HTML>\n<title>404 Not Found</title>"));
    assert!(body.contains("The requested URL was not found on the server."));
}

#[test]
fn test_status_message_override() {
    let config = EngineConfig::builder().html_status(true).build().unwrap();
    let mut engine = Engine::with_config(config);
    engine
        .root()
        .status_message(StatusCode::NOT_FOUND, "Try the index.", Vec::<switchyard::Handler>::new());

    let body = body_text(&engine.dispatch(get("/missing")));
    assert!(body.contains("<p>Try the index.</p>"));
}

#[test]
fn test_external_errors_do_not_change_status() {
    let mut engine = Engine::new();
    engine.root().get(
        "/warn",
        handler(|ctx| {
            ctx.error("soft failure", json!({"retry": true}));
            let errors = ctx.errors();
            assert_eq!(errors.by_type(ErrorType::EXTERNAL).count(), 1);
            assert_eq!(errors.last().unwrap().meta, json!({"retry": true}));
            ctx.writer_mut().write_str("ok");
        }),
    );

    let response = engine.dispatch(get("/warn"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(&response), "ok");
}

#[test]
fn test_form_values() {
    let mut engine = Engine::new();
    engine.root().post(
        "/submit",
        handler(|ctx| {
            let name = ctx.form_value("name").unwrap_or("-").to_string();
            let page = ctx.form_value("page").unwrap_or("-").to_string();
            let count = ctx.form().len();
            ctx.writer_mut().write_str(&format!("{name} {page} {count}"));
        }),
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/submit?page=2")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"name=J%C3%B8rn&tag=a&tag=b"))
        .unwrap();
    assert_eq!(body_text(&engine.dispatch(request)), "Jørn 2 4");
}

#[test]
fn test_oversized_form_is_recorded() {
    let config = EngineConfig::builder().max_form_memory(8).build().unwrap();
    let mut engine = Engine::with_config(config);
    engine.root().post(
        "/submit",
        handler(|ctx| {
            assert!(ctx.form_value("name").is_none());
            let internal = ctx.errors().by_type(ErrorType::INTERNAL).count();
            ctx.writer_mut().write_str(&internal.to_string());
        }),
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::from_static(b"name=far-too-long"))
        .unwrap();
    assert_eq!(body_text(&engine.dispatch(request)), "1");
}

#[test]
fn test_pool_round_trip_leaves_no_residue() {
    let mut engine = Engine::new();
    engine.root().get(
        "/users/:id",
        handler(|ctx| {
            assert_eq!(ctx.params().len(), 1);
            assert!(ctx.errors().is_empty());
            assert!(!ctx.writer().written());
            ctx.error("leftover?", json!(null));
            let id = ctx.param("id").unwrap_or_default().to_string();
            ctx.writer_mut().write_str(&id);
        }),
    );
    let engine = Arc::new(engine);

    std::thread::scope(|scope| {
        for t in 0..8 {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                for i in 0..50 {
                    let id = format!("{t}-{i}");
                    let response = engine.dispatch(get(&format!("/users/{id}")));
                    assert_eq!(body_text(&response), id);
                }
            });
        }
    });

    let pool = engine.pool();
    assert!(pool.created() <= 8);
    let idle = pool.idle();
    assert!(idle >= 1);

    let contexts: Vec<_> = (0..idle).map(|_| pool.acquire()).collect();
    for cx in &contexts {
        assert!(cx.params().is_empty());
        assert!(cx.errors().is_empty());
        assert!(!cx.writer().written());
    }
    for cx in contexts {
        pool.release(cx);
    }
    assert_eq!(pool.idle(), idle);
}

#[test]
fn test_encoded_paths_are_decoded_before_matching() {
    let mut engine = Engine::new();
    let mut root = engine.root();
    root.get("/hello/:name", echo_params());
    root.get("/caf\u{e9}", handler(|ctx| {
        ctx.writer_mut().write_str("coffee");
    }));
    root.get("/caf\u{e9}/menu/", echo_params());

    let response = engine.dispatch(get("/hello/J%C3%B8rn%20X"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(&response), "name=Jørn X");

    let response = engine.dispatch(get("/caf%C3%A9"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(&response), "coffee");

    // redirect targets go back on the wire encoded
    let response = engine.dispatch(get("/caf%C3%A9/menu?lang=en"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), Some("/caf%C3%A9/menu/?lang=en"));

    let response = engine.dispatch(get("/CAF%C3%A9"));
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), Some("/caf%C3%A9"));
}

#[test]
fn test_fail_records_message_as_meta() {
    let mut engine = Engine::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let after = Arc::clone(&seen);
    engine.root().handle(
        Method::GET,
        "/down",
        [
            handler(|ctx| {
                ctx.fail(StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
                let last = ctx.errors().last().unwrap();
                assert_eq!(last.err, "database unavailable");
                assert_eq!(last.meta, json!("database unavailable"));
            }),
            handler(move |_| after.lock().unwrap().push("second")),
        ],
    );

    let response = engine.dispatch(get("/down"));
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(seen.lock().unwrap().is_empty());
}
