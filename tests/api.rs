//! End-to-end behaviour of the assembled pipeline, driven in-process.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use jsongate::{bootstrap, App, Config, Database, Request, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

const DB: &str = r#"{"posts":[{"id":1,"title":"a"}],"profile":{"name":"typicode"}}"#;

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    app: App,
}

async fn fixture_with(config: Config) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, DB).unwrap();

    let db = Arc::new(Database::open(&path).await.unwrap());
    let app = bootstrap::app(db, &config);
    Fixture { _dir: dir, path, app }
}

async fn fixture() -> Fixture {
    fixture_with(Config::default()).await
}

fn request(method: &str, uri: &str, auth: Option<&str>, body: &str) -> Request {
    let mut builder = http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    Request::new(builder.body(Bytes::from(body.to_owned())).unwrap()).unwrap()
}

fn json_body(res: &Response) -> Value {
    serde_json::from_slice(res.body()).unwrap()
}

#[tokio::test]
async fn authorized_list_is_201_with_payload() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/posts", Some("Bearer x"), "")).await;

    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(res.body(), br#"[{"id":1,"title":"a"}]"#);
}

#[tokio::test]
async fn missing_authorization_is_empty_401() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/posts", None, "")).await;

    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert!(res.body().is_empty());
}

#[tokio::test]
async fn empty_authorization_is_401() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/posts", Some(""), "")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn gate_runs_before_routing() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/does-not-exist", None, "")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);

    let res = f.app.handle(request("POST", "/posts", None, r#"{"title":"b"}"#)).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    let stored: Value = serde_json::from_slice(&std::fs::read(&f.path).unwrap()).unwrap();
    assert_eq!(stored["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn create_assigns_id_and_persists() {
    let f = fixture().await;
    let res = f.app.handle(request("POST", "/posts", Some("Bearer x"), r#"{"title":"b"}"#)).await;

    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(json_body(&res), json!({"id": 2, "title": "b"}));

    let stored: Value = serde_json::from_slice(&std::fs::read(&f.path).unwrap()).unwrap();
    assert_eq!(stored["posts"][1], json!({"id": 2, "title": "b"}));

    let res = f.app.handle(request("GET", "/posts/2", Some("Bearer x"), "")).await;
    assert_eq!(json_body(&res)["title"], "b");
}

#[tokio::test]
async fn every_successful_verb_answers_201() {
    let f = fixture().await;
    let auth = Some("token");

    let cases = [
        ("GET", "/posts/1", ""),
        ("PUT", "/posts/1", r#"{"title":"z"}"#),
        ("PATCH", "/posts/1", r#"{"views":1}"#),
        ("GET", "/profile", ""),
        ("PATCH", "/profile", r#"{"age":3}"#),
        ("DELETE", "/posts/1", ""),
    ];
    for (method, uri, body) in cases {
        let res = f.app.handle(request(method, uri, auth, body)).await;
        assert_eq!(res.status_code(), StatusCode::CREATED, "{method} {uri}");
    }

    let res = f.app.handle(request("GET", "/posts", auth, "")).await;
    assert_eq!(json_body(&res), json!([]));
}

#[tokio::test]
async fn delete_payload_is_empty_object() {
    let f = fixture().await;
    let res = f.app.handle(request("DELETE", "/posts/1", Some("x"), "")).await;
    assert_eq!(json_body(&res), json!({}));
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let f = fixture().await;
    let first = f.app.handle(request("GET", "/posts/1", Some("x"), "")).await;
    let second = f.app.handle(request("GET", "/posts/1", Some("x"), "")).await;

    assert_eq!(first.status_code(), StatusCode::CREATED);
    assert_eq!(second.status_code(), StatusCode::CREATED);
    assert_eq!(first.body(), second.body());
}

#[tokio::test]
async fn head_is_answered_like_get() {
    let f = fixture().await;

    let res = f.app.handle(request("HEAD", "/posts", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let res = f.app.handle(request("HEAD", "/posts/1", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);

    let res = f.app.handle(request("HEAD", "/posts", None, "")).await;
    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn oversized_paging_values_do_not_fail() {
    let f = fixture().await;
    let uri = "/posts?_page=18446744073709551615&_limit=10";
    let res = f.app.handle(request("GET", uri, Some("x"), "")).await;

    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(json_body(&res), json!([]));
    assert_eq!(res.header("x-total-count"), Some("1"));
}

#[tokio::test]
async fn errors_keep_their_own_status() {
    let f = fixture().await;

    let res = f.app.handle(request("GET", "/posts/99", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(&res), json!({}));

    let res = f.app.handle(request("GET", "/comments", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let res = f.app.handle(request("POST", "/posts", Some("x"), "{oops")).await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);

    let res = f.app.handle(request("POST", "/posts", Some("x"), r#"{"id":1}"#)).await;
    assert_eq!(res.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn callback_parameter_switches_to_jsonp() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/posts/1?callback=show", Some("x"), "")).await;

    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(res.header("content-type"), Some("text/javascript; charset=utf-8"));
    assert_eq!(
        res.body(),
        br#"/**/ typeof show === 'function' && show({"id":1,"title":"a"});"#
    );
}

#[tokio::test]
async fn preflight_needs_no_authorization() {
    let f = fixture().await;
    let mut builder = http::Request::builder()
        .method("OPTIONS")
        .uri("/posts")
        .header("origin", "http://localhost:8080")
        .header("access-control-request-method", "POST");
    builder = builder.header("access-control-request-headers", "authorization");
    let req = Request::new(builder.body(Bytes::new()).unwrap()).unwrap();

    let res = f.app.handle(req).await;
    assert_eq!(res.status_code(), StatusCode::NO_CONTENT);
    assert_eq!(res.header("access-control-allow-origin"), Some("http://localhost:8080"));
    assert_eq!(res.header("access-control-allow-headers"), Some("authorization"));
}

#[tokio::test]
async fn rejected_requests_still_carry_default_headers() {
    let f = fixture().await;
    let res = f.app.handle(request("GET", "/posts", None, "")).await;

    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.header("access-control-allow-origin"), Some("*"));
    assert_eq!(res.header("cache-control"), Some("no-cache"));
}

#[tokio::test]
async fn paging_sets_total_count() {
    let f = fixture().await;
    for title in ["b", "c", "d"] {
        let body = format!(r#"{{"title":"{title}"}}"#);
        f.app.handle(request("POST", "/posts", Some("x"), &body)).await;
    }

    let res = f.app.handle(request("GET", "/posts?_page=2&_limit=3", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert_eq!(res.header("x-total-count"), Some("4"));
    assert_eq!(json_body(&res), json!([{"id": 4, "title": "d"}]));

    let res = f.app.handle(request("GET", "/posts?title=c", Some("x"), "")).await;
    assert_eq!(json_body(&res), json!([{"id": 3, "title": "c"}]));
}

#[tokio::test]
async fn read_only_bundle_forbids_writes() {
    let f = fixture_with(Config { read_only: true, ..Config::default() }).await;

    let res = f.app.handle(request("POST", "/posts", Some("x"), "{}")).await;
    assert_eq!(res.status_code(), StatusCode::FORBIDDEN);

    let res = f.app.handle(request("GET", "/posts", Some("x"), "")).await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
}
