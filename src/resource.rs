//! REST resource router over a [`Database`].
//!
//! Routes are generic over the resource name, so every top-level key of the
//! data file is served without per-resource registration:
//!
//! | Route                     | Collection              | Singular           |
//! |---------------------------|-------------------------|--------------------|
//! | `GET    /{resource}`      | filtered list           | the object         |
//! | `GET    /{resource}/{id}` | one item                | 404                |
//! | `POST   /{resource}`      | insert                  | replace            |
//! | `PUT    /{resource}`      | 404                     | replace            |
//! | `PATCH  /{resource}`      | 404                     | shallow merge      |
//! | `PUT    /{resource}/{id}` | replace, id kept        | 404                |
//! | `PATCH  /{resource}/{id}` | shallow merge, id kept  | 404                |
//! | `DELETE /{resource}/{id}` | remove, payload `{}`    | 404                |
//!
//! Successful results go through the [`Render`] hook; failures never do.

use std::future::Future;
use std::sync::Arc;

use http::header::{self, HeaderName, HeaderValue};
use http::StatusCode;
use serde_json::{Map, Value, json};
use tracing::error;
use url::form_urlencoded;

use crate::handler::Handler;
use crate::method::Method;
use crate::query::ListQuery;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::store::{Database, Kind, StoreError};

const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// Turns a successful result into the response sent to the client.
///
/// Receives the status the router would use by default (201 for a create,
/// 200 otherwise) and the payload.
pub type Render = Arc<dyn Fn(&Request, StatusCode, Value) -> Response + Send + Sync>;

/// The router's own renderer: the suggested status, JSON or JSONP depending
/// on the `callback` query parameter.
pub fn default_render() -> Render {
    Arc::new(|req: &Request, status: StatusCode, payload: Value| {
        Response::builder()
            .status(status)
            .jsonp(req.query("callback"), &payload)
    })
}

/// CRUD handlers bound to one datastore and one renderer.
pub struct Resources {
    db: Arc<Database>,
    render: Render,
}

impl Resources {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db, render: default_render() }
    }

    /// Replaces the success renderer.
    pub fn render<F>(mut self, render: F) -> Self
    where
        F: Fn(&Request, StatusCode, Value) -> Response + Send + Sync + 'static,
    {
        self.render = Arc::new(render);
        self
    }

    /// Registers every resource route on a fresh [`Router`].
    pub fn into_router(self) -> Router {
        let this = Arc::new(self);
        Router::new()
            .on(Method::Get,    "/{resource}",      bind(Arc::clone(&this), Self::list))
            .on(Method::Post,   "/{resource}",      bind(Arc::clone(&this), Self::create))
            .on(Method::Put,    "/{resource}",      bind(Arc::clone(&this), Self::replace_singular))
            .on(Method::Patch,  "/{resource}",      bind(Arc::clone(&this), Self::merge_singular))
            .on(Method::Get,    "/{resource}/{id}", bind(Arc::clone(&this), Self::show))
            .on(Method::Put,    "/{resource}/{id}", bind(Arc::clone(&this), Self::replace))
            .on(Method::Patch,  "/{resource}/{id}", bind(Arc::clone(&this), Self::update))
            .on(Method::Delete, "/{resource}/{id}", bind(Arc::clone(&this), Self::destroy))
    }

    // ── Handlers ──────────────────────────────────────────────────────────────

    async fn list(self: Arc<Self>, req: Request) -> Response {
        let value = match self.db.get(resource(&req)).await {
            Ok(value) => value,
            Err(e) => return failure(e),
        };

        let items = match value {
            Value::Array(items) => items,
            other => return self.ok(&req, StatusCode::OK, other),
        };

        let listing = ListQuery::parse(req.query_pairs()).apply(items);
        let mut res = self.ok(&req, StatusCode::OK, Value::Array(listing.items));
        if let Some(total) = listing.total {
            let headers = res.headers_mut();
            headers.insert(X_TOTAL_COUNT, HeaderValue::from(total));
            headers.insert(
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("X-Total-Count"),
            );
        }
        res
    }

    async fn show(self: Arc<Self>, req: Request) -> Response {
        match self.db.find(resource(&req), id(&req)).await {
            Ok(item) => self.ok(&req, StatusCode::OK, item),
            Err(e) => failure(e),
        }
    }

    async fn create(self: Arc<Self>, req: Request) -> Response {
        let body = match parse_body(&req) {
            Ok(body) => body,
            Err(res) => return res,
        };

        let name = resource(&req);
        let result = match self.db.kind(name).await {
            Some(Kind::Singular) => self.db.set(name, body).await,
            _ => self.db.insert(name, body).await,
        };
        match result {
            Ok(created) => self.ok(&req, StatusCode::CREATED, created),
            Err(e) => failure(e),
        }
    }

    async fn replace(self: Arc<Self>, req: Request) -> Response {
        let body = match parse_body(&req) {
            Ok(body) => body,
            Err(res) => return res,
        };
        match self.db.replace(resource(&req), id(&req), body).await {
            Ok(item) => self.ok(&req, StatusCode::OK, item),
            Err(e) => failure(e),
        }
    }

    async fn update(self: Arc<Self>, req: Request) -> Response {
        let body = match parse_body(&req) {
            Ok(body) => body,
            Err(res) => return res,
        };
        match self.db.update(resource(&req), id(&req), body).await {
            Ok(item) => self.ok(&req, StatusCode::OK, item),
            Err(e) => failure(e),
        }
    }

    async fn destroy(self: Arc<Self>, req: Request) -> Response {
        match self.db.remove(resource(&req), id(&req)).await {
            Ok(_) => self.ok(&req, StatusCode::OK, Value::Object(Map::new())),
            Err(e) => failure(e),
        }
    }

    async fn replace_singular(self: Arc<Self>, req: Request) -> Response {
        let body = match parse_body(&req) {
            Ok(body) => body,
            Err(res) => return res,
        };
        match self.db.set(resource(&req), body).await {
            Ok(value) => self.ok(&req, StatusCode::OK, value),
            Err(e) => failure(e),
        }
    }

    async fn merge_singular(self: Arc<Self>, req: Request) -> Response {
        let body = match parse_body(&req) {
            Ok(body) => body,
            Err(res) => return res,
        };
        match self.db.merge(resource(&req), body).await {
            Ok(value) => self.ok(&req, StatusCode::OK, value),
            Err(e) => failure(e),
        }
    }

    fn ok(&self, req: &Request, status: StatusCode, payload: Value) -> Response {
        (self.render)(req, status, payload)
    }
}

/// Adapts a `Resources` method into a route handler sharing `this`.
fn bind<F, Fut>(this: Arc<Resources>, f: F) -> impl Handler
where
    F: Fn(Arc<Resources>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    move |req: Request| f(Arc::clone(&this), req)
}

fn resource(req: &Request) -> &str {
    req.param("resource").unwrap_or_default()
}

fn id(req: &Request) -> &str {
    req.param("id").unwrap_or_default()
}

/// An empty body reads as `{}`. Form bodies become objects of strings.
fn parse_body(req: &Request) -> Result<Value, Response> {
    if req.body().iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let is_form = req.header("content-type")
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if is_form {
        let fields = form_urlencoded::parse(req.body())
            .into_owned()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        return Ok(Value::Object(fields));
    }

    serde_json::from_slice(req.body())
        .map_err(|e| error_body(StatusCode::BAD_REQUEST, &format!("malformed JSON body: {e}")))
}

fn failure(err: StoreError) -> Response {
    match &err {
        StoreError::UnknownResource(_) | StoreError::NotFound { .. } | StoreError::WrongKind { .. } => {
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .json(b"{}".to_vec())
        }
        StoreError::DuplicateId { .. } => error_body(StatusCode::CONFLICT, &err.to_string()),
        StoreError::NotAnObject => error_body(StatusCode::BAD_REQUEST, &err.to_string()),
        StoreError::Persist(e) => {
            error!(error = %e, "failed to persist data file");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "failed to persist data file")
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    Response::builder()
        .status(status)
        .json(json!({ "error": message }).to_string().into_bytes())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn router() -> Router {
        let db = Database::in_memory(json!({
            "posts": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}],
            "profile": {"name": "typicode"}
        }))
        .unwrap();
        Resources::new(Arc::new(db)).into_router()
    }

    fn request(method: &str, uri: &str, body: &str) -> Request {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Bytes::from(body.to_owned()))
            .unwrap();
        Request::new(req).unwrap()
    }

    async fn call(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let res = router.route(request(method, uri, body)).await.expect("route matched");
        let value = serde_json::from_slice(res.body()).unwrap_or(Value::Null);
        (res.status_code(), value)
    }

    #[tokio::test]
    async fn default_render_uses_conventional_statuses() {
        let router = router();
        assert_eq!(call(&router, "GET", "/posts", "").await.0, StatusCode::OK);

        let (status, created) = call(&router, "POST", "/posts", r#"{"title":"c"}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created, json!({"id": 3, "title": "c"}));

        let (status, body) = call(&router, "DELETE", "/posts/1", "").await;
        assert_eq!((status, body), (StatusCode::OK, json!({})));
    }

    #[tokio::test]
    async fn render_hook_sees_every_success() {
        let db = Database::in_memory(json!({"posts": []})).unwrap();
        let router = Resources::new(Arc::new(db))
            .render(|_req: &Request, _status: StatusCode, payload: Value| {
                Response::builder()
                    .status(StatusCode::ACCEPTED)
                    .json(payload.to_string().into_bytes())
            })
            .into_router();

        assert_eq!(call(&router, "POST", "/posts", "{}").await.0, StatusCode::ACCEPTED);
        assert_eq!(call(&router, "GET", "/posts/1", "").await.0, StatusCode::ACCEPTED);
        // failures bypass the hook
        assert_eq!(call(&router, "GET", "/posts/9", "").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_things_are_404_with_empty_object() {
        let router = router();
        assert_eq!(call(&router, "GET", "/nope", "").await, (StatusCode::NOT_FOUND, json!({})));
        assert_eq!(call(&router, "GET", "/posts/42", "").await, (StatusCode::NOT_FOUND, json!({})));
        assert_eq!(call(&router, "DELETE", "/profile/1", "").await.0, StatusCode::NOT_FOUND);
        assert_eq!(call(&router, "PUT", "/posts", "{}").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_bodies_are_400() {
        let router = router();
        let (status, body) = call(&router, "POST", "/posts", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("malformed JSON body"));

        assert_eq!(call(&router, "PATCH", "/posts/1", "[1,2]").await.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_id_is_409() {
        let router = router();
        assert_eq!(call(&router, "POST", "/posts", r#"{"id":2}"#).await.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn singular_resources() {
        let router = router();
        let (_, profile) = call(&router, "PATCH", "/profile", r#"{"age":3}"#).await;
        assert_eq!(profile, json!({"name": "typicode", "age": 3}));

        let (_, profile) = call(&router, "PUT", "/profile", r#"{"name":"x"}"#).await;
        assert_eq!(profile, json!({"name": "x"}));
    }

    #[tokio::test]
    async fn form_bodies_are_accepted() {
        let router = router();
        let req = http::Request::builder()
            .method("POST")
            .uri("/posts")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Bytes::from_static(b"title=from+form"))
            .unwrap();
        let res = router.route(Request::new(req).unwrap()).await.unwrap();
        let created: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(created["title"], "from form");
    }

    #[tokio::test]
    async fn sliced_lists_expose_total_count() {
        let router = router();
        let res = router.route(request("GET", "/posts?_limit=1", "")).await.unwrap();
        assert_eq!(res.header("x-total-count"), Some("2"));
        assert_eq!(res.header("access-control-expose-headers"), Some("X-Total-Count"));
    }
}
