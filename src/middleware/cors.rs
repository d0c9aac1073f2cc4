//! Cross-origin resource sharing.
//!
//! Mirrors the caller's `Origin` with credentials allowed, and answers every
//! `OPTIONS` request as a preflight before the authorization gate runs.
//! Browsers never attach `Authorization` to a preflight.

use http::header::{self, HeaderValue};
use http::StatusCode;

use crate::method::Method;
use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

const ALLOWED_METHODS: &str = "GET,HEAD,PUT,PATCH,POST,DELETE";

#[derive(Clone, Copy, Debug, Default)]
pub struct Cors;

impl Middleware for Cors {
    fn before(&self, req: &Request) -> Flow {
        if req.method() != Method::Options {
            return Flow::Next;
        }

        let mut res = Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS));
        if let Some(requested) = req.headers().get(header::ACCESS_CONTROL_REQUEST_HEADERS) {
            res = res
                .header(header::ACCESS_CONTROL_ALLOW_HEADERS, requested.clone())
                .header(header::VARY, HeaderValue::from_static("Access-Control-Request-Headers"));
        }
        Flow::Halt(res.no_body())
    }

    fn after(&self, req: &Request, res: &mut Response) {
        let headers = res.headers_mut();
        match req.headers().get(header::ORIGIN) {
            Some(origin) => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.append(header::VARY, HeaderValue::from_static("Origin"));
            }
            None => {
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    }
}
