//! Keeps clients from caching API responses between edits of the data file.

use http::header::{self, HeaderValue};

use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoCache;

impl Middleware for NoCache {
    fn before(&self, _req: &Request) -> Flow {
        Flow::Next
    }

    fn after(&self, _req: &Request, res: &mut Response) {
        let headers = res.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("-1"));
    }
}
