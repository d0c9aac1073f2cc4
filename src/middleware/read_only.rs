//! Write guard: only `GET`, `HEAD` and `OPTIONS` get through.

use http::StatusCode;

use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOnly;

impl Middleware for ReadOnly {
    fn before(&self, req: &Request) -> Flow {
        if req.method().is_read() {
            Flow::Next
        } else {
            Flow::Halt(Response::status(StatusCode::FORBIDDEN))
        }
    }
}
