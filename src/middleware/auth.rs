//! Authorization gate.
//!
//! Presence check only: any non-empty `Authorization` value admits the
//! request. No scheme, token format or signature is inspected; swap this
//! stage for a real validator when one exists.

use http::StatusCode;
use http::header::AUTHORIZATION;

use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

/// Rejects requests without an `Authorization` header with `401` and an
/// empty body. The router never sees them.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// A present but empty value counts as absent.
    pub fn is_authorized(req: &Request) -> bool {
        req.headers()
            .get(AUTHORIZATION)
            .is_some_and(|value| !value.is_empty())
    }
}

impl Middleware for AuthorizationGate {
    fn before(&self, req: &Request) -> Flow {
        if Self::is_authorized(req) {
            Flow::Next
        } else {
            Flow::Halt(Response::status(StatusCode::UNAUTHORIZED))
        }
    }
}
