//! Middleware layer.
//!
//! A middleware is one stage of the request pipeline. Before routing, each
//! stage either lets the request through ([`Flow::Next`]) or answers it
//! itself ([`Flow::Halt`]); nothing after a halting stage runs. Once a
//! response exists, every stage that ran gets [`Middleware::after`] in
//! reverse order, so a 401 from the authorization gate still picks up CORS
//! headers and still shows up in the access log.
//!
//! Built-in stages:
//! - [`logger`] — one access-log event per request
//! - [`cors`] — origin mirroring and preflight answers
//! - [`no_cache`] — disables client caching of API responses
//! - [`read_only`] — rejects writes with 403
//! - [`auth`] — the authorization gate

use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

pub mod auth;
pub mod cors;
pub mod logger;
pub mod no_cache;
pub mod read_only;

/// What a stage decided about the request.
#[derive(Debug)]
pub enum Flow {
    /// Hand the request to the next stage.
    Next,
    /// Stop here and send this response.
    Halt(Response),
}

/// One stage of the request pipeline.
pub trait Middleware: Send + Sync + 'static {
    fn before(&self, req: &Request) -> Flow;

    /// Runs after the response is produced, whether by the router or by a
    /// halting stage further down the pipeline.
    fn after(&self, _req: &Request, _res: &mut Response) {}
}

/// The default middleware bundle, in installation order.
///
/// `read_only` adds the write guard at the end of the bundle.
pub fn defaults(read_only: bool) -> Vec<Arc<dyn Middleware>> {
    let mut stages: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(logger::Logger),
        Arc::new(cors::Cors),
        Arc::new(no_cache::NoCache),
    ];
    if read_only {
        stages.push(Arc::new(read_only::ReadOnly));
    }
    stages
}
