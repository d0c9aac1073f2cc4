//! Access log.

use tracing::info;

use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;

/// Emits one `tracing` event per request once the response is known.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

impl Middleware for Logger {
    fn before(&self, _req: &Request) -> Flow {
        Flow::Next
    }

    fn after(&self, req: &Request, res: &mut Response) {
        let elapsed = req.received_at().elapsed();
        info!(
            method = %req.method(),
            path = %req.uri(),
            status = res.status_code().as_u16(),
            latency_ms = elapsed.as_secs_f64() * 1000.0,
            "request"
        );
    }
}
