//! The request pipeline: middleware stages in front of a [`Router`].

use std::sync::Arc;

use http::StatusCode;

use crate::middleware::{Flow, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// An ordered list of middleware followed by the router.
///
/// Stages run in the order they were added. The first stage to
/// [`Flow::Halt`] answers the request; otherwise the router does, and paths
/// no route matches get `404 {}`.
pub struct App {
    stages: Vec<Arc<dyn Middleware>>,
    router: Router,
}

impl App {
    pub fn new(router: Router) -> Self {
        Self { stages: Vec::new(), router }
    }

    /// Appends one stage. Returns `self` for chaining.
    pub fn layer(mut self, stage: impl Middleware) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends several stages, keeping their order.
    pub fn layers(mut self, stages: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Runs one request through the pipeline.
    pub async fn handle(&self, req: Request) -> Response {
        let mut ran = 0;
        let mut halted = None;
        for stage in &self.stages {
            ran += 1;
            if let Flow::Halt(res) = stage.before(&req) {
                halted = Some(res);
                break;
            }
        }

        let mut res = match halted {
            Some(res) => res,
            None => match self.router.route(req.clone()).await {
                Some(res) => res,
                None => Response::builder().status(StatusCode::NOT_FOUND).json(b"{}".to_vec()),
            },
        };

        for stage in self.stages[..ran].iter().rev() {
            stage.after(&req, &mut res);
        }
        res
    }
}
