//! # jsongate
//!
//! A REST API over a JSON file, behind an authorization gate.
//!
//! Every top-level key of the data file becomes a resource: arrays are
//! collections with the usual create/read/update/delete routes, objects are
//! singular resources. Each request flows through one linear pipeline:
//!
//! ```text
//! logger -> cors -> no-cache -> authorization gate -> resource router -> renderer
//! ```
//!
//! - The **authorization gate** admits any request carrying a non-empty
//!   `Authorization` header and answers everything else with an empty 401.
//!   It checks presence only.
//! - The **renderer** installed by [`bootstrap::app`] answers every
//!   successful operation with `201 Created` and the payload, as JSON or as
//!   JSONP when a `callback` query parameter is present.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jsongate::{bootstrap, Config, Database, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), jsongate::Error> {
//!     let config = Config::default();
//!     let db = Arc::new(Database::open(&config.data_file).await?);
//!     let app = bootstrap::app(db, &config);
//!
//!     Server::bind(config.addr).await?.serve(app).await
//! }
//! ```

mod app;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod bootstrap;
pub mod config;
pub mod middleware;
pub mod query;
pub mod resource;
pub mod store;
pub mod telemetry;

pub use app::App;
pub use config::Config;
pub use error::Error;
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use store::{Database, Kind, StoreError};
