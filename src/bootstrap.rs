//! Wires the datastore, middleware, authorization gate and resource router
//! into one [`App`] and serves it.

use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tracing::info;

use crate::app::App;
use crate::config::Config;
use crate::error::Error;
use crate::middleware::{self, auth::AuthorizationGate};
use crate::request::Request;
use crate::resource::Resources;
use crate::response::Response;
use crate::server::Server;
use crate::store::Database;

/// Success renderer installed by [`app`]: `201 Created` for every
/// successful operation, reads and deletes included, with the payload as
/// JSON or JSONP.
pub fn render_created(req: &Request, _status: StatusCode, payload: Value) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .jsonp(req.query("callback"), &payload)
}

/// Default middleware, then the authorization gate, then the resource
/// router carrying [`render_created`].
pub fn app(db: Arc<Database>, config: &Config) -> App {
    let router = Resources::new(db)
        .render(render_created)
        .into_router();

    App::new(router)
        .layers(middleware::defaults(config.read_only))
        .layer(AuthorizationGate)
}

/// Opens the data file, binds the listener and serves until shutdown.
pub async fn run(config: Config) -> Result<(), Error> {
    let db = Arc::new(Database::open(&config.data_file).await?);
    info!(
        data_file = %config.data_file.display(),
        resources = ?db.resources().await,
        "loaded datastore"
    );
    let app = app(db, &config);

    let server = Server::bind(config.addr).await?;
    info!(
        addr = %server.local_addr(),
        data_file = %config.data_file.display(),
        "JSON Server is running"
    );
    server.serve(app).await
}
