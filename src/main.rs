use jsongate::{bootstrap, telemetry, Config};
use tracing::error;

#[tokio::main]
async fn main() {
    telemetry::init();

    if let Err(e) = bootstrap::run(Config::default()).await {
        error!("{e}");
        std::process::exit(1);
    }
}
