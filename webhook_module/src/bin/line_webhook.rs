use tracing::{error, info};

use webhook_module::server::run_server;
use webhook_module::{BoxError, WebhookConfig};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt().with_target(false).init();
    dotenvy::dotenv().ok();

    let config = WebhookConfig::from_env()?;
    run_server(config, shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("line webhook received ctrl-c, shutting down"),
        Err(err) => {
            error!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await
        }
    }
}
