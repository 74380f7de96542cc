use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use klimata::{config::RelayConfig, relay, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------
    // Config / Logging
    // -----------------------------
    dotenvy::dotenv().ok();
    telemetry::init();

    let config = RelayConfig::from_env()?;
    info!(?config, "starting chat relay");

    // -----------------------------
    // Router
    // -----------------------------
    let addr = config.bind_addr.clone();
    let app = relay::app(config);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("relay listening on http://{addr}");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
