use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use account::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = ServerConfig::from_env()?;
    info!(target: "account::startup", "account service: RUST_LOG='{}', http_port={}", rust_log, config.http_port);

    account::server::run(config).await
}
