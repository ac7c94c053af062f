use std::sync::Arc;

use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use trunky::adapters::ReqwestHttpClient;
use trunky::providers::ProviderRegistry;
use trunky::relay::{start_relay_on, DEFAULT_RELAY_ADDR};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --version flag before any initialization
    if std::env::args().any(|arg| arg == "--version") {
        println!("trunky {}", VERSION);
        return Ok(());
    }

    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Bind address comes from the environment so deployments can
    // override the localhost default.
    let addr = std::env::var("TRUNKY_ADDR")
        .unwrap_or_else(|_| DEFAULT_RELAY_ADDR.to_string())
        .parse()?;

    let http = Arc::new(ReqwestHttpClient::new());
    let registry = Arc::new(ProviderRegistry::new(http));

    let (handle, _addr) = start_relay_on(addr, registry).await?;
    handle.await?;

    Ok(())
}
