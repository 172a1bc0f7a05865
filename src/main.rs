use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use microsim_vds::server;
use microsim_vds::{PhantomSimulator, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    server::serve(config, Arc::new(PhantomSimulator::new())).await
}
