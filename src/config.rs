//! Server configuration from command line flags and environment

use clap::Parser;
use std::net::SocketAddr;

/// Origins allowed by default: the local viewer dev servers plus any origin
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://localhost:5174",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:5174",
    "*",
];

fn default_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "microsim-server", version, about = "Microsim Simulation API")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "MICROSIM_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MICROSIM_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Comma separated CORS origins; `*` allows any origin
    #[arg(
        long,
        env = "MICROSIM_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values_t = default_origins()
    )]
    pub allowed_origins: Vec<String>,

    /// Leave the per-voxel payload out of simulate responses
    #[arg(long, env = "MICROSIM_NO_EXPORT", default_value_t = false)]
    pub no_export: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "MICROSIM_LOG", default_value = "info")]
    pub log_filter: String,
}

impl ServerConfig {
    /// Socket address to bind
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {addr}: {e}"))
    }

    /// Whether any origin may access the API
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o.trim() == "*")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["microsim-server"])
    }
}
