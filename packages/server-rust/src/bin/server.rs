//! conduit-server: hosts one app's procedures behind the envelope endpoint.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use conduit_server::network::DEFAULT_PORT;
use conduit_server::service::config::{DEFAULT_ADMIN_PASSWORD, DEFAULT_VERIFY_TOKEN};
use conduit_server::{AppKind, Dispatcher, NetworkConfig, NetworkModule, ServerConfig};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

/// Remote procedure server for the demo apps.
#[derive(Debug, Parser)]
#[command(name = "conduit-server", version, about)]
struct Cli {
    /// App whose procedures this process hosts
    #[arg(long, env = "CONDUIT_APP", value_enum)]
    app: AppKind,

    /// Bind address
    #[arg(long, env = "CONDUIT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port (0 picks a free one)
    #[arg(long, env = "CONDUIT_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Password `get_admin` exchanges for an admin credential
    #[arg(
        long,
        env = "CONDUIT_ADMIN_PASSWORD",
        default_value = DEFAULT_ADMIN_PASSWORD,
        hide_env_values = true
    )]
    admin_password: String,

    /// Token the `example_two` validator expects
    #[arg(
        long,
        env = "CONDUIT_VERIFY_TOKEN",
        default_value = DEFAULT_VERIFY_TOKEN,
        hide_env_values = true
    )]
    verify_token: String,

    /// Hex HMAC key for credentials; random per process when unset
    #[arg(long, env = "CONDUIT_SIGNING_KEY", hide_env_values = true)]
    signing_key: Option<String>,

    /// Registered procedures that external calls cannot reach
    #[arg(long = "private", env = "CONDUIT_PRIVATE_PROCEDURES", value_delimiter = ',')]
    private_procedures: Vec<String>,

    /// Per-request and per-operation timeout
    #[arg(long, env = "CONDUIT_REQUEST_TIMEOUT_MS", default_value_t = 30_000)]
    request_timeout_ms: u64,

    /// Concurrent operations before new ones are shed with 503
    #[arg(long, env = "CONDUIT_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent: u32,

    /// Serve Prometheus metrics on this address
    #[arg(long, env = "CONDUIT_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[arg(long, env = "CONDUIT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let signing_key = match &self.signing_key {
            Some(encoded) => {
                let key = hex::decode(encoded).context("--signing-key must be hex")?;
                if key.is_empty() {
                    bail!("--signing-key must not be empty");
                }
                key
            }
            None => ServerConfig::random_signing_key(),
        };
        Ok(ServerConfig {
            default_operation_timeout_ms: self.request_timeout_ms,
            max_concurrent_operations: self.max_concurrent,
            admin_password: self.admin_password.clone(),
            verify_token: self.verify_token.clone(),
            signing_key,
            private_procedures: self.private_procedures.clone(),
        })
    }

    fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            ..NetworkConfig::default()
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Some(addr) = cli.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("failed to start metrics exporter")?;
        info!(%addr, "metrics exporter listening");
    }

    let server_config = cli.server_config()?;
    info!(app = %cli.app, config = ?server_config, "building registry");
    let dispatcher = Dispatcher::for_app(cli.app, server_config)?;
    info!(procedures = dispatcher.procedure_count(), "registry ready");

    let mut module = NetworkModule::new(cli.network_config(), dispatcher);
    module.start().await?;
    module.serve(shutdown_signal()).await
}
