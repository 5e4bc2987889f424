use anyhow::Context;
use clap::Parser;
use rpc_splitter::http;
use rpc_splitter::splitter::RpcSplitter;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const SERVICE_NAME: &str = "rpc-splitter";

#[derive(Parser)]
#[clap(name = SERVICE_NAME)]
struct Cli {
    /// Comma separated list of upstream Ethereum JSON-RPC endpoints
    #[clap(long, value_delimiter = ',', required = true)]
    eth_rpc: Vec<Url>,

    /// Address to listen on for inbound JSON-RPC requests
    #[clap(long, default_value = "127.0.0.1:8545")]
    listen_addr: SocketAddr,

    /// Log filter directive, e.g. "info" or "rpc_splitter=debug"
    #[clap(long, default_value = "info")]
    log_level: String,

    /// Emit log lines as JSON
    #[clap(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).context("invalid log level")?;
    if cli.log_json {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .flatten_event(true)
                .with_env_filter(filter)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().with_env_filter(filter).finish(),
        )
    }
    .expect("failed to set global subscriber");

    let http_client = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let splitter = Arc::new(RpcSplitter::new(http_client, cli.eth_rpc.clone()));

    info!(
        listen_addr = %cli.listen_addr,
        upstreams = cli.eth_rpc.len(),
        "starting {SERVICE_NAME}"
    );

    axum::Server::bind(&cli.listen_addr)
        .serve(http::router(splitter).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context(format!("{SERVICE_NAME} failed to run"))?;

    Ok(())
}
