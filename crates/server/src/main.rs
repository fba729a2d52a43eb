use anyhow::Context;
use clap::Parser;
use pitchmap::{Config, EngineBuilder};
use pitchmap_server::transport::{http, rpc};
use pitchmap_server::writer::DEFAULT_WRITE_BUFFER;
use pitchmap_server::{Handler, loader};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// HTTP port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Also serve tarpc on this port
    #[arg(long)]
    rpc_port: Option<u16>,

    /// JSON dataset of players and coaches to load at startup
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// TOML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_WRITE_BUFFER)]
    write_buffer: usize,
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitchmap_server=info,pitchmap=info,info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Reading configuration from {}", path.display());
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Config::from_toml(&text).context("invalid config file")?
        }
        None => Config::default(),
    };

    let mut builder = EngineBuilder::new().config(config);
    if args.data.is_some() {
        // Queries get INDEX_UNAVAILABLE until the dataset is in.
        builder = builder.unavailable();
    }
    let engine = builder.build()?;
    let handler = Handler::with_background_writer(engine.clone(), args.write_buffer);

    if let Some(path) = args.data {
        let engine = engine.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = loader::load_file(&engine, &path) {
                error!("Dataset load failed, index stays unavailable: {:#}", e);
            }
        });
    }

    let (stop_tx, stop_rx) = watch::channel(false);

    let http_listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    let http_server = tokio::spawn(http::run_server(
        http_listener,
        handler.clone(),
        stopped(stop_rx.clone()),
    ));

    let rpc_server = match args.rpc_port {
        Some(port) => {
            let listener = TcpListener::bind((args.host.as_str(), port)).await?;
            Some(tokio::spawn(rpc::run_server(
                listener,
                handler.clone(),
                Box::pin(stopped(stop_rx.clone())),
            )))
        }
        None => None,
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl_c signal: {}", e);
    }
    info!("Shutting down");
    let _ = stop_tx.send(true);

    http_server.await??;
    if let Some(rpc_server) = rpc_server {
        rpc_server.await??;
    }
    Ok(())
}
