use banding_photos::server::bootstrap::build_app_state;
use banding_photos::server::config::ServerConfig;
use banding_photos::version::VERSION;
use banding_photos::web::create_axum_router;

use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Bird-banding photo tagging server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on, overriding `listen_addr` from the configuration
    #[arg(short, long)]
    listen: Option<String>,
}

/// Daily-rotated JSON log file plus human-readable stdout.
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_dir: &str) -> WorkerGuard {
    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, "banding-photos.log"));
    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false).json();
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
    guard
}

fn resolve_listen_addr(
    cli: Option<&str>,
    config: &ServerConfig,
) -> Result<SocketAddr, std::net::AddrParseError> {
    cli.unwrap_or(&config.listen_addr).parse()
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl-C received, draining connections."),
        Err(e) => error!(error = %e, "Could not install Ctrl-C handler."),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("banding-photos-server {VERSION}");
        return Ok(());
    }

    let args = Args::parse();

    let server_config = ServerConfig::load(args.config.as_deref()).map_err(|e| {
        eprintln!("Failed to load server configuration: {e}");
        e
    })?;

    let _log_guard = init_logging(&server_config.log_dir);
    info!(version = VERSION, "Starting banding-photos server.");

    let addr = resolve_listen_addr(args.listen.as_deref(), &server_config)?;
    let app_state = build_app_state(server_config)?;
    info!(
        tag_store = app_state.tag_repository.is_configured(),
        file_store = app_state.file_store.is_some(),
        "Backends wired."
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Listening.");

    axum::serve(listener, create_axum_router(app_state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
