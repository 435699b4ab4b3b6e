//! Entry point for albumgrab: authenticate, search highlight albums and
//! download the selected ones.

use std::path::PathBuf;
use std::process::ExitCode;

use api_client::ApiClient;
use clap::Parser;
use sync::Session;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod config;
mod console;

#[derive(Parser)]
#[command(
    name = "albumgrab",
    author,
    version,
    about = "Download Google Photos highlight albums into local folders"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override the folder albums are downloaded into
    #[arg(long)]
    download_root: Option<PathBuf>,
    /// Override OAuth redirect port
    #[arg(long)]
    oauth_redirect_port: Option<u16>,
}

/// Failures are printed once to stdout as `Error: ...`; stderr only carries
/// log records at `ERROR`, and the log file keeps the rest.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        oauth_redirect_port: cli.oauth_redirect_port,
        download_root: cli.download_root.clone(),
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);

    if let Err(e) = std::fs::create_dir_all(&cfg.cache_path) {
        println!("Error: Could not create {}: {}", cfg.cache_path.display(), e);
        return ExitCode::FAILURE;
    }
    let file_appender = rolling::daily(&cfg.cache_path, "albumgrab.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::ERROR)
                .and(file_writer),
        )
        .init();

    tracing::info!(download_root = ?cfg.download_root, "Starting albumgrab");
    println!("Status: Authenticating...");
    let access_token = match auth::obtain_access_token(cfg.oauth_redirect_port).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(error = %e, "Authentication failed");
            println!("Error: Authentication failed: {}", e);
            if matches!(e, auth::AuthError::MissingCredentials(_)) {
                println!(
                    "Set {} and {} to your OAuth 2.0 client credentials.",
                    auth::CLIENT_ID_ENV,
                    auth::CLIENT_SECRET_ENV
                );
            }
            return ExitCode::FAILURE;
        }
    };

    let client = ApiClient::with_base_url(access_token, cfg.api_base_url.clone())
        .with_page_size(cfg.page_size);
    let (session, _worker) = Session::spawn(client);

    match console::Console::new(session, &cfg).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::warn!(error = %e, "Run stopped");
            println!("Error: {}", e);
            if e.is_auth() {
                println!(
                    "Google rejected the access token. Unset {} if it is stale, or run again to sign in.",
                    auth::ACCESS_TOKEN_ENV
                );
            }
            ExitCode::FAILURE
        }
    }
}
