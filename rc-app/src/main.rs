//! rocketchat-mcp: Rocket.Chat tools over MCP stdio.

mod config;
mod server;

use clap::Parser;
use config::{AppConfig, ConnectionArgs};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "rocketchat-mcp",
    version,
    about = "Rocket.Chat MCP server over stdio"
)]
struct Cli {
    /// TOML file with a [server] section; flags and env vars override it.
    #[arg(long, env = "ROCKETCHAT_MCP_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    connection: ConnectionArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), cli.connection).await?;
    tracing::info!(server_url = %config.server.url, "starting rocketchat-mcp");

    if let Err(error) = server::run(config).await {
        tracing::error!("rocketchat-mcp exiting: {error:#}");
        return Err(error);
    }
    Ok(())
}

/// Logs go to stderr: stdout carries the MCP stream.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,rocketchat_mcp=debug,rc_client=debug,rc_tools=debug"),
    };
    let log_format = std::env::var("ROCKETCHAT_MCP_LOG_FORMAT")
        .unwrap_or_else(|_| "compact".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported ROCKETCHAT_MCP_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::info!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

/// A panic ends the stdio session, so it is logged to stderr before the default hook runs.
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let thread = std::thread::current();
        tracing::error!(
            panic_location = %location,
            panic_payload = %panic_payload_to_string(panic_info.payload()),
            thread = thread.name().unwrap_or("<unnamed>"),
            "rocketchat-mcp panicked; mcp stdio session will be lost"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
