//! Weatherbot HTTP server
//!
//! Starts an Axum web server that answers chat messages, looking up live
//! weather when a message asks for it.

use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use weatherbot::cli::{Cli, Command, generate_config_template};
use weatherbot::config::{Config, Credentials};
use weatherbot::handlers::{self, AppState};
use weatherbot::telemetry;

/// Path used when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        return write_template(output.as_deref());
    }

    // Only the default path may be absent; an explicit --config must exist
    let use_defaults = cli.config == DEFAULT_CONFIG_PATH && !Path::new(&cli.config).exists();
    let config = if use_defaults {
        Config::default()
    } else {
        Config::from_file(&cli.config)?
    };

    telemetry::init(&config.observability.log_level);
    if use_defaults {
        tracing::warn!(
            path = DEFAULT_CONFIG_PATH,
            "Config file not found, using built-in defaults"
        );
    }

    let credentials = Credentials::from_env(&config);
    tracing::debug!(credentials = ?credentials, "Resolved credentials");

    let config = Arc::new(config);
    let state = AppState::new(config.clone(), &credentials)?;

    if let Some(Command::Ask { message }) = &cli.command {
        let message = message.trim();
        if message.is_empty() {
            return Err("Please enter a message".into());
        }
        let reply = state.router().route(message).await;
        tracing::info!(
            strategy = reply.strategy.as_str(),
            branch = reply.branch.as_str(),
            "Message routed"
        );
        println!("{}", reply.text);
        return Ok(());
    }

    tracing::info!(
        strategy = %config.routing.strategy,
        model = config.completion.model(),
        "Starting weatherbot server on {}:{}",
        config.server.host,
        config.server.port
    );

    let app = handlers::app(state);

    let ip = config
        .server
        .host
        .parse::<std::net::IpAddr>()
        .map_err(|e| format!("Invalid server.host '{}': {}", config.server.host, e))?;
    let addr = SocketAddr::from((ip, config.server.port));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Chat endpoint available at http://{}/api/chat", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn write_template(output: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template)
                .map_err(|e| format!("Failed to write config template to '{}': {}", path, e))?;
            eprintln!("Wrote configuration template to {}", path);
        }
        None => print!("{}", template),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
