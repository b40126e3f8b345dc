//! # mcpgw
//!
//! `mcpgw gateway` runs the gateway; `mcpgw math` runs the sample math
//! backend. Both stop on Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mcpgw_math::{MathConfig, MathServer};
use mcpgw_server::{GatewayServer, ServerConfig};
use mcpgw_settings::GatewaySettings;

/// MCP gateway.
#[derive(Parser, Debug)]
#[command(name = "mcpgw", version, about = "MCP gateway and sample math backend")]
struct Cli {
    /// Settings file (default `~/.mcpgw/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the gateway.
    Gateway {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the sample math backend.
    Math {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, 0 for auto-assign (overrides settings).
        #[arg(long)]
        port: Option<u16>,
        /// Delay between stream events in milliseconds (overrides settings).
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

impl Cli {
    fn load_settings(&self) -> Result<GatewaySettings> {
        let path = self
            .settings
            .clone()
            .unwrap_or_else(mcpgw_settings::settings_path);
        mcpgw_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))
    }
}

/// Fold CLI flags into settings. Flags win.
fn apply_cli(settings: &mut GatewaySettings, command: &Command) {
    match command {
        Command::Gateway { host, port } => {
            if let Some(host) = host {
                settings.server.host.clone_from(host);
            }
            if let Some(port) = port {
                settings.server.port = *port;
            }
        }
        Command::Math {
            host,
            port,
            interval_ms,
        } => {
            if let Some(host) = host {
                settings.math.host.clone_from(host);
            }
            if let Some(port) = port {
                settings.math.port = *port;
            }
            if let Some(ms) = interval_ms {
                settings.math.stream_interval_ms = *ms;
            }
        }
    }
}

fn math_config(settings: &GatewaySettings) -> MathConfig {
    MathConfig {
        host: settings.math.host.clone(),
        port: settings.math.port,
        stream_interval: settings.math.stream_interval(),
    }
}

async fn run_gateway(settings: &GatewaySettings) -> Result<()> {
    let mut server = GatewayServer::in_memory(ServerConfig::from_settings(settings))
        .context("Failed to create session engine")?;
    match mcpgw_server::metrics::install_recorder() {
        Ok(handle) => server = server.with_metrics(handle),
        Err(e) => tracing::warn!(error = %e, "metrics disabled"),
    }

    let handle = server.start().await.context("Failed to bind gateway")?;
    tracing::info!("mcpgw gateway listening on {}", handle.base_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    handle.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_math(settings: &GatewaySettings) -> Result<()> {
    let handle = MathServer::new(math_config(settings))
        .start()
        .await
        .context("Failed to bind math backend")?;
    tracing::info!("mcpgw math backend listening on {}", handle.base_url());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    handle.shutdown(settings.server.shutdown_timeout()).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = cli.load_settings()?;
    apply_cli(&mut settings, &cli.command);

    mcpgw_core::init_subscriber(&settings.logging.level, settings.logging.format);

    match cli.command {
        Command::Gateway { .. } => run_gateway(&settings).await,
        Command::Math { .. } => run_math(&settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn gateway_flags_override_settings() {
        let cli = Cli::parse_from(["mcpgw", "gateway", "--host", "0.0.0.0", "--port", "9000"]);
        let mut settings = GatewaySettings::default();
        apply_cli(&mut settings, &cli.command);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.math.port, 8001);
    }

    #[test]
    fn gateway_without_flags_keeps_settings() {
        let cli = Cli::parse_from(["mcpgw", "gateway"]);
        let mut settings = GatewaySettings::default();
        apply_cli(&mut settings, &cli.command);
        assert_eq!(settings.server.port, 8000);
        assert!(cli.settings.is_none());
    }

    #[test]
    fn math_flags_override_settings() {
        let cli = Cli::parse_from(["mcpgw", "math", "--port", "0", "--interval-ms", "50"]);
        let mut settings = GatewaySettings::default();
        apply_cli(&mut settings, &cli.command);
        let config = math_config(&settings);
        assert_eq!(config.port, 0);
        assert_eq!(config.stream_interval, Duration::from_millis(50));
        assert_eq!(settings.server.port, 8000);
    }

    #[test]
    fn settings_flag_is_global() {
        let cli = Cli::parse_from(["mcpgw", "math", "--settings", "/tmp/s.json"]);
        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn settings_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 8100}, "math": {"streamIntervalMs": 10}}"#)
            .unwrap();
        let cli = Cli::parse_from([
            "mcpgw",
            "gateway",
            "--settings",
            path.to_str().unwrap(),
        ]);
        let settings = cli.load_settings().unwrap();
        assert_eq!(settings.server.port, 8100);
        assert_eq!(settings.math.stream_interval_ms, 10);
    }

    #[test]
    fn unknown_subcommand_rejected() {
        assert!(Cli::try_parse_from(["mcpgw", "proxy"]).is_err());
    }
}
