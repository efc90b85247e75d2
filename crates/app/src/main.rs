use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use beamguard_app::config::AppConfig;
use beamguard_app::runtime::{self, RelayBackend, RuntimeOptions, SourceMode};
use beamguard_foundation::ShutdownHandler;

#[derive(Parser, Debug)]
#[command(name = "beamguard", version, about = "Acoustic laser-interlock monitor")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "beamguard.toml")]
    config: PathBuf,

    /// Run with a generated audio source and a mock relay line.
    #[arg(long)]
    simulate: bool,

    /// Inject an in-band alarm tone instead of silence (simulation only).
    #[arg(long, requires = "simulate")]
    sim_alarm: bool,

    /// Run without the capture pipeline; the relay is held disabled.
    #[arg(long)]
    disable_audio: bool,

    /// Input device name override.
    #[arg(long)]
    device: Option<String>,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "beamguard.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging().map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    tracing::info!("Starting Beamguard");

    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        tracing::warn!("Config file {:?} not found; using defaults", cli.config);
        AppConfig::default()
    };
    if let Some(device) = cli.device {
        config.audio.device = Some(device);
    }

    let source = if cli.disable_audio {
        SourceMode::Disabled
    } else if cli.simulate {
        let mid_band = (config.trigger.band_low_hz + config.trigger.band_high_hz) / 2.0;
        SourceMode::Simulate {
            freq_hz: mid_band,
            amplitude: if cli.sim_alarm { 0.5 } else { 0.0 },
        }
    } else {
        SourceMode::Live
    };
    let relay = if cli.simulate {
        RelayBackend::Mock
    } else {
        RelayBackend::Gpio
    };

    let shutdown = ShutdownHandler::new().install().await;
    let handle = runtime::start(
        RuntimeOptions {
            config,
            source,
            relay,
        },
        Arc::clone(&shutdown),
    )?;
    tracing::info!("Beamguard running; state={:?}", handle.state());

    // SIGHUP is the external re-initialization control: the only
    // sanctioned path out of a latched Fault.
    #[cfg(unix)]
    {
        let reinit = handle.reinit_handle();
        tokio::spawn(async move {
            let mut hup =
                match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup()) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!("Failed to install SIGHUP handler: {}", e);
                        return;
                    }
                };
            while hup.recv().await.is_some() {
                tracing::info!("SIGHUP received: re-initialization requested");
                reinit.reinitialize();
            }
        });
    }

    let waiter = Arc::clone(&shutdown);
    tokio::task::spawn_blocking(move || waiter.wait()).await?;

    handle.shutdown();
    Ok(())
}
