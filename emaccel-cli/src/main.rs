use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use emaccel_lib::export::export_to_dir;
use emaccel_lib::{DeviceConfig, MonitorOutcome, RawCapture, RecordingMonitor, SerialEngine as Engine};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Drive the accelerator controller: probe, toggle base lines, record and export.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with device settings; flags below override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Acknowledgement timeout in milliseconds.
    #[arg(long, global = true)]
    ack_timeout_ms: Option<u64>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// List serial ports.
    Ports,
    /// Check whether a compatible controller answers on a port.
    Probe {
        #[arg(short, long)]
        port: String,
    },
    /// Disable some accelerators and enable the rest.
    Bases {
        #[arg(short, long)]
        port: String,
        /// Accelerator numbers (1-6) to disable.
        #[arg(short, long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(1..=6))]
        disable: Vec<u8>,
    },
    /// Record for a number of seconds and export the state changes as CSV.
    Record {
        #[arg(short, long)]
        port: String,
        /// Recording duration in seconds.
        #[arg(short, long)]
        duration: u32,
        /// Accelerator numbers (1-6) to disable before recording.
        #[arg(long, value_delimiter = ',', value_parser = clap::value_parser!(u8).range(1..=6))]
        disable: Vec<u8>,
        /// Directory for the results file.
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Also keep the raw capture at this path.
        #[arg(long)]
        save_capture: Option<PathBuf>,
    },
    /// Decode a saved raw capture and export it as CSV.
    Decode {
        capture: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn setup_logging(
    log_file_path: Option<PathBuf>,
    verbosity: &Verbosity<InfoLevel>,
) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file =
            File::create(path).with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {:?}", path);
    }

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<DeviceConfig> {
    let mut config = match &cli.config {
        Some(path) => DeviceConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => DeviceConfig::default(),
    };
    if let Some(ms) = cli.ack_timeout_ms {
        config.ack_timeout_ms = ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;
    let config = load_config(&cli)?;

    if let Err(e) = run(cli.command, config).await {
        error!("Command failed: {:?}", e);
        process::exit(1);
    }
    Ok(())
}

async fn run(action: Action, config: DeviceConfig) -> Result<()> {
    match action {
        Action::Ports => {
            let ports = emaccel_lib::available_ports().context("Failed to list serial ports")?;
            if ports.is_empty() {
                info!("No serial ports found.");
            }
            for port in ports {
                println!("{}", port);
            }
            Ok(())
        }
        Action::Probe { port } => {
            emaccel_lib::probe(&port, &config)
                .await
                .with_context(|| format!("No compatible controller on {}", port))?;
            info!("Controller found on {}", port);
            Ok(())
        }
        Action::Bases { port, disable } => {
            let mut engine = Engine::new(config);
            engine
                .probe_and_connect(&port)
                .await
                .with_context(|| format!("No compatible controller on {}", port))?;
            apply_disabled(&mut engine, &disable).await?;
            info!(bitmap = %engine.bases(), "Base lines applied");
            engine.close().await?;
            Ok(())
        }
        Action::Record {
            port,
            duration,
            disable,
            out_dir,
            save_capture,
        } => record(config, &port, duration, &disable, out_dir, save_capture).await,
        Action::Decode { capture, out_dir } => {
            let raw = RawCapture::load(&capture).with_context(|| format!("Failed to read {:?}", capture))?;
            let points = raw.into_data_points().context("Capture could not be decoded")?;
            let path = export_to_dir(&out_dir, &points)?;
            info!("Wrote {} data point(s) to {:?}", points.len(), path);
            Ok(())
        }
    }
}

async fn apply_disabled(engine: &mut Engine, disable: &[u8]) -> Result<()> {
    for &number in disable {
        let index = usize::from(number) - 1;
        engine
            .set_base(index, true)
            .await
            .with_context(|| format!("Failed to disable accelerator {}", number))?;
    }
    Ok(())
}

async fn record(
    config: DeviceConfig,
    port: &str,
    duration: u32,
    disable: &[u8],
    out_dir: PathBuf,
    save_capture: Option<PathBuf>,
) -> Result<()> {
    let poll_interval = config.progress_interval();
    let settle = config.drain_settle();
    let engine = Arc::new(Mutex::new(Engine::new(config)));

    let state = {
        let mut engine = engine.lock().await;
        engine
            .probe_and_connect(port)
            .await
            .with_context(|| format!("No compatible controller on {}", port))?;
        apply_disabled(&mut engine, disable).await?;
        engine.start_recording(duration).await.context("Device refused to start")?;
        engine.subscribe()
    };

    let (progress_tx, mut progress_rx) = mpsc::channel(64);
    let monitor = RecordingMonitor::spawn(
        state,
        Duration::from_secs(u64::from(duration)),
        poll_interval,
        progress_tx,
    );
    let reporter = tokio::spawn(async move {
        let mut last_decile = None;
        while let Some(progress) = progress_rx.recv().await {
            let decile = (progress.fraction * 10.0).floor() as u32;
            if last_decile != Some(decile) {
                info!("Recording {:>3}%", decile * 10);
                last_decile = Some(decile);
            }
        }
    });

    let outcome = monitor.wait();
    tokio::pin!(outcome);
    let outcome = tokio::select! {
        outcome = &mut outcome => outcome,
        _ = signal::ctrl_c() => {
            info!("Ctrl+C received, stopping recording.");
            engine.lock().await.stop_recording().await.context("Failed to stop recording")?;
            outcome.await
        }
    };
    let _ = reporter.await;

    let mut engine = engine.lock().await;
    if outcome == MonitorOutcome::Cancelled {
        warn!("Recording ended early, nothing exported.");
        engine.close().await?;
        return Ok(());
    }

    tokio::time::sleep(settle).await;
    let capture = engine.get_whole_buffer().await.context("Failed to drain the device")?;
    if let Some(path) = &save_capture {
        capture.save(path).with_context(|| format!("Failed to save capture to {:?}", path))?;
        info!("Raw capture saved to {:?}", path);
    }

    let exported = match capture.into_data_points() {
        Ok(points) => export_to_dir(&out_dir, &points).map(|path| (path, points.len())),
        Err(e) => Err(e),
    };
    let stopped = engine.stop_recording().await;
    engine.close().await?;

    let (path, rows) = exported.context("Capture could not be exported")?;
    if let Err(e) = stopped {
        bail!("Exported {:?} but the device did not confirm the stop: {}", path, e);
    }
    info!("Wrote {} data point(s) to {:?}", rows, path);
    Ok(())
}
