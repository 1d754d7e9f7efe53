use std::{future::Future, path::PathBuf, process::ExitCode, str::FromStr, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use ballcam_camera::{CameraCapture, SyntheticSource};
use ballcam_core::BallcamSettings;
use ballcam_esc::{EscBackend, EscClient};
use ballcam_vision::{FrameStore, Tracker};
use ballcam_webui::{ServerState, UiConfig};
use clap::Parser;
use tokio::{
    sync::{broadcast, watch},
    task::{JoinError, JoinHandle},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt};

use crate::cli::{Args, CameraSource, EscMode};

mod cli;
mod pipeline;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match setup_logging(&args) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Failed to set up logging: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

/// Log to stdout and, as JSON, to a timestamped file in the log directory. The returned
/// guard flushes the file when dropped.
fn setup_logging(args: &Args) -> Result<WorkerGuard> {
    let log_level = tracing::Level::from_str(&args.log_level)
        .map_err(|_| anyhow!("Invalid log level: {}", args.log_level))?;

    std::fs::create_dir_all(&args.log_directory).with_context(|| {
        format!(
            "Failed to create log directory: {}",
            args.log_directory.display()
        )
    })?;
    let time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let file_name = format!("ballcam-{time}.log");
    let log_file_path: PathBuf = args.log_directory.join(&file_name);

    let appender = tracing_appender::rolling::never(&args.log_directory, &file_name);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);

    let stdout_layer = fmt::Subscriber::builder()
        .with_max_level(log_level)
        .without_time()
        .finish();
    let logfile_layer = fmt::Layer::default()
        .json()
        .with_ansi(false)
        .with_writer(non_blocking_appender);
    tracing::subscriber::set_global_default(stdout_layer.with(logfile_layer))
        .context("Unable to set global tracing subscriber")?;

    tracing::info!("Saving logs to {}", log_file_path.display());
    Ok(guard)
}

async fn run(args: Args) -> Result<()> {
    let settings = BallcamSettings::load_or_insert(&args.settings_file)?;

    let backend = match args.esc {
        EscMode::Pigpio => EscBackend::Pigpio {
            addr: settings.esc.pigpio_addr.clone(),
        },
        EscMode::DryRun => EscBackend::DryRun,
    };
    let esc = EscClient::connect(backend, &settings.esc).await?;

    let tracker = Tracker::new(&settings.tracker);
    let frames = FrameStore::new();
    let (update_tx, update_rx) = watch::channel(None);
    let (stop_tx, _) = broadcast::channel(1);

    let server_state = ServerState {
        tracking: tracker.handle(),
        frames: frames.clone(),
        esc: esc.clone(),
        update_rx,
    };
    let ui_config = UiConfig {
        port: args.webui_port,
    };

    let pipeline_stop_rx = stop_tx.subscribe();
    let mut pipeline_task = match args.camera {
        CameraSource::Libcamera => {
            let capture = CameraCapture::spawn(&settings.camera)?;
            tokio::spawn(pipeline::run(
                capture,
                tracker,
                frames,
                update_tx,
                pipeline_stop_rx,
            ))
        }
        CameraSource::Synthetic => {
            tracing::info!("Using synthetic frames");
            let source = SyntheticSource::new(&settings.camera);
            tokio::spawn(pipeline::run(
                source,
                tracker,
                frames,
                update_tx,
                pipeline_stop_rx,
            ))
        }
    };
    let mut server_task = tokio::spawn(ballcam_webui::start(
        ui_config,
        server_state,
        stop_tx.subscribe(),
    ));

    let stop = wait_for_stop(
        tokio::signal::ctrl_c(),
        &mut pipeline_task,
        &mut server_task,
    )
    .await?;

    tracing::info!(
        "Shutting down (timeout {} seconds)... Press ctrl-c again to force shutdown",
        SHUTDOWN_TIMEOUT.as_secs()
    );

    // Fool-proof timeout for shutdown
    std::thread::spawn(|| {
        std::thread::sleep(SHUTDOWN_TIMEOUT);
        eprintln!("Shutdown timed out");
        std::process::exit(1);
    });

    let shutdown_fut = async move {
        // Fails only when no task is listening anymore
        let _ = stop_tx.send(());
        let mut failed = stop.failed();
        if !matches!(stop, Stop::PipelineExited { .. }) {
            failed |= task_failed("Pipeline", pipeline_task.await);
        }
        if !matches!(stop, Stop::ServerExited { .. }) {
            failed |= task_failed("Web server", server_task.await);
        }
        if let Err(err) = esc.stop_all().await {
            tracing::error!("Failed to stop motors: {}", err);
        }
        failed
    };
    let failed = tokio::select! {
        failed = shutdown_fut => failed,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Forced shutdown");
            std::process::exit(1);
        }
    };

    if failed {
        bail!("Stopped after a task failure");
    }
    Ok(())
}

/// Why the service started shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    CtrlC,
    PipelineExited { failed: bool },
    ServerExited { failed: bool },
}

impl Stop {
    fn failed(self) -> bool {
        matches!(
            self,
            Stop::PipelineExited { failed: true } | Stop::ServerExited { failed: true }
        )
    }
}

/// Wait for ctrl-c, or for the pipeline or the web server to exit on their own.
async fn wait_for_stop(
    ctrl_c: impl Future<Output = std::io::Result<()>>,
    pipeline_task: &mut JoinHandle<Result<()>>,
    server_task: &mut JoinHandle<Result<()>>,
) -> Result<Stop> {
    tokio::select! {
        res = ctrl_c => {
            res.context("Failed to listen for ctrl-c")?;
            Ok(Stop::CtrlC)
        }
        res = pipeline_task => {
            let failed = task_failed("Pipeline", res);
            if !failed {
                tracing::warn!("Pipeline stopped, no more frames");
            }
            Ok(Stop::PipelineExited { failed })
        }
        res = server_task => Ok(Stop::ServerExited {
            failed: task_failed("Web server", res),
        }),
    }
}

/// Log the outcome of a finished task. Returns `true` if it failed.
fn task_failed(name: &str, res: Result<Result<()>, JoinError>) -> bool {
    match res {
        Ok(Ok(())) => false,
        Ok(Err(err)) => {
            tracing::error!("{} failed: {:#}", name, err);
            true
        }
        Err(err) => {
            tracing::error!("{} task panicked: {}", name, err);
            true
        }
    }
}
