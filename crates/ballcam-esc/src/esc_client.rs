use anyhow::{Context, Result};
use ballcam_core::{EscChannel, EscSettings, ThrottleCmd, MAX_PULSE_US};
use thiserror::Error;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{mpsc, oneshot},
};

use crate::pigpio::{decode_response, encode_servo, FRAME_LEN};

#[derive(Debug, Error)]
pub enum EscError {
    #[error("Pulse width {0}us is out of range (0..={max})", max = MAX_PULSE_US)]
    InvalidPulse(u32),
    #[error("pigpio daemon returned error code {0}")]
    Daemon(i32),
    #[error("ESC writer task has stopped")]
    Disconnected,
    #[error("Failed to talk to pigpio daemon: {0}")]
    Io(#[from] std::io::Error),
}

/// Where pulse-width commands go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscBackend {
    /// The pigpio daemon's command socket.
    Pigpio { addr: String },
    /// Log the commands without touching any hardware.
    DryRun,
}

type Request = (ThrottleCmd, oneshot::Sender<Result<(), EscError>>);

/// Async client for the two speed controllers. Cheap to clone; all clones feed the same
/// writer task.
#[derive(Clone)]
pub struct EscClient {
    writer_tx: mpsc::UnboundedSender<Request>,
}

impl EscClient {
    /// Create a new `EscClient`. For the pigpio backend this connects to the daemon.
    pub async fn connect(backend: EscBackend, settings: &EscSettings) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Request>();
        let settings = settings.clone();
        match backend {
            EscBackend::Pigpio { addr } => {
                let stream = TcpStream::connect(&addr)
                    .await
                    .with_context(|| format!("Failed to connect to pigpio daemon at {}", addr))?;
                tracing::info!("Connected to pigpio daemon at {}", addr);
                tokio::spawn(run_pigpio_writer(stream, settings, rx));
            }
            EscBackend::DryRun => {
                tracing::warn!("ESC output disabled, commands are only logged");
                tokio::spawn(run_dry_run_writer(settings, rx));
            }
        }
        Ok(Self { writer_tx: tx })
    }

    /// Set the pulse width of one ESC and wait for the backend to confirm it.
    pub async fn send(&self, cmd: ThrottleCmd) -> Result<(), EscError> {
        if !cmd.is_valid() {
            return Err(EscError::InvalidPulse(cmd.pulse_us));
        }
        let (tx, rx) = oneshot::channel();
        self.writer_tx
            .send((cmd, tx))
            .map_err(|_| EscError::Disconnected)?;
        rx.await.map_err(|_| EscError::Disconnected)?
    }

    /// Switch the pulses off on both ESCs.
    pub async fn stop_all(&self) -> Result<(), EscError> {
        for channel in EscChannel::ALL {
            self.send(ThrottleCmd::off(channel)).await?;
        }
        Ok(())
    }
}

async fn run_pigpio_writer(
    mut stream: TcpStream,
    settings: EscSettings,
    mut rx: mpsc::UnboundedReceiver<Request>,
) {
    while let Some((cmd, reply)) = rx.recv().await {
        let gpio = settings.gpio(cmd.channel);
        tracing::info!(
            "Setting {} to {}us on GPIO {}",
            cmd.channel,
            cmd.pulse_us,
            gpio
        );
        let result = write_servo(&mut stream, gpio, cmd.pulse_us).await;
        if let Err(err) = &result {
            tracing::error!("Failed to set {}: {}", cmd.channel, err);
        }
        let failed_io = matches!(result, Err(EscError::Io(_)));
        reply.send(result).ok();
        if failed_io {
            break;
        }
    }
    tracing::info!("Closing pigpio connection");
}

async fn write_servo(stream: &mut TcpStream, gpio: u32, pulse_us: u32) -> Result<(), EscError> {
    stream.write_all(&encode_servo(gpio, pulse_us)).await?;
    let mut response = [0u8; FRAME_LEN];
    stream.read_exact(&mut response).await?;
    match decode_response(&response) {
        code if code < 0 => Err(EscError::Daemon(code)),
        _ => Ok(()),
    }
}

async fn run_dry_run_writer(settings: EscSettings, mut rx: mpsc::UnboundedReceiver<Request>) {
    while let Some((cmd, reply)) = rx.recv().await {
        tracing::info!(
            "[dry run] Setting {} to {}us on GPIO {}",
            cmd.channel,
            cmd.pulse_us,
            settings.gpio(cmd.channel)
        );
        reply.send(Ok(())).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Accepts one connection and answers each request with `result`, returning the
    /// requests it saw.
    async fn fake_daemon(result: i32) -> (String, tokio::task::JoinHandle<Vec<[u8; FRAME_LEN]>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut seen = Vec::new();
            let mut request = [0u8; FRAME_LEN];
            while socket.read_exact(&mut request).await.is_ok() {
                seen.push(request);
                let mut response = request;
                response[12..].copy_from_slice(&result.to_le_bytes());
                socket.write_all(&response).await.unwrap();
            }
            seen
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_pigpio_commands() {
        let (addr, daemon) = fake_daemon(0).await;
        let client = EscClient::connect(EscBackend::Pigpio { addr }, &EscSettings::default())
            .await
            .unwrap();

        client
            .send(ThrottleCmd::new(EscChannel::Esc1, 1500))
            .await
            .unwrap();
        client
            .send(ThrottleCmd::new(EscChannel::Esc2, 1000))
            .await
            .unwrap();
        drop(client);

        let seen = daemon.await.unwrap();
        assert_eq!(seen, vec![encode_servo(16, 1500), encode_servo(12, 1000)]);
    }

    #[tokio::test]
    async fn test_daemon_error_is_reported() {
        let (addr, _daemon) = fake_daemon(-8).await;
        let client = EscClient::connect(EscBackend::Pigpio { addr }, &EscSettings::default())
            .await
            .unwrap();

        let err = client
            .send(ThrottleCmd::new(EscChannel::Esc1, 1500))
            .await
            .unwrap_err();
        assert!(matches!(err, EscError::Daemon(-8)));
    }

    #[tokio::test]
    async fn test_invalid_pulse_is_rejected() {
        let client = EscClient::connect(EscBackend::DryRun, &EscSettings::default())
            .await
            .unwrap();
        let err = client
            .send(ThrottleCmd::new(EscChannel::Esc2, MAX_PULSE_US + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EscError::InvalidPulse(2001)));
    }

    #[tokio::test]
    async fn test_dry_run_accepts_commands() {
        let client = EscClient::connect(EscBackend::DryRun, &EscSettings::default())
            .await
            .unwrap();
        client
            .send(ThrottleCmd::new(EscChannel::Esc1, 2000))
            .await
            .unwrap();
        client.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_fails_without_daemon() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(
            EscClient::connect(EscBackend::Pigpio { addr }, &EscSettings::default())
                .await
                .is_err()
        );
    }
}
