//! Signal handling for graceful shutdown.

use tokio::signal::unix::{SignalKind, signal};

/// The signal that asked the demo to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    Terminate,
    Interrupt,
}

/// Wait for SIGTERM or SIGINT (Ctrl+C).
pub async fn shutdown_signal() -> std::io::Result<StopSignal> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let received = tokio::select! {
        _ = sigterm.recv() => StopSignal::Terminate,
        _ = sigint.recv() => StopSignal::Interrupt,
    };
    tracing::info!(signal = ?received, "Initiating graceful shutdown");
    Ok(received)
}
