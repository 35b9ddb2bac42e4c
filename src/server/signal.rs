// Signal handling module
//
// - SIGTERM: Graceful shutdown
// - SIGINT:  Graceful shutdown (Ctrl+C)

use crate::logger;

/// Resolve once a shutdown signal arrives (Unix)
///
/// If a handler cannot be registered the other one still works; if neither
/// can, the future never resolves and the server runs until killed.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = signal(SignalKind::terminate());
    let sigint = signal(SignalKind::interrupt());

    let (mut sigterm, mut sigint) = match (sigterm, sigint) {
        (Ok(term), Ok(int)) => (Some(term), Some(int)),
        (term, int) => {
            logger::log_warning("Failed to register some signal handlers");
            (term.ok(), int.ok())
        }
    };

    tokio::select! {
        Some(()) = recv_or_pending(sigterm.as_mut()) => {
            logger::log_info("[SIGNAL] SIGTERM received, shutting down");
        }
        Some(()) = recv_or_pending(sigint.as_mut()) => {
            logger::log_info("[SIGNAL] SIGINT received (Ctrl+C), shutting down");
        }
        else => std::future::pending::<()>().await,
    }
}

#[cfg(unix)]
async fn recv_or_pending(sig: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match sig {
        Some(sig) => sig.recv().await,
        None => std::future::pending().await,
    }
}

/// Windows fallback - only handles Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::log_info("[SIGNAL] Ctrl+C received, shutting down"),
        Err(e) => {
            logger::log_warning(&format!("Failed to register Ctrl+C handler: {e}"));
            std::future::pending::<()>().await;
        }
    }
}
