// Server module entry point
// Accept loop, connection handling and the hyper side of body streaming

pub mod connection;
pub mod listener;
pub mod router;
pub mod signal;
pub mod sink;

use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::logger;

// Re-export commonly used items
pub use listener::create_reusable_listener;
pub use signal::shutdown_signal;

/// Accept connections until `shutdown` resolves
///
/// Connections already being served keep running in their own tasks.
pub async fn run(listener: TcpListener, config: Arc<Config>, shutdown: impl Future<Output = ()>) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(stream, peer_addr, &config, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = &mut shutdown => {
                logger::log_info("Shutdown requested, no longer accepting connections");
                break;
            }
        }
    }
}
