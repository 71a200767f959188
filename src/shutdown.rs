//! Signal handling.

use tracing::{error, info};

/// Resolve on SIGTERM or SIGINT (Ctrl+C elsewhere).
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
                    () = ctrl_c() => {}
                }
            }
            Err(err) => {
                error!(error = %err, "Failed to listen for SIGTERM");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
        Err(err) => error!(error = %err, "Failed to listen for shutdown signal"),
    }
}
