//! Watch-loop shutdown.
//!
//! The first Ctrl+C cancels a [`CancellationToken`] so the loop can finish
//! the fetch in flight; a second Ctrl+C force-exits.

use tokio_util::sync::CancellationToken;

pub(crate) fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let handler = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::warn!("Failed to listen for Ctrl+C; watch loop will not stop gracefully");
            return;
        }
        tracing::info!("Interrupt received, finishing the current cycle (Ctrl+C again to force exit)");
        handler.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Force exit requested");
            std::process::exit(130);
        }
    });
    token
}
