//! Process state shared with the Ctrl+C handler.
//!
//! - `SHUTDOWN`: has shutdown been requested?
//! - `SHUTDOWN_TX`: wakes the watch-mode actors once registered

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Shutdown signal sender for the actor system
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Install the Ctrl+C handler. Call once at program start.
///
/// - Before `register_shutdown()`: exits right away, nothing to wind down
/// - After `register_shutdown()`: notifies the actors; a second Ctrl+C exits
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        let repeated = SHUTDOWN.swap(true, Ordering::SeqCst);

        match SHUTDOWN_TX.get() {
            Some(tx) if !repeated => {
                crate::log!("watch"; "shutting down...");
                let _ = tx.send(());
            }
            _ => std::process::exit(130),
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Route Ctrl+C to the actor system instead of exiting.
pub fn register_shutdown(tx: crossbeam::channel::Sender<()>) {
    let _ = SHUTDOWN_TX.set(tx);
}

pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
