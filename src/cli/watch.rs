//! Watch mode entry point.

use anyhow::{Context, Result};
use crossbeam::channel;

use crate::actor::Coordinator;
use crate::core::register_shutdown;
use crate::engine::Engine;

/// Build once, then rebuild on every change until Ctrl+C.
pub fn run(engine: Engine) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = channel::bounded(1);
    register_shutdown(shutdown_tx);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async {
        Coordinator::new(engine)
            .with_shutdown_signal(shutdown_rx)
            .run()
            .await
    })
}
