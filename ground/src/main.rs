//! Ground-station relay entry point.
//!
//! Bridges a spacecraft link and a Mission Operations Centre: telemetry
//! (TM) frames flow spacecraft → ground → MOC-RAF, and commands (CLTUs)
//! flow MOC-FSP → ground → spacecraft. See [`relay`] for the endpoint and
//! queue wiring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use space_relay_ground::config::{Cli, RelayConfig};
use space_relay_ground::relay::RelayEngine;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = RelayConfig::load(&cli)?;
    info!("loaded configuration: {config:?}");

    let running = Arc::new(AtomicBool::new(true));
    install_shutdown_handler(Arc::clone(&running))?;

    let engine = RelayEngine::new(config, running);
    match engine.run() {
        Ok(()) => {
            info!("relay shut down cleanly");
            Ok(())
        }
        Err(err) => {
            error!("relay failed to start: {err}");
            Err(err)
        }
    }
}

/// Install a Ctrl-C handler that clears the shared `running` flag, which
/// every endpoint thread polls at its accept/read/write/queue-poll
/// boundaries.
fn install_shutdown_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| anyhow::anyhow!("failed to install signal handler: {err}"))
}
