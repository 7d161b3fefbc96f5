//! Headless session daemon.
//!
//! Wires the protocol client to the host environment: env-driven
//! configuration, log-based QR hand-off, inbound command fan-out, and
//! graceful shutdown on Ctrl-C.

mod config;
mod logging;
mod notify;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use webwx_client::WxClient;
use webwx_core::ClientChannels;

use crate::{
    config::DaemonConfig,
    notify::{LogNotifier, Notifier},
};

#[tokio::main]
async fn main() {
    logging::init();

    let config = match DaemonConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let (channels, mut command_rx) =
        ClientChannels::new(config.command_buffer, config.event_buffer);
    let client = match WxClient::new(config.client_config(), channels.event_sender()) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            eprintln!("client initialization failed: {err}");
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();

    // Ctrl-C cancels the sync loop; the main task then logs out and exits.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                cancel.cancel();
            }
        });
    }

    // Operator-facing event tail.
    {
        let mut events = channels.subscribe();
        let notifier = LogNotifier;
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => notifier.handle(&event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "event tail lagged behind")
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    // Inbound command fan-out.
    {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if !client.alive() {
                    warn!("dropping a send command, session is not alive");
                    continue;
                }
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    client.dispatch(command).await;
                });
            }
        });
    }

    match client.run(cancel.clone(), None).await {
        Ok(()) => {
            if cancel.is_cancelled() {
                client.logout().await;
            }
            info!("daemon exited");
        }
        Err(err) => {
            error!(%err, "session run failed");
            std::process::exit(1);
        }
    }
}
