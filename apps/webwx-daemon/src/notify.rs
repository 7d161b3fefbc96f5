//! Operator-facing event hand-off.
//!
//! The daemon has no UI; everything an operator must act on (scan this QR,
//! session died) goes through a [`Notifier`]. The default implementation
//! writes to the log, which is enough for terminal operation.

use tracing::{info, warn};
use webwx_core::{ClientEvent, LoginState, NormalizedMessage};

/// Sink for events that need operator attention or archival.
pub trait Notifier: Send + Sync {
    /// A QR payload must be shown to the user for scanning.
    fn qr_ready(&self, login_id: &str, payload_url: &str);
    /// One inbound message arrived.
    fn message(&self, message: &NormalizedMessage);
    /// The login lifecycle moved.
    fn state_changed(&self, state: LoginState);
    /// The service invalidated the session; a re-scan is required.
    fn session_dead(&self, retcode: i64);

    /// Route one client event to the matching handler.
    fn handle(&self, event: &ClientEvent) {
        match event {
            ClientEvent::QrReady {
                login_id,
                payload_url,
            } => self.qr_ready(login_id, payload_url),
            ClientEvent::Message(message) => self.message(message),
            ClientEvent::StateChanged { state } => self.state_changed(*state),
            ClientEvent::SessionDead { retcode } => self.session_dead(*retcode),
            ClientEvent::SendReport(report) => {
                if report.accepted {
                    info!(recipient = %report.recipient, "send accepted");
                } else {
                    warn!(recipient = %report.recipient, "send rejected");
                }
            }
        }
    }
}

/// Notifier that writes everything to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn qr_ready(&self, login_id: &str, payload_url: &str) {
        info!(login_id, payload_url, "scan this URL as a QR code to log in");
    }

    fn message(&self, message: &NormalizedMessage) {
        match &message.group {
            Some(group) => info!(
                sender = %message.sender_id,
                sender_name = %message.sender_name,
                group = %group.group_name,
                content = %message.content,
                "group message"
            ),
            None => info!(
                sender = %message.sender_id,
                sender_name = %message.sender_name,
                content = %message.content,
                "direct message"
            ),
        }
    }

    fn state_changed(&self, state: LoginState) {
        info!(?state, "login state changed");
    }

    fn session_dead(&self, retcode: i64) {
        warn!(retcode, "session invalidated, re-scan required");
    }
}
