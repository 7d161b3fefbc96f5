//! Outbound sends: cool-down gate, message id generation, and fan-out.
//!
//! The service throttles chatty web sessions, so every recipient has an
//! enforced quiet window between sends. Commands addressed to several
//! recipients fan out concurrently; each recipient waits only on its own
//! window.

use std::{collections::HashMap, sync::Arc, time::Duration};

use rand::Rng;
use serde_json::json;
use tokio::{sync::Mutex, task::JoinSet, time::Instant};
use tracing::{debug, warn};
use webwx_core::{ClientEvent, SendCommand, SendReport};

use crate::{extract, urls, wire, WxClient};

/// Per-recipient cool-down gate.
///
/// `acquire` returns once the recipient's quiet window has elapsed and stamps
/// the new send time. Stamping happens under the lock, so two concurrent
/// sends to one recipient serialize a full window apart.
#[derive(Debug)]
pub struct SendGate {
    cooldown: Duration,
    last_send: Mutex<HashMap<String, Instant>>,
}

impl SendGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_send: Mutex::new(HashMap::new()),
        }
    }

    /// Wait out the recipient's quiet window, then claim the next one.
    pub async fn acquire(&self, recipient: &str) {
        loop {
            let wait = {
                let mut last_send = self.last_send.lock().await;
                let now = Instant::now();
                match last_send.get(recipient) {
                    Some(previous) if now.duration_since(*previous) < self.cooldown => {
                        self.cooldown - now.duration_since(*previous)
                    }
                    _ => {
                        last_send.insert(recipient.to_owned(), now);
                        return;
                    }
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Client-generated message id: epoch milliseconds with a random suffix.
pub(crate) fn generate_message_id() -> String {
    let mut rng = rand::rng();
    format!(
        "{}{:04}",
        urls::timestamp_millis(),
        rng.random_range(0..10_000u32)
    )
}

impl WxClient {
    /// Fan one command out to every recipient, emitting a report per
    /// recipient as it completes. Returns the collected reports.
    pub async fn dispatch(self: &Arc<Self>, command: SendCommand) -> Vec<SendReport> {
        let mut tasks = JoinSet::new();
        for recipient in command.recipients {
            let client = Arc::clone(self);
            let content = command.content.clone();
            tasks.spawn(async move {
                let accepted = client.send_text(&recipient, &content).await;
                let report = SendReport { recipient, accepted };
                client.emit(ClientEvent::SendReport(report.clone()));
                report
            });
        }

        let mut reports = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => warn!(%err, "send task aborted"),
            }
        }
        reports
    }

    /// One cool-down-gated text send. Returns whether the service accepted
    /// it; missing credentials or transport failure read as rejection.
    pub async fn send_text(&self, recipient: &str, content: &str) -> bool {
        self.gate.acquire(recipient).await;

        let (url, payload) = {
            let session = self.session.read().await;
            let Ok(ticket) = session.session_ticket() else {
                warn!(recipient, "send refused, session ticket missing");
                return false;
            };
            let Ok(base_request) = session.base_request() else {
                warn!(recipient, "send refused, credentials incomplete");
                return false;
            };
            let from = session
                .self_identity
                .as_ref()
                .map(|id| id.user_name.clone())
                .unwrap_or_default();
            let message_id = generate_message_id();
            (
                urls::send_msg(
                    ticket,
                    session.pass_ticket.as_deref().unwrap_or_default(),
                ),
                json!({
                    "BaseRequest": base_request,
                    "Msg": {
                        "Type": 1,
                        "Content": content,
                        "FromUserName": from,
                        "ToUserName": recipient,
                        "LocalID": message_id,
                        "ClientMsgId": message_id,
                    },
                    "Scene": 0,
                }),
            )
        };

        let Some(body) = self.http.post_json(&url, &payload).await else {
            return false;
        };
        let response: wire::SendResponse = extract::decode_payload(&body);
        if !response.base_response.ok() {
            debug!(
                recipient,
                ret = response.base_response.ret,
                "send rejected by the service"
            );
        }
        response.base_response.ok()
    }
}
