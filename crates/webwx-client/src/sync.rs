//! Long-poll sync loop.
//!
//! Each cycle is one `synccheck` long poll followed, when the selector says
//! new data exists, by one keyed `webwxsync` exchange. Healthy cycles reset
//! the failure budget; invalidation retcodes and garbage responses spend it.
//! When the budget runs out the session is marked dead and the loop exits.

use std::sync::Arc;

use serde_json::json;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webwx_core::{ClientError, ClientEvent, RetryBudget};

use crate::{extract, urls, wire, WxClient};

/// Per-cycle callback, run after event emission. Used by embedders to flush
/// queued outbound work on the sync cadence.
pub type CycleHook = Arc<dyn Fn() -> Result<(), ClientError> + Send + Sync>;

const SYNC_CHECK_PATTERN: &str =
    r#"window.synccheck=\{retcode:"(?P<retcode>\d+)",selector:"(?P<selector>\d+)"\}"#;

/// Retcodes the service uses to announce that this session was invalidated
/// (logout elsewhere, credential expiry).
const RETCODE_OK: i64 = 0;
const RETCODE_LOGOUT: i64 = 1100;
const RETCODE_KICKED: i64 = 1101;

const SELECTOR_IDLE: i64 = 0;

impl WxClient {
    /// Drive sync cycles until cancellation or session death.
    pub(crate) async fn sync_loop(&self, cancel: CancellationToken, hook: Option<CycleHook>) {
        let mut budget = RetryBudget::new(self.config.max_sync_failures);
        self.set_alive(true);
        info!("sync loop started");

        while !cancel.is_cancelled() {
            let cycle_start = Instant::now();

            let (retcode, selector) = self.sync_check().await;
            match retcode {
                RETCODE_OK => {
                    budget.reset();
                    if selector != SELECTOR_IDLE {
                        self.pull_new_events().await;
                    }
                }
                RETCODE_LOGOUT | RETCODE_KICKED => {
                    warn!(retcode, "session invalidated by the service");
                    budget.spend();
                    if budget.exhausted() {
                        self.die(retcode);
                        return;
                    }
                }
                other => {
                    warn!(retcode = other, "sync check returned an unhealthy retcode");
                    budget.spend();
                    if budget.exhausted() {
                        self.die(other);
                        return;
                    }
                }
            }

            if let Some(hook) = &hook {
                if let Err(err) = hook() {
                    warn!(%err, "cycle hook failed");
                }
            }

            // Long polls that return instantly (errors, hot selectors) must
            // not spin; pad every cycle to the minimum interval.
            let elapsed = cycle_start.elapsed();
            if elapsed < self.config.min_cycle_interval {
                let remainder = self.config.min_cycle_interval - elapsed;
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(remainder) => {}
                }
            }
        }

        info!("sync loop stopped");
    }

    /// One `synccheck` long poll: `(retcode, selector)`, `-1` for any field
    /// that cannot be read out of the response.
    pub async fn sync_check(&self) -> (i64, i64) {
        let (url, query) = {
            let session = self.session.read().await;
            let Some(sync_endpoint) = session.sync_endpoint.clone() else {
                return (-1, -1);
            };
            let query = vec![
                ("r", urls::timestamp_millis().to_string()),
                ("skey", session.skey.clone().unwrap_or_default()),
                ("sid", session.sid.clone().unwrap_or_default()),
                ("uin", session.uin.clone().unwrap_or_default()),
                ("deviceid", session.device_id.clone()),
                ("synckey", session.sync_key_cursor.clone()),
                ("_", urls::timestamp_secs().to_string()),
            ];
            (urls::sync_check(&sync_endpoint), query)
        };

        let body = self.http.get_text(&url, &query).await.unwrap_or_default();

        let fields = extract::capture(SYNC_CHECK_PATTERN, &body);
        let read = |name: &str| {
            fields
                .get(name)
                .and_then(|value| value.parse::<i64>().ok())
                .unwrap_or(-1)
        };
        (read("retcode"), read("selector"))
    }

    /// Keyed `webwxsync` exchange. The cursor only advances when the response
    /// status is success; a failed exchange leaves it untouched so the next
    /// cycle re-fetches the same window.
    pub async fn full_sync(&self) -> Option<wire::SyncResponse> {
        let (url, payload) = {
            let session = self.session.read().await;
            let ticket = session.session_ticket().ok()?;
            let base_request = session.base_request().ok()?;
            let url = urls::full_sync(
                ticket,
                session.sid.as_deref().unwrap_or_default(),
                session.skey.as_deref().unwrap_or_default(),
                session.pass_ticket.as_deref().unwrap_or_default(),
            );
            let payload = json!({
                "BaseRequest": base_request,
                "SyncKey": &session.sync_key,
                "rr": !(urls::timestamp_secs() as i64),
            });
            (url, payload)
        };

        let body = self.http.post_json(&url, &payload).await?;
        let response: wire::SyncResponse = extract::decode_payload(&body);
        if !response.base_response.ok() {
            debug!(ret = response.base_response.ret, "sync exchange rejected");
            return None;
        }

        if let Some(next_cursor) = &response.sync_check_key {
            if !next_cursor.list.is_empty() {
                self.session
                    .write()
                    .await
                    .update_sync_key(next_cursor.clone());
            }
        }
        Some(response)
    }

    async fn pull_new_events(&self) {
        let Some(response) = self.full_sync().await else {
            return;
        };
        if response.add_msg_list.is_empty() {
            return;
        }

        let messages = self.resolve_messages(&response.add_msg_list).await;
        debug!(
            raw = response.add_msg_list.len(),
            resolved = messages.len(),
            "sync cycle delivered events"
        );
        for message in messages {
            self.emit(ClientEvent::Message(message));
        }
    }

    fn die(&self, retcode: i64) {
        self.set_alive(false);
        self.emit(ClientEvent::SessionDead { retcode });
        warn!(retcode, "session marked dead");
    }
}
