//! Session protocol engine for the undocumented browser-messaging service.
//!
//! Reconstructs the service's quasi-protocol from opaque text responses: QR
//! issuance, redirect-based ticket exchange, credential extraction, keyed
//! long-poll sync, and the contact directory message resolution depends on.
//! All network parsing is confined to [`extract`] and [`wire`]; everything
//! else operates on extracted structure.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
    sync::Arc,
    time::Duration,
};

use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use webwx_core::{
    BackoffPolicy, ClientError, ClientEvent, Directory, Session,
};

/// Response extractor (regex/markup/JSON boundary).
pub mod extract;
/// Shared HTTP transport.
pub mod http;
/// Endpoint builders and the backend host table.
pub mod urls;
/// Typed upstream payload views.
pub mod wire;

mod directory;
mod login;
mod resolver;
mod send;
mod sync;

pub use send::SendGate;
pub use sync::CycleHook;

use http::{HttpConfig, HttpSession};

/// Client tuning. Defaults reproduce the production protocol constants;
/// tests shrink the delays to zero and point `login_root` at a local server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for QR issuance and login polling.
    pub login_root: String,
    /// Transport settings.
    pub http: HttpConfig,
    /// Login attempts before the state machine goes to `Failed`.
    pub max_login_attempts: u32,
    /// Wait between scanned-awaiting-confirmation polls.
    pub scan_poll_delay: Duration,
    /// Wait before re-issuing a QR after a poll timeout.
    pub reissue_backoff: BackoffPolicy,
    /// Consecutive sync failures tolerated before the session is marked dead.
    pub max_sync_failures: u32,
    /// Minimum duration of one sync cycle; faster cycles wait the remainder.
    pub min_cycle_interval: Duration,
    /// Per-recipient outbound cool-down window.
    pub send_cooldown: Duration,
    /// Session snapshot location.
    pub snapshot_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            login_root: urls::LOGIN_ROOT.to_owned(),
            http: HttpConfig::default(),
            max_login_attempts: 3,
            scan_poll_delay: Duration::from_secs(1),
            reissue_backoff: BackoffPolicy::fixed(Duration::from_secs(20)),
            max_sync_failures: 3,
            min_cycle_interval: Duration::from_secs(1),
            send_cooldown: Duration::from_secs(10),
            snapshot_path: PathBuf::from("./.webwx-session.json"),
        }
    }
}

/// The session client: credential store, directory, and protocol operations.
///
/// One instance drives one authenticated session. The credential store sits
/// behind a single reader/writer lock so outbound sends always observe a
/// consistent `base_request`/`session_ticket` pair.
pub struct WxClient {
    pub(crate) config: ClientConfig,
    pub(crate) http: HttpSession,
    pub(crate) session: RwLock<Session>,
    pub(crate) directory: RwLock<Directory>,
    pub(crate) events: broadcast::Sender<ClientEvent>,
    pub(crate) gate: SendGate,
    alive: AtomicBool,
}

impl WxClient {
    pub fn new(
        config: ClientConfig,
        events: broadcast::Sender<ClientEvent>,
    ) -> Result<Self, ClientError> {
        let http = HttpSession::new(&config.http)?;
        let gate = SendGate::new(config.send_cooldown);
        Ok(Self {
            config,
            http,
            session: RwLock::new(Session::new()),
            directory: RwLock::new(Directory::new()),
            events,
            gate,
            alive: AtomicBool::new(false),
        })
    }

    /// Liveness flag: true while the sync loop considers the session healthy.
    pub fn alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Consistent copy of the current session state.
    pub async fn session_snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Run the whole lifecycle: best-effort snapshot restore, login, session
    /// snapshot persistence, directory bootstrap, then the sync loop until
    /// cancellation or session death.
    pub async fn run(
        self: &Arc<Self>,
        cancel: tokio_util::sync::CancellationToken,
        hook: Option<CycleHook>,
    ) -> Result<(), ClientError> {
        self.restore_snapshot().await;
        self.login().await?;

        if !self.notify_status().await {
            warn!("status notify was not acknowledged");
        }
        self.persist_snapshot().await;

        if let Err(err) = self.refresh_contacts().await {
            warn!(%err, "initial contact refresh failed");
        }

        if let Some(identity) = self.session.read().await.self_identity.as_ref() {
            info!(nick_name = %identity.nick_name, "session established");
        }

        self.sync_loop(cancel, hook).await;
        Ok(())
    }

    /// Tell the service this session is going away. Best-effort.
    pub async fn logout(&self) {
        let (ticket, skey) = {
            let session = self.session.read().await;
            match (session.session_ticket.clone(), session.skey.clone()) {
                (Some(ticket), Some(skey)) => (ticket, skey),
                _ => return,
            }
        };
        let _ = self
            .http
            .get_text(&urls::logout(&ticket, &skey), &[])
            .await;
        info!("logout requested");
    }

    async fn restore_snapshot(&self) {
        match Session::load_snapshot(&self.config.snapshot_path) {
            Ok(Some(restored)) => {
                info!("restored prior session snapshot");
                *self.session.write().await = restored;
            }
            Ok(None) => {}
            Err(err) => warn!(%err, "session snapshot unreadable, starting fresh"),
        }
    }

    pub(crate) async fn persist_snapshot(&self) {
        let session = self.session.read().await;
        if let Err(err) = session.save_snapshot(&self.config.snapshot_path) {
            warn!(%err, "session snapshot write failed");
        }
    }
}
