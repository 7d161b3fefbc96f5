//! Login flow: QR issuance, push-login fast path, status polling, and
//! redirect-based credential extraction.

use serde_json::json;
use tracing::{debug, info, warn};
use webwx_core::{
    ClientError, ClientEvent, ErrorCategory, LoginStateMachine, RetryBudget, SelfIdentity,
};

use crate::{extract, urls, wire, WxClient};

const STATUS_SUCCESS: &str = "200";
const STATUS_SCANNED: &str = "201";
const STATUS_TIMEOUT: &str = "408";

const QR_PATTERN: &str =
    r#"window.QRLogin.code = (?P<code>\d+); window.QRLogin.uuid = "(?P<uuid>[^"]+)";"#;
const POLL_CODE_PATTERN: &str = r"window.code=(?P<code>\d+)";
const REDIRECT_PATTERN: &str = r#"window.redirect_uri="(?P<redirect_uri>[^"]+)";"#;

/// Element names carried by the credential redirect body, in no guaranteed
/// order; any of them may be absent.
const CREDENTIAL_TAGS: [&str; 4] = ["skey", "wxsid", "wxuin", "pass_ticket"];

impl WxClient {
    /// Blocking login sequence. Returns once authenticated, or with an error
    /// after the bounded attempt budget is spent.
    pub async fn login(&self) -> Result<(), ClientError> {
        let mut machine = LoginStateMachine::default();
        let mut budget = RetryBudget::new(self.config.max_login_attempts);

        // Fast path: a restored snapshot may yield a service-confirmed login
        // identifier without a new scan. Failure falls through to QR issuance.
        let mut have_login_id = self.push_login().await;
        if have_login_id {
            info!("push login accepted, confirm on the paired device");
        }

        let mut attempt: u32 = 0;
        while budget.spend() {
            if !have_login_id {
                match self.issue_qr().await {
                    Ok(login_id) => debug!(%login_id, "fresh login identifier issued"),
                    Err(err) => {
                        warn!(%err, "login identifier issuance failed");
                        self.wait_before_reissue(attempt).await;
                        attempt += 1;
                        continue;
                    }
                }
            }
            have_login_id = false;

            machine.qr_issued()?;
            machine.awaiting_scan()?;
            self.emit(ClientEvent::StateChanged {
                state: machine.state(),
            });

            loop {
                let (code, body) = self.poll_login_once().await;
                match code.as_str() {
                    STATUS_SUCCESS => {
                        machine.redirect_received()?;
                        self.extract_credentials(&body).await?;
                        machine.credentials_extracted()?;
                        self.init_session().await?;
                        machine.authenticated()?;
                        self.emit(ClientEvent::StateChanged {
                            state: machine.state(),
                        });
                        info!("login succeeded");
                        return Ok(());
                    }
                    STATUS_SCANNED => {
                        // No state regression, no budget cost: just keep polling.
                        let _ = machine.scanned();
                        debug!("scanned, waiting for on-device confirmation");
                        tokio::time::sleep(self.config.scan_poll_delay).await;
                    }
                    STATUS_TIMEOUT => {
                        debug!(remaining = budget.remaining(), "login poll timed out");
                        break;
                    }
                    other => {
                        warn!(code = other, "unexpected login poll status");
                        break;
                    }
                }
            }

            self.wait_before_reissue(attempt).await;
            attempt += 1;
        }

        machine.failed();
        self.emit(ClientEvent::StateChanged {
            state: machine.state(),
        });
        Err(ClientError::login_exhausted(self.config.max_login_attempts))
    }

    /// Request a fresh login identifier and announce the QR payload.
    pub(crate) async fn issue_qr(&self) -> Result<String, ClientError> {
        let body = self
            .http
            .get_text(&urls::qr_issue(&self.config.login_root), &[])
            .await
            .unwrap_or_default();

        let login_id = extract::capture_one(QR_PATTERN, &body, "uuid").ok_or_else(|| {
            ClientError::new(
                ErrorCategory::Network,
                "qr_issue_failed",
                "login identifier missing from QR issuance response",
            )
        })?;

        self.session.write().await.login_id = Some(login_id.clone());
        self.emit(ClientEvent::QrReady {
            login_id: login_id.clone(),
            payload_url: urls::qr_payload(&self.config.login_root, &login_id),
        });
        Ok(login_id)
    }

    /// One status poll: `(classified code, raw body)`. An unreadable response
    /// classifies as a hard failure of the attempt, never a crash.
    pub(crate) async fn poll_login_once(&self) -> (String, String) {
        let login_id = self
            .session
            .read()
            .await
            .login_id
            .clone()
            .unwrap_or_default();
        let body = self
            .http
            .get_text(&urls::login_poll(&self.config.login_root, &login_id), &[])
            .await
            .unwrap_or_default();

        let code = extract::capture_one(POLL_CODE_PATTERN, &body, "code")
            .unwrap_or_else(|| "400".to_owned());
        (code, body)
    }

    /// Follow the service-issued redirect (without further redirects) and
    /// pull the four credential fields out of its element tree.
    pub(crate) async fn extract_credentials(&self, poll_body: &str) -> Result<(), ClientError> {
        let redirect_uri = extract::capture_one(REDIRECT_PATTERN, poll_body, "redirect_uri")
            .ok_or_else(|| {
                ClientError::new(
                    ErrorCategory::Auth,
                    "redirect_missing",
                    "login succeeded but no redirect uri was issued",
                )
            })?;

        let body = self
            .http
            .get_text(&redirect_uri, &[])
            .await
            .unwrap_or_default();

        let ticket = redirect_uri
            .rfind('/')
            .map(|idx| redirect_uri[..idx].to_owned())
            .unwrap_or_else(|| redirect_uri.clone());
        let (file_endpoint, sync_endpoint) = urls::select_backend(&ticket);

        let mut session = self.session.write().await;
        for tag in CREDENTIAL_TAGS {
            // Absence leaves the field unset; authenticated calls detect and
            // reject incomplete credentials instead of sending garbage.
            let value = extract::tag_text(tag, &body);
            match tag {
                "skey" => session.skey = value,
                "wxsid" => session.sid = value,
                "wxuin" => session.uin = value,
                "pass_ticket" => session.pass_ticket = value,
                _ => unreachable!(),
            }
        }
        session.session_ticket = Some(ticket);
        session.file_endpoint = Some(file_endpoint);
        session.sync_endpoint = Some(sync_endpoint);
        Ok(())
    }

    /// `webwxinit`: establish self identity and the first sync cursor.
    pub(crate) async fn init_session(&self) -> Result<(), ClientError> {
        let (url, base_request) = {
            let session = self.session.read().await;
            (
                urls::web_init(session.session_ticket()?),
                session.base_request()?,
            )
        };

        let body = self
            .http
            .post_json(&url, &json!({ "BaseRequest": base_request }))
            .await
            .unwrap_or_default();
        let response: wire::InitResponse = extract::decode_payload(&body);
        if !response.base_response.ok() {
            return Err(ClientError::new(
                ErrorCategory::Auth,
                "init_failed",
                format!("web init rejected: ret={}", response.base_response.ret),
            ));
        }

        let sync_key = response.sync_key.ok_or_else(|| {
            ClientError::new(
                ErrorCategory::Auth,
                "init_failed",
                "web init response carried no sync cursor",
            )
        })?;

        let mut session = self.session.write().await;
        if let Some(user) = response.user {
            session.set_self_identity(SelfIdentity {
                user_name: user.user_name,
                nick_name: user.nick_name,
            });
        }
        session.update_sync_key(sync_key);
        Ok(())
    }

    /// Post-login status notification. Non-fatal; the service merely uses it
    /// to mark the web session active.
    pub(crate) async fn notify_status(&self) -> bool {
        let (url, base_request, user_name) = {
            let session = self.session.read().await;
            let (Ok(ticket), Ok(base_request)) = (session.session_ticket(), session.base_request())
            else {
                return false;
            };
            let user_name = session
                .self_identity
                .as_ref()
                .map(|id| id.user_name.clone())
                .unwrap_or_default();
            (
                urls::status_notify(
                    ticket,
                    session.pass_ticket.as_deref().unwrap_or_default(),
                ),
                base_request,
                user_name,
            )
        };

        let body = self
            .http
            .post_json(
                &url,
                &json!({
                    "BaseRequest": base_request,
                    "Code": 3,
                    "FromUserName": user_name,
                    "ToUserName": user_name,
                    "ClientMsgId": urls::timestamp_secs(),
                }),
            )
            .await
            .unwrap_or_default();
        let response: wire::SendResponse = extract::decode_payload(&body);
        response.base_response.ok()
    }

    /// Push-login fast path: ask the service to confirm a restored uid.
    /// Returns false on any failure; the caller falls back to QR issuance.
    pub(crate) async fn push_login(&self) -> bool {
        let url = {
            let session = self.session.read().await;
            let (Some(ticket), Some(uin)) = (&session.session_ticket, &session.uin) else {
                return false;
            };
            urls::push_login(ticket, uin)
        };

        let Some(body) = self.http.get_text(&url, &[]).await else {
            return false;
        };
        let response: wire::PushLoginResponse = extract::decode_payload(&body);
        if !response.ok() {
            debug!(ret = %response.ret, "push login rejected");
            return false;
        }

        self.session.write().await.login_id = Some(response.uuid);
        true
    }

    async fn wait_before_reissue(&self, attempt: u32) {
        let delay = self.config.reissue_backoff.delay_for_attempt(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
