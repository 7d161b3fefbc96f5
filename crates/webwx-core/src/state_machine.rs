use crate::{error::ClientError, types::LoginState};

/// Login lifecycle state machine.
///
/// Drives one login attempt from `Unauthenticated` to `Authenticated`, or to
/// the terminal `Failed` once the retry budget runs out. QR re-issuance after
/// a poll timeout loops the machine back to `QrIssued` without leaving the
/// attempt.
#[derive(Debug, Clone)]
pub struct LoginStateMachine {
    state: LoginState,
}

impl Default for LoginStateMachine {
    fn default() -> Self {
        Self {
            state: LoginState::Unauthenticated,
        }
    }
}

impl LoginStateMachine {
    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Whether this attempt can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, LoginState::Failed)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, LoginState::Authenticated)
    }

    /// A fresh login identifier was obtained (initial issue or timeout re-issue).
    pub fn qr_issued(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[
                LoginState::Unauthenticated,
                LoginState::QrIssued,
                LoginState::AwaitingScan,
                LoginState::Scanned,
            ],
            LoginState::QrIssued,
            "qr_issued",
        )
    }

    /// The status poll loop started.
    pub fn awaiting_scan(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[LoginState::QrIssued, LoginState::Scanned],
            LoginState::AwaitingScan,
            "awaiting_scan",
        )
    }

    /// The QR was scanned; on-device confirmation is pending.
    pub fn scanned(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[LoginState::AwaitingScan, LoginState::Scanned],
            LoginState::Scanned,
            "scanned",
        )
    }

    /// The service confirmed login and issued its credential redirect.
    pub fn redirect_received(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[LoginState::AwaitingScan, LoginState::Scanned],
            LoginState::RedirectReceived,
            "redirect_received",
        )
    }

    /// Credential fields were extracted from the redirect body.
    pub fn credentials_extracted(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[LoginState::RedirectReceived],
            LoginState::CredentialsExtracted,
            "credentials_extracted",
        )
    }

    /// Session initialization completed; the sync loop may start.
    pub fn authenticated(&mut self) -> Result<LoginState, ClientError> {
        self.transition_from_any_of(
            &[LoginState::CredentialsExtracted],
            LoginState::Authenticated,
            "authenticated",
        )
    }

    /// Retry budget exhausted; terminal for this attempt.
    pub fn failed(&mut self) -> LoginState {
        self.state = LoginState::Failed;
        self.state
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[LoginState],
        next: LoginState,
        action: &str,
    ) -> Result<LoginState, ClientError> {
        if !expected.contains(&self.state) {
            return Err(ClientError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(next)
    }
}
