use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Login lifecycle state reported to consumers.
///
/// `Failed` is terminal for one login run; a caller may construct a fresh
/// state machine to retry from scratch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoginState {
    /// No login attempt has started.
    Unauthenticated,
    /// A fresh login identifier was obtained and the QR payload exists.
    QrIssued,
    /// Polling the status endpoint, waiting for the user to scan.
    AwaitingScan,
    /// The QR was scanned; waiting for on-device confirmation.
    Scanned,
    /// The service issued its credential redirect.
    RedirectReceived,
    /// All credential fields were extracted from the redirect body.
    CredentialsExtracted,
    /// The session is fully established; sync may start.
    Authenticated,
    /// The retry budget was exhausted; the caller must stop this attempt.
    Failed,
}

/// Classification of a directory entry, derived fresh on every write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContactClass {
    /// Built-in/system account (no sigil prefix).
    Special,
    /// Verified subscription/broadcast account.
    Subscription,
    /// Group chat (`@@` identifier prefix).
    Group,
    /// Direct contact (`@` identifier prefix).
    Friend,
}

/// One member of a group's nested member map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    /// Stable member identifier.
    pub user_name: String,
    /// Member display name, possibly empty.
    pub nick_name: String,
}

/// One directory entry: friend, group, subscription account, or special account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Stable contact identifier.
    pub user_name: String,
    /// Display name, possibly empty.
    pub nick_name: String,
    /// Raw verification flags as reported by the service.
    pub verify_flag: i64,
    /// Class stamped at write time; never trusted from a stale copy.
    pub contact_class: ContactClass,
    /// Member map, populated only for groups.
    pub members: HashMap<String, GroupMember>,
}

/// One message after directory resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedMessage {
    /// Sender identifier; always non-empty.
    pub sender_id: String,
    /// Resolved sender display name; empty when resolution failed.
    pub sender_name: String,
    /// Message body.
    pub content: String,
    /// Group provenance, present only for messages received via a group.
    pub group: Option<GroupProvenance>,
}

/// Originating group attached to group-routed messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupProvenance {
    /// Group identifier (`@@…`).
    pub group_id: String,
    /// Group display name; empty when unresolved.
    pub group_name: String,
}

/// Inbound command: send one body to a list of recipients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendCommand {
    /// Message body to deliver.
    pub content: String,
    /// Target contact identifiers, one outbound send each.
    pub recipients: Vec<String>,
}

/// Per-recipient outcome of a fanned-out send command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendReport {
    /// Recipient the send was addressed to.
    pub recipient: String,
    /// Whether the service acknowledged the send.
    pub accepted: bool,
}

/// Event channel output emitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientEvent {
    /// Login lifecycle transition.
    StateChanged {
        /// New lifecycle state.
        state: LoginState,
    },
    /// A QR payload is ready and must be shown to the user.
    QrReady {
        /// Short-lived login identifier backing this QR.
        login_id: String,
        /// Canonical payload URL encoded into the QR image.
        payload_url: String,
    },
    /// One normalized inbound message.
    Message(NormalizedMessage),
    /// Per-recipient outcome of an outbound send.
    SendReport(SendReport),
    /// The server invalidated the session; a full re-login is required.
    SessionDead {
        /// Last return code observed before giving up.
        retcode: i64,
    },
}
