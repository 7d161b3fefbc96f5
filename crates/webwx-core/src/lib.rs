//! Core session/protocol types shared by the webwx client and its host glue.
//!
//! This crate is network-free: it defines the login lifecycle state machine,
//! the credential store with its atomic sync cursor, the contact directory
//! with its classification rule, normalized-message helpers, bounded retry
//! primitives, and the command/event channel pair.

/// Async command/event channel primitives.
pub mod channel;
/// Contact directory and the classification rule.
pub mod directory;
/// Stable error types.
pub mod error;
/// Group-content splitting and message assembly helpers.
pub mod normalization;
/// Bounded retry budget and backoff policy.
pub mod retry;
/// Session-scoped credential store with snapshot persistence.
pub mod session;
/// Login lifecycle state machine.
pub mod state_machine;
/// Shared protocol-facing types (contacts, messages, commands, events).
pub mod types;

pub use channel::{ChannelError, ClientChannels, EventStream};
pub use directory::{classify, is_group_id, Directory, GROUP_SIGIL};
pub use error::{ClientError, ErrorCategory};
pub use normalization::{
    direct_message, group_message, split_group_content, GROUP_CONTENT_DELIMITER,
};
pub use retry::{BackoffPolicy, RetryBudget};
pub use session::{
    generate_device_id, BaseRequest, SelfIdentity, Session, SyncKey, SyncKeyItem,
};
pub use state_machine::LoginStateMachine;
pub use types::{
    ClientEvent, Contact, ContactClass, GroupMember, GroupProvenance, LoginState,
    NormalizedMessage, SendCommand, SendReport,
};
