//! Session-scoped credential store.
//!
//! Holds everything one authenticated web session needs: the backend ticket
//! URL, the four base-request fields, the device id, the sync cursor, and the
//! authenticated identity. Populated incrementally during login, snapshotted
//! to disk afterwards, and optionally restored to drive the push-login fast
//! path.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ErrorCategory};

/// One (namespace, version) pair of the sync cursor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncKeyItem {
    #[serde(rename = "Key")]
    pub key: i64,
    #[serde(rename = "Val")]
    pub val: i64,
}

/// Structured sync cursor as issued by the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncKey {
    #[serde(rename = "Count")]
    pub count: u32,
    #[serde(rename = "List")]
    pub list: Vec<SyncKeyItem>,
}

impl SyncKey {
    /// Canonical string encoding echoed on every sync-check call.
    pub fn encode(&self) -> String {
        self.list
            .iter()
            .map(|item| format!("{}_{}", item.key, item.val))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// The four-field authentication envelope required on every authenticated call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseRequest {
    #[serde(rename = "Skey")]
    pub skey: String,
    #[serde(rename = "Sid")]
    pub sid: String,
    #[serde(rename = "Uin")]
    pub uin: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
}

/// Attributes of the authenticated identity, set once at init.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelfIdentity {
    /// Identifier of the logged-in account.
    pub user_name: String,
    /// Display name of the logged-in account.
    pub nick_name: String,
}

/// Mutable, session-scoped key/value state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Short-lived login identifier of the current QR attempt.
    pub login_id: Option<String>,
    /// Base URL of the authenticated backend host; set exactly once per login.
    pub session_ticket: Option<String>,
    /// File-transfer backend base URL selected during login.
    pub file_endpoint: Option<String>,
    /// Long-poll backend base URL selected during login.
    pub sync_endpoint: Option<String>,
    /// Session key extracted from the credential redirect.
    pub skey: Option<String>,
    /// Session id extracted from the credential redirect.
    pub sid: Option<String>,
    /// Numeric uid extracted from the credential redirect.
    pub uin: Option<String>,
    /// Pass-ticket extracted from the credential redirect.
    pub pass_ticket: Option<String>,
    /// Client-generated pseudo-random id, stable for the session lifetime.
    pub device_id: String,
    /// Structured sync cursor.
    pub sync_key: SyncKey,
    /// Canonical string encoding of the cursor; updated with it atomically.
    pub sync_key_cursor: String,
    /// Authenticated identity; read-only after initialization.
    pub self_identity: Option<SelfIdentity>,
}

impl Session {
    /// Create an empty session with a freshly generated device id.
    pub fn new() -> Self {
        Self {
            login_id: None,
            session_ticket: None,
            file_endpoint: None,
            sync_endpoint: None,
            skey: None,
            sid: None,
            uin: None,
            pass_ticket: None,
            device_id: generate_device_id(),
            sync_key: SyncKey::default(),
            sync_key_cursor: String::new(),
            self_identity: None,
        }
    }

    /// Backend ticket URL, required before any directory or sync operation.
    pub fn session_ticket(&self) -> Result<&str, ClientError> {
        self.session_ticket
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::missing_credential("session_ticket"))
    }

    /// Build the authentication envelope; rejects incomplete credentials
    /// instead of issuing malformed requests.
    pub fn base_request(&self) -> Result<BaseRequest, ClientError> {
        Ok(BaseRequest {
            skey: self.require_field(&self.skey, "skey")?,
            sid: self.require_field(&self.sid, "sid")?,
            uin: self.require_field(&self.uin, "uin")?,
            device_id: if self.device_id.is_empty() {
                return Err(ClientError::missing_credential("device_id"));
            } else {
                self.device_id.clone()
            },
        })
    }

    /// Replace the sync cursor: structured form and string encoding together.
    ///
    /// The two fields are only ever written through this method, so a caller
    /// can never observe one without the other.
    pub fn update_sync_key(&mut self, sync_key: SyncKey) {
        self.sync_key_cursor = sync_key.encode();
        self.sync_key = sync_key;
    }

    /// Record the authenticated identity; first write wins.
    pub fn set_self_identity(&mut self, identity: SelfIdentity) {
        if self.self_identity.is_none() {
            self.self_identity = Some(identity);
        }
    }

    /// Persist the full session to disk (atomic temp-file + rename).
    pub fn save_snapshot(&self, path: &Path) -> Result<(), ClientError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::new(
                    ErrorCategory::Storage,
                    "snapshot_dir_error",
                    format!("failed creating {}: {err}", parent.display()),
                )
            })?;
        }

        let encoded = serde_json::to_vec(self).map_err(|err| {
            ClientError::new(
                ErrorCategory::Serialization,
                "snapshot_serialize_error",
                err.to_string(),
            )
        })?;

        let temp_path = snapshot_temp_path(path);
        fs::write(&temp_path, encoded).map_err(|err| {
            ClientError::new(
                ErrorCategory::Storage,
                "snapshot_write_error",
                format!("failed writing {}: {err}", temp_path.display()),
            )
        })?;
        fs::rename(&temp_path, path).map_err(|err| {
            let _ = fs::remove_file(&temp_path);
            ClientError::new(
                ErrorCategory::Storage,
                "snapshot_write_error",
                format!("failed replacing {}: {err}", path.display()),
            )
        })
    }

    /// Load a prior snapshot. Absence is not an error; restore is best-effort
    /// and must still be verified against the service before being trusted.
    pub fn load_snapshot(path: &Path) -> Result<Option<Session>, ClientError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ClientError::new(
                    ErrorCategory::Storage,
                    "snapshot_read_error",
                    format!("failed reading {}: {err}", path.display()),
                ));
            }
        };

        serde_json::from_str::<Session>(&raw)
            .map(Some)
            .map_err(|err| {
                ClientError::new(
                    ErrorCategory::Serialization,
                    "snapshot_deserialize_error",
                    err.to_string(),
                )
            })
    }

    fn require_field(&self, field: &Option<String>, name: &str) -> Result<String, ClientError> {
        field
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| ClientError::missing_credential(name))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the client device id: `e` followed by 15 decimal digits.
pub fn generate_device_id() -> String {
    let mut rng = rand::rng();
    let mut id = String::with_capacity(16);
    id.push('e');
    for _ in 0..15 {
        id.push(char::from(b'0' + rng.random_range(0..10u8)));
    }
    id
}

fn snapshot_temp_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("session.json");
    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or(0);
    parent.join(format!(".{file_name}.{now_nanos}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(pairs: &[(i64, i64)]) -> SyncKey {
        SyncKey {
            count: pairs.len() as u32,
            list: pairs
                .iter()
                .map(|(key, val)| SyncKeyItem {
                    key: *key,
                    val: *val,
                })
                .collect(),
        }
    }

    #[test]
    fn encodes_cursor_in_pipe_separated_form() {
        assert_eq!(cursor(&[(1, 100), (2, 200)]).encode(), "1_100|2_200");
        assert_eq!(SyncKey::default().encode(), "");
    }

    #[test]
    fn sync_key_update_is_atomic() {
        let mut session = Session::new();
        session.update_sync_key(cursor(&[(1, 10)]));
        assert_eq!(session.sync_key_cursor, "1_10");

        session.update_sync_key(cursor(&[(1, 11), (3, 5)]));
        assert_eq!(session.sync_key.encode(), session.sync_key_cursor);
        assert_eq!(session.sync_key_cursor, "1_11|3_5");
    }

    #[test]
    fn base_request_rejects_missing_fields() {
        let mut session = Session::new();
        session.skey = Some("sk".into());
        session.sid = Some("sid".into());

        let err = session
            .base_request()
            .expect_err("incomplete credentials must be rejected");
        assert_eq!(err.code, "missing_credential");

        session.uin = Some("12345".into());
        let request = session.base_request().expect("complete request must build");
        assert_eq!(request.device_id, session.device_id);
    }

    #[test]
    fn device_id_has_expected_shape() {
        let id = generate_device_id();
        assert_eq!(id.len(), 16);
        assert!(id.starts_with('e'));
        assert!(id[1..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn self_identity_is_write_once() {
        let mut session = Session::new();
        session.set_self_identity(SelfIdentity {
            user_name: "@me".into(),
            nick_name: "Me".into(),
        });
        session.set_self_identity(SelfIdentity {
            user_name: "@other".into(),
            nick_name: "Other".into(),
        });

        assert_eq!(
            session.self_identity.expect("identity must be set").user_name,
            "@me"
        );
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("session.json");

        let mut session = Session::new();
        session.session_ticket = Some("https://wx.example/cgi-bin/mmwebwx-bin".into());
        session.update_sync_key(cursor(&[(1, 42)]));
        session.save_snapshot(&path).expect("save should work");

        let restored = Session::load_snapshot(&path)
            .expect("load should work")
            .expect("snapshot should be present");
        assert_eq!(restored, session);
    }

    #[test]
    fn missing_snapshot_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let restored = Session::load_snapshot(&dir.path().join("absent.json"))
            .expect("absent snapshot should load as None");
        assert_eq!(restored, None);
    }
}
