//! Directory refresh and lazy contact fetch.
//!
//! The bulk list endpoint returns every friend, subscription account, and
//! joined group, but group member rosters only come from the batch detail
//! endpoint, so the refresh runs both. Unknown senders seen mid-session are
//! resolved lazily through the same batch endpoint.

use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, info, warn};
use webwx_core::{ClientError, ErrorCategory, GroupMember};

use crate::{extract, urls, wire, WxClient};

/// Group detail requests are chunked; the service truncates larger batches.
const BATCH_SIZE: usize = 50;

impl WxClient {
    /// Full directory rebuild: bulk contact list, then member rosters for
    /// every known group.
    pub async fn refresh_contacts(&self) -> Result<(), ClientError> {
        let url = {
            let session = self.session.read().await;
            urls::contact_list(
                session.session_ticket()?,
                session.pass_ticket.as_deref().unwrap_or_default(),
                session.skey.as_deref().unwrap_or_default(),
            )
        };

        let body = self
            .http
            .post_json(&url, &json!({}))
            .await
            .ok_or_else(|| {
                ClientError::new(
                    ErrorCategory::Network,
                    "contact_list_failed",
                    "bulk contact list request failed",
                )
            })?;
        let response: wire::ContactListResponse = extract::decode_payload(&body);
        if !response.base_response.ok() {
            return Err(ClientError::new(
                ErrorCategory::Network,
                "contact_list_failed",
                format!("contact list rejected: ret={}", response.base_response.ret),
            ));
        }

        {
            let mut directory = self.directory.write().await;
            for contact in &response.member_list {
                if !directory.upsert(
                    &contact.user_name,
                    &contact.nick_name,
                    contact.verify_flag,
                    HashMap::new(),
                ) {
                    warn!("dropped a directory record with an empty identifier");
                }
            }
        }

        let group_ids = self.directory.read().await.group_ids();
        for chunk in group_ids.chunks(BATCH_SIZE) {
            let details = self.batch_fetch(chunk).await;
            self.apply_batch(details).await;
        }

        let directory = self.directory.read().await;
        info!(
            contacts = directory.len(),
            groups = group_ids.len(),
            "directory refreshed"
        );
        Ok(())
    }

    /// Make sure one contact is present, fetching its detail record if the
    /// directory has never seen it. Refresh-known contacts are never
    /// re-fetched.
    pub(crate) async fn resolve_contact(&self, user_name: &str) {
        if self.directory.read().await.contains(user_name) {
            return;
        }
        debug!(user_name, "fetching detail for an unknown contact");
        let details = self.batch_fetch(&[user_name.to_owned()]).await;
        self.apply_batch(details).await;
    }

    /// Batch detail fetch. Empty on any failure; callers treat missing detail
    /// as an unresolved (but still deliverable) contact.
    pub(crate) async fn batch_fetch(&self, user_names: &[String]) -> Vec<wire::ContactPayload> {
        if user_names.is_empty() {
            return Vec::new();
        }

        let (url, payload) = {
            let session = self.session.read().await;
            let Ok(ticket) = session.session_ticket() else {
                return Vec::new();
            };
            let Ok(base_request) = session.base_request() else {
                return Vec::new();
            };
            let list: Vec<_> = user_names
                .iter()
                .map(|name| json!({ "UserName": name, "EncryChatRoomId": "" }))
                .collect();
            (
                urls::batch_contacts(
                    ticket,
                    session.pass_ticket.as_deref().unwrap_or_default(),
                ),
                json!({
                    "BaseRequest": base_request,
                    "Count": list.len(),
                    "List": list,
                }),
            )
        };

        let Some(body) = self.http.post_json(&url, &payload).await else {
            return Vec::new();
        };
        let response: wire::BatchContactResponse = extract::decode_payload(&body);
        if !response.base_response.ok() {
            debug!(
                ret = response.base_response.ret,
                "batch contact fetch rejected"
            );
            return Vec::new();
        }
        response.contact_list
    }

    /// Write batch detail records into the directory, member rosters included.
    pub(crate) async fn apply_batch(&self, details: Vec<wire::ContactPayload>) {
        if details.is_empty() {
            return;
        }

        let mut directory = self.directory.write().await;
        for detail in details {
            let members: HashMap<String, GroupMember> = detail
                .member_list
                .iter()
                .map(|member| {
                    (
                        member.user_name.clone(),
                        GroupMember {
                            user_name: member.user_name.clone(),
                            nick_name: member.nick_name.clone(),
                        },
                    )
                })
                .collect();
            if !directory.upsert(
                &detail.user_name,
                &detail.nick_name,
                detail.verify_flag,
                members,
            ) {
                warn!("dropped a detail record with an empty identifier");
            }
        }
    }
}
