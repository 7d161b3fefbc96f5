//! Raw-event resolution against the directory.
//!
//! Turns sync events into normalized messages: sender display names looked
//! up (lazily fetching unknown senders once), group-routed content split into
//! the real member sender and the body, arrival order preserved.

use tracing::debug;
use webwx_core::{
    direct_message, group_message, is_group_id, split_group_content, NormalizedMessage,
};

use crate::{wire::RawEvent, WxClient};

impl WxClient {
    /// Resolve a batch of raw events in arrival order. Events without a
    /// sender identifier are dropped; everything else is delivered even when
    /// name resolution comes up empty.
    pub async fn resolve_messages(&self, events: &[RawEvent]) -> Vec<NormalizedMessage> {
        let mut resolved = Vec::with_capacity(events.len());
        for event in events {
            if event.from_user_name.is_empty() {
                debug!("dropped an event without a sender identifier");
                continue;
            }
            resolved.push(self.resolve_one(event).await);
        }
        resolved
    }

    async fn resolve_one(&self, event: &RawEvent) -> NormalizedMessage {
        let sender_id = event.from_user_name.as_str();
        self.resolve_contact(sender_id).await;

        if is_group_id(sender_id) {
            return self.resolve_group_event(sender_id, &event.content).await;
        }

        let sender_name = self
            .directory
            .read()
            .await
            .display_name(sender_id)
            .unwrap_or_default()
            .to_owned();
        direct_message(sender_id, sender_name, event.content.clone())
    }

    async fn resolve_group_event(&self, group_id: &str, content: &str) -> NormalizedMessage {
        let directory = self.directory.read().await;
        let group_name = directory.display_name(group_id).unwrap_or_default().to_owned();

        match split_group_content(content) {
            Some((member_id, body)) => {
                let member_name = directory
                    .member_display_name(group_id, member_id)
                    .unwrap_or_default()
                    .to_owned();
                group_message(member_id, member_name, body, group_id, group_name)
            }
            // System notices and odd payloads keep the group itself as the
            // sender and the content whole.
            None => group_message(group_id, group_name.clone(), content, group_id, group_name),
        }
    }
}
