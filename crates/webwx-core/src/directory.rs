//! Contact/group directory.
//!
//! Entries are written by bulk refreshes and lazy lookups, never deleted
//! within a session. Classification is recomputed on every write so a stale
//! class can never survive an update.

use std::collections::HashMap;

use crate::types::{Contact, ContactClass, GroupMember};

/// Verification-flag bit marking subscription/broadcast accounts.
const SUBSCRIPTION_FLAG: i64 = 8;

/// Identifier prefix of group chats.
pub const GROUP_SIGIL: &str = "@@";

/// Classify a contact from its current attributes.
///
/// Precedence: subscription flag, then `@@` group sigil, then `@` friend
/// sigil, then special account.
pub fn classify(verify_flag: i64, user_name: &str) -> ContactClass {
    if verify_flag & SUBSCRIPTION_FLAG != 0 {
        ContactClass::Subscription
    } else if user_name.starts_with(GROUP_SIGIL) {
        ContactClass::Group
    } else if user_name.starts_with('@') {
        ContactClass::Friend
    } else {
        ContactClass::Special
    }
}

/// Whether an identifier denotes a group.
pub fn is_group_id(user_name: &str) -> bool {
    user_name.starts_with(GROUP_SIGIL)
}

/// In-memory directory keyed by contact identifier.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: HashMap<String, Contact>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one entry, restamping its class.
    ///
    /// Returns `false` (and inserts nothing) when the identifier is empty;
    /// the caller is expected to log the dropped record.
    pub fn upsert(
        &mut self,
        user_name: &str,
        nick_name: &str,
        verify_flag: i64,
        members: HashMap<String, GroupMember>,
    ) -> bool {
        if user_name.is_empty() {
            return false;
        }
        self.entries.insert(
            user_name.to_owned(),
            Contact {
                user_name: user_name.to_owned(),
                nick_name: nick_name.to_owned(),
                verify_flag,
                contact_class: classify(verify_flag, user_name),
                members,
            },
        );
        true
    }

    pub fn get(&self, user_name: &str) -> Option<&Contact> {
        self.entries.get(user_name)
    }

    pub fn contains(&self, user_name: &str) -> bool {
        self.entries.contains_key(user_name)
    }

    /// Display name lookup; `None` when the entry is unknown.
    pub fn display_name(&self, user_name: &str) -> Option<&str> {
        self.entries.get(user_name).map(|c| c.nick_name.as_str())
    }

    /// Member display name inside a group entry; `None` when either the
    /// group or the member is unknown.
    pub fn member_display_name(&self, group_id: &str, member_id: &str) -> Option<&str> {
        self.entries
            .get(group_id)
            .and_then(|group| group.members.get(member_id))
            .map(|member| member.nick_name.as_str())
    }

    /// Identifiers of all group-classified entries.
    pub fn group_ids(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|c| c.contact_class == ContactClass::Group)
            .map(|c| c.user_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_documented_precedence() {
        assert_eq!(classify(8, "@@group"), ContactClass::Subscription);
        assert_eq!(classify(24, "anything"), ContactClass::Subscription);
        assert_eq!(classify(0, "@@group"), ContactClass::Group);
        assert_eq!(classify(0, "@friend"), ContactClass::Friend);
        assert_eq!(classify(0, "filehelper"), ContactClass::Special);
    }

    #[test]
    fn classification_is_idempotent_and_sigil_sensitive() {
        assert_eq!(classify(0, "@x"), classify(0, "@x"));
        assert_ne!(classify(0, "@x"), classify(0, "@@x"));
    }

    #[test]
    fn upsert_restamps_class_every_write() {
        let mut directory = Directory::new();
        directory.upsert("@alice", "Alice", 0, HashMap::new());
        assert_eq!(
            directory.get("@alice").expect("entry must exist").contact_class,
            ContactClass::Friend
        );

        // The same identifier written with the subscription flag set must
        // come back reclassified, not carry the old stamp.
        directory.upsert("@alice", "Alice", 8, HashMap::new());
        assert_eq!(
            directory.get("@alice").expect("entry must exist").contact_class,
            ContactClass::Subscription
        );
    }

    #[test]
    fn drops_entries_without_identifier() {
        let mut directory = Directory::new();
        assert!(!directory.upsert("", "ghost", 0, HashMap::new()));
        assert!(directory.is_empty());
    }

    #[test]
    fn group_refresh_shrinks_member_map_without_deleting_entry() {
        let mut directory = Directory::new();
        let mut members = HashMap::new();
        members.insert(
            "@m1".to_owned(),
            GroupMember {
                user_name: "@m1".into(),
                nick_name: "One".into(),
            },
        );
        members.insert(
            "@m2".to_owned(),
            GroupMember {
                user_name: "@m2".into(),
                nick_name: "Two".into(),
            },
        );
        directory.upsert("@@team", "Team", 0, members);
        assert_eq!(
            directory.get("@@team").expect("group must exist").members.len(),
            2
        );

        let mut smaller = HashMap::new();
        smaller.insert(
            "@m1".to_owned(),
            GroupMember {
                user_name: "@m1".into(),
                nick_name: "One".into(),
            },
        );
        directory.upsert("@@team", "Team", 0, smaller);

        let group = directory.get("@@team").expect("group must survive refresh");
        assert_eq!(group.members.len(), 1);
        assert_eq!(directory.member_display_name("@@team", "@m1"), Some("One"));
        assert_eq!(directory.member_display_name("@@team", "@m2"), None);
    }

    #[test]
    fn group_ids_lists_only_groups() {
        let mut directory = Directory::new();
        directory.upsert("@friend", "F", 0, HashMap::new());
        directory.upsert("@@group", "G", 0, HashMap::new());

        assert_eq!(directory.group_ids(), vec!["@@group".to_owned()]);
    }
}
