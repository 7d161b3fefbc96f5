//! Pure helpers for turning raw events into normalized messages.

use crate::types::{GroupProvenance, NormalizedMessage};

/// Literal delimiter between the member identifier and the body inside
/// group-routed content.
pub const GROUP_CONTENT_DELIMITER: &str = ":<br/>";

/// Split group-routed content into `(member identifier, body)`.
///
/// Returns `None` when the content does not carry the delimiter or the left
/// side is not a member identifier, in which case the caller keeps the
/// content whole.
pub fn split_group_content(content: &str) -> Option<(&str, &str)> {
    let (member_id, body) = content.split_once(GROUP_CONTENT_DELIMITER)?;
    if !member_id.starts_with('@') || member_id.starts_with("@@") {
        return None;
    }
    Some((member_id, body))
}

/// Assemble a direct (non-group) normalized message.
pub fn direct_message(
    sender_id: impl Into<String>,
    sender_name: impl Into<String>,
    content: impl Into<String>,
) -> NormalizedMessage {
    NormalizedMessage {
        sender_id: sender_id.into(),
        sender_name: sender_name.into(),
        content: content.into(),
        group: None,
    }
}

/// Assemble a group-routed normalized message.
pub fn group_message(
    sender_id: impl Into<String>,
    sender_name: impl Into<String>,
    content: impl Into<String>,
    group_id: impl Into<String>,
    group_name: impl Into<String>,
) -> NormalizedMessage {
    NormalizedMessage {
        sender_id: sender_id.into(),
        sender_name: sender_name.into(),
        content: content.into(),
        group: Some(GroupProvenance {
            group_id: group_id.into(),
            group_name: group_name.into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_member_and_body_on_literal_delimiter() {
        let (member, body) =
            split_group_content("@memberX:<br/>hello").expect("content should split");
        assert_eq!(member, "@memberX");
        assert_eq!(body, "hello");
    }

    #[test]
    fn keeps_delimiter_occurrences_inside_body() {
        let (member, body) =
            split_group_content("@m:<br/>a:<br/>b").expect("content should split");
        assert_eq!(member, "@m");
        assert_eq!(body, "a:<br/>b");
    }

    #[test]
    fn rejects_content_without_member_prefix() {
        assert_eq!(split_group_content("no delimiter here"), None);
        assert_eq!(split_group_content("plain:<br/>body"), None);
        assert_eq!(split_group_content("@@group:<br/>body"), None);
    }

    #[test]
    fn group_message_carries_provenance() {
        let msg = group_message("@memberX", "Xavier", "hello", "@@groupA", "Team");
        let group = msg.group.expect("group provenance must be present");
        assert_eq!(group.group_id, "@@groupA");
        assert_eq!(group.group_name, "Team");
        assert_eq!(msg.sender_id, "@memberX");
    }
}
