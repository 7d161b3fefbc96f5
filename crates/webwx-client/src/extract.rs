//! Response extractor: the only module allowed to touch raw upstream text.
//!
//! The upstream service answers with script fragments, markup, and loosely
//! shaped JSON, none of it under a schema. Every helper here returns an empty
//! or default value on malformed input; malformed content is the expected
//! steady state for this service and must never abort a caller.

use std::collections::HashMap;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

/// Run a named-capture pattern over text.
///
/// Returns every named group that matched; an empty map when the pattern does
/// not match, does not compile, or the input is empty.
pub fn capture(pattern: &str, text: &str) -> HashMap<String, String> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => {
            debug!(pattern, %err, "invalid extraction pattern");
            return HashMap::new();
        }
    };

    let Some(captures) = regex.captures(text) else {
        return HashMap::new();
    };

    regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|m| (name.to_owned(), m.as_str().to_owned()))
        })
        .collect()
}

/// Extract one named capture, or `None`.
pub fn capture_one(pattern: &str, text: &str, name: &str) -> Option<String> {
    capture(pattern, text).remove(name)
}

/// Text content of the first `<tag>…</tag>` element in a small markup body.
///
/// The credential redirect returns a flat element tree whose children may
/// arrive in any order or be absent; per-tag extraction tolerates both.
pub fn tag_text(tag: &str, body: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    let value = body[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Decode a JSON body, yielding an explicit failure marker instead of raising.
///
/// On parse failure the result carries `BaseResponse.Ret = -1004` so callers
/// that branch on the embedded status see a non-success response.
pub fn decode_json(body: &str) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(err) => json!({
            "Data": body,
            "BaseResponse": {
                "Ret": -1004,
                "ErrMsg": format!("json decode error: {err}"),
            },
        }),
    }
}

/// Decode a JSON body into a typed wire record.
///
/// Falls back to the record's default shape (whose embedded status reads as
/// non-success) when the body does not parse.
pub fn decode_payload<T>(body: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match serde_json::from_str::<T>(body) {
        Ok(decoded) => decoded,
        Err(err) => {
            debug!(%err, "undecodable response body");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::SyncResponse;

    const QR_PATTERN: &str =
        r#"window.QRLogin.code = (?P<code>\d+); window.QRLogin.uuid = "(?P<uuid>[^"]+)";"#;

    #[test]
    fn captures_named_groups() {
        let body = r#"window.QRLogin.code = 200; window.QRLogin.uuid = "4aZselFQjg==";"#;
        let fields = capture(QR_PATTERN, body);
        assert_eq!(fields.get("code").map(String::as_str), Some("200"));
        assert_eq!(fields.get("uuid").map(String::as_str), Some("4aZselFQjg=="));
    }

    #[test]
    fn empty_map_for_malformed_or_empty_input() {
        assert!(capture(QR_PATTERN, "").is_empty());
        assert!(capture(QR_PATTERN, "<html>502 Bad Gateway</html>").is_empty());
        assert!(capture(r"(?P<broken", "anything").is_empty());
    }

    #[test]
    fn tag_text_tolerates_order_and_absence() {
        let body = "<error><wxsid>SID</wxsid><skey>@crypt_key</skey><wxuin>123</wxuin></error>";
        assert_eq!(tag_text("skey", body).as_deref(), Some("@crypt_key"));
        assert_eq!(tag_text("wxsid", body).as_deref(), Some("SID"));
        assert_eq!(tag_text("wxuin", body).as_deref(), Some("123"));
        assert_eq!(tag_text("pass_ticket", body), None);
        assert_eq!(tag_text("skey", "<error></error>"), None);
    }

    #[test]
    fn json_failures_surface_the_marker_ret() {
        let value = decode_json("not json at all {{");
        assert_eq!(value["BaseResponse"]["Ret"], -1004);

        let ok = decode_json(r#"{"BaseResponse":{"Ret":0}}"#);
        assert_eq!(ok["BaseResponse"]["Ret"], 0);
    }

    #[test]
    fn typed_decode_defaults_to_non_success() {
        let decoded: SyncResponse = decode_payload("<!doctype html>");
        assert!(!decoded.base_response.ok());
        assert!(decoded.add_msg_list.is_empty());
    }
}
