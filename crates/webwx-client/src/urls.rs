//! Endpoint builders and the static backend host table.
//!
//! All endpoint shapes are externally imposed; nothing here is negotiable
//! with the upstream service.

use std::time::{SystemTime, UNIX_EPOCH};

/// Public login root used when no override is configured.
pub const LOGIN_ROOT: &str = "https://login.weixin.qq.com";

/// Fixed application id sent with QR issuance.
pub const APP_ID: &str = "wx782c26e4c19acffb";

/// Browser user-agent; the service rejects obviously non-browser clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/54.0.2840.71 Safari/537.36";

/// Known redirect-host substrings mapped to (file, sync) backend hosts.
const HOST_TABLE: &[(&str, &str, &str)] = &[
    ("wx2.qq.com", "file.wx2.qq.com", "webpush.wx2.qq.com"),
    ("wx8.qq.com", "file.wx8.qq.com", "webpush.wx8.qq.com"),
    ("qq.com", "file.wx.qq.com", "webpush.wx.qq.com"),
    (
        "web2.wechat.com",
        "file.web2.wechat.com",
        "webpush.web2.wechat.com",
    ),
    ("wechat.com", "file.web.wechat.com", "webpush.web.wechat.com"),
];

/// Select (file, sync) backend base URLs for a session ticket.
///
/// Unknown hosts fall back to the ticket itself for both: degraded but
/// functional.
pub fn select_backend(session_ticket: &str) -> (String, String) {
    for (needle, file_host, sync_host) in HOST_TABLE {
        if session_ticket.contains(needle) {
            return (
                format!("https://{file_host}/cgi-bin/mmwebwx-bin"),
                format!("https://{sync_host}/cgi-bin/mmwebwx-bin"),
            );
        }
    }
    (session_ticket.to_owned(), session_ticket.to_owned())
}

/// Seconds since the epoch, used as the service's cache-buster.
pub fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Milliseconds since the epoch.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn qr_issue(login_root: &str) -> String {
    format!("{login_root}/jslogin?appid={APP_ID}&fun=new")
}

/// Canonical QR payload: what the user's device actually scans.
pub fn qr_payload(login_root: &str, login_id: &str) -> String {
    format!("{login_root}/l/{login_id}")
}

pub fn login_poll(login_root: &str, login_id: &str) -> String {
    let now = timestamp_secs();
    format!(
        "{login_root}/cgi-bin/mmwebwx-bin/login?loginicon=true&uuid={login_id}&tip=0&r={}&_={now}",
        now / 1579
    )
}

pub fn push_login(session_ticket: &str, uin: &str) -> String {
    format!("{session_ticket}/webwxpushloginurl?uin={uin}")
}

pub fn web_init(session_ticket: &str) -> String {
    format!("{session_ticket}/webwxinit?r={}", timestamp_secs())
}

pub fn status_notify(session_ticket: &str, pass_ticket: &str) -> String {
    format!("{session_ticket}/webwxstatusnotify?lang=zh_CN&pass_ticket={pass_ticket}")
}

pub fn contact_list(session_ticket: &str, pass_ticket: &str, skey: &str) -> String {
    format!(
        "{session_ticket}/webwxgetcontact?pass_ticket={pass_ticket}&skey={skey}&r={}",
        timestamp_secs()
    )
}

pub fn batch_contacts(session_ticket: &str, pass_ticket: &str) -> String {
    format!(
        "{session_ticket}/webwxbatchgetcontact?type=ex&pass_ticket={pass_ticket}&r={}",
        timestamp_secs()
    )
}

pub fn sync_check(sync_endpoint: &str) -> String {
    format!("{sync_endpoint}/synccheck")
}

pub fn full_sync(session_ticket: &str, sid: &str, skey: &str, pass_ticket: &str) -> String {
    format!("{session_ticket}/webwxsync?sid={sid}&skey={skey}&pass_ticket={pass_ticket}")
}

pub fn send_msg(session_ticket: &str, pass_ticket: &str) -> String {
    format!("{session_ticket}/webwxsendmsg?pass_ticket={pass_ticket}")
}

pub fn logout(session_ticket: &str, skey: &str) -> String {
    format!("{session_ticket}/webwxlogout?redirect=1&type=1&skey={skey}")
}
