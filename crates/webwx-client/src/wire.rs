//! Typed views over upstream JSON payloads.
//!
//! Every field is optional-or-defaulted: the upstream contract is versionless
//! and any field may be missing. A record decoded from garbage reads as a
//! non-success response (`Ret = -1`), never as a crash.

use serde::Deserialize;
use webwx_core::SyncKey;

/// Embedded status carried by most POST responses.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BaseResponse {
    #[serde(rename = "Ret", default = "default_ret")]
    pub ret: i64,
    #[serde(rename = "ErrMsg", default)]
    pub err_msg: String,
}

impl BaseResponse {
    pub fn ok(&self) -> bool {
        self.ret == 0
    }
}

impl Default for BaseResponse {
    fn default() -> Self {
        Self {
            ret: -1,
            err_msg: String::new(),
        }
    }
}

fn default_ret() -> i64 {
    -1
}

/// One contact record as listed by the contact endpoints. Group detail
/// responses nest further records under `MemberList`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPayload {
    #[serde(rename = "UserName", default)]
    pub user_name: String,
    #[serde(rename = "NickName", default)]
    pub nick_name: String,
    #[serde(rename = "VerifyFlag", default)]
    pub verify_flag: i64,
    #[serde(rename = "MemberList", default)]
    pub member_list: Vec<ContactPayload>,
}

/// `webwxinit` response: self identity plus the first sync cursor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitResponse {
    #[serde(rename = "BaseResponse", default)]
    pub base_response: BaseResponse,
    #[serde(rename = "User", default)]
    pub user: Option<ContactPayload>,
    #[serde(rename = "SyncKey", default)]
    pub sync_key: Option<SyncKey>,
}

/// `webwxgetcontact` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactListResponse {
    #[serde(rename = "BaseResponse", default)]
    pub base_response: BaseResponse,
    #[serde(rename = "MemberList", default)]
    pub member_list: Vec<ContactPayload>,
}

/// `webwxbatchgetcontact` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchContactResponse {
    #[serde(rename = "BaseResponse", default)]
    pub base_response: BaseResponse,
    #[serde(rename = "ContactList", default)]
    pub contact_list: Vec<ContactPayload>,
}

/// One raw event inside a full-sync response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "FromUserName", default)]
    pub from_user_name: String,
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: String,
    #[serde(rename = "Content", default)]
    pub content: String,
    #[serde(rename = "MsgType", default)]
    pub msg_type: i64,
}

/// `webwxsync` response: new events plus the next sync cursor.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncResponse {
    #[serde(rename = "BaseResponse", default)]
    pub base_response: BaseResponse,
    #[serde(rename = "AddMsgList", default)]
    pub add_msg_list: Vec<RawEvent>,
    #[serde(rename = "SyncCheckKey", default)]
    pub sync_check_key: Option<SyncKey>,
}

/// `webwxsendmsg` acknowledgment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendResponse {
    #[serde(rename = "BaseResponse", default)]
    pub base_response: BaseResponse,
}

/// `webwxpushloginurl` response. Unlike the POST surface this one uses
/// lowercase keys and a stringly-typed return code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushLoginResponse {
    #[serde(default)]
    pub ret: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub uuid: String,
}

impl PushLoginResponse {
    pub fn ok(&self) -> bool {
        self.ret == "0" && !self.uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_base_response_reads_as_non_success() {
        let decoded: SyncResponse = serde_json::from_str("{}").expect("empty object must decode");
        assert!(!decoded.base_response.ok());
    }

    #[test]
    fn decodes_upstream_field_names() {
        let body = r#"{
            "BaseResponse": {"Ret": 0, "ErrMsg": ""},
            "AddMsgList": [{"FromUserName": "@friendY", "Content": "hi", "MsgType": 1}],
            "SyncCheckKey": {"Count": 1, "List": [{"Key": 1, "Val": 657703788}]}
        }"#;
        let decoded: SyncResponse = serde_json::from_str(body).expect("body must decode");
        assert!(decoded.base_response.ok());
        assert_eq!(decoded.add_msg_list[0].from_user_name, "@friendY");
        assert_eq!(
            decoded
                .sync_check_key
                .expect("cursor must decode")
                .encode(),
            "1_657703788"
        );
    }

    #[test]
    fn push_login_requires_zero_ret_and_uuid() {
        let ok: PushLoginResponse =
            serde_json::from_str(r#"{"ret":"0","msg":"all ok","uuid":"xyz=="}"#)
                .expect("must decode");
        assert!(ok.ok());

        let rejected: PushLoginResponse =
            serde_json::from_str(r#"{"ret":"1203","msg":"refused"}"#).expect("must decode");
        assert!(!rejected.ok());
    }
}
