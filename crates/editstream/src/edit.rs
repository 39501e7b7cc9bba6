use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiEdit {
    pub title: String,
    pub user: String,
    pub bot: bool,
    pub wiki: String,
    pub server_name: String,
    #[serde(rename = "type")]
    pub edit_kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

pub fn decode_edit(payload: &str) -> serde_json::Result<WikiEdit> {
    serde_json::from_str(payload)
}
