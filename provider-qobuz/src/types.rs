//! Qobuz API types
//!
//! Catalog records stay untyped (`serde_json::Value`) at the boundary and are
//! mapped by the normalizer. Only the few payloads the provider itself relies
//! on get a typed form here.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Query parameters, sorted by key
pub type Params = BTreeMap<String, String>;

/// Build [`Params`] from `(key, value)` pairs
pub fn params<K, V, I>(pairs: I) -> Params
where
    K: Into<String>,
    V: Into<String>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// File formats probed for a stream URL, best first:
/// 27 = FLAC up to 192kHz, 7 = FLAC up to 96kHz, 6 = FLAC 16bit, 5 = MP3 320
pub const STREAM_FORMAT_IDS: [u32; 4] = [27, 7, 6, 5];

/// Format code of the lossy AAC/MP3 tier
pub const LOSSY_FORMAT_ID: u64 = 5;

/// Read an identifier that the API sends either as a string or a number.
///
/// Empty strings and any other JSON type yield `None`.
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Authenticated session returned by `user/login`
///
/// Device, credential and user ids are kept in their raw JSON form because
/// telemetry records must echo them back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_auth_token: String,
    pub user_id: Value,
    pub display_name: String,
    pub device_id: Value,
    pub credential_id: Value,
}

impl Session {
    /// Build a session from a login response; `None` when it carries no token
    pub fn from_login(payload: &Value) -> Option<Self> {
        let token = payload
            .get("user_auth_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())?;
        let user = payload.get("user").cloned().unwrap_or(Value::Null);

        Some(Self {
            user_auth_token: token.to_string(),
            user_id: user.get("id").cloned().unwrap_or(Value::Null),
            display_name: user
                .get("display_name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            device_id: user
                .pointer("/device/id")
                .cloned()
                .unwrap_or(Value::Null),
            credential_id: user
                .pointer("/credential/id")
                .cloned()
                .unwrap_or(Value::Null),
        })
    }

    /// User id as a comparable string
    pub fn user_id(&self) -> Option<String> {
        id_string(&self.user_id)
    }
}

/// One entry of the `track/reportStreamingStart` body
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StreamingEventRecord {
    pub online: bool,
    pub sample: bool,
    pub intent: String,
    pub device_id: Value,
    pub track_id: String,
    pub purchase: bool,
    /// Unix seconds
    pub date: i64,
    /// Seconds played, only on the end event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub credential_id: Value,
    pub user_id: Value,
    pub local: bool,
    pub format_id: Value,
}
