use serde::{Deserialize, Serialize};
use std::fmt;

/// Error payload Twilio returns with any non-200 status.
///
/// See <https://www.twilio.com/docs/usage/twilios-response#response-formats-exceptions>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Exception {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub more_info: Option<String>,
}

const MAX_BODY_LEN: usize = 200;

impl Exception {
    /// Decode an exception body. Bodies that are not Twilio JSON (proxy HTML,
    /// empty responses) still yield an exception carrying the HTTP status.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<Exception>(body) {
            Ok(mut exception) => {
                if exception.status == 0 {
                    exception.status = status;
                }
                exception
            }
            Err(_) => Exception {
                status,
                code: None,
                message: truncate(body.trim()),
                more_info: None,
            },
        }
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_BODY_LEN {
        return body.to_string();
    }
    let mut end = MAX_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "status {} (code {}): {}", self.status, code, self.message),
            None => write!(f, "status {}: {}", self.status, self.message),
        }
    }
}
