//! Record and Outcome - the two payloads that cross an endpoint

use bytes::Bytes;
use std::fmt;

/// One already-serialized metric sample.
///
/// Opaque to the transports; for the HTTP collector it is expected to be a
/// JSON gauge object.
pub type Record = Bytes;

/// Result of delivering one batch to a remote collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Status line, e.g. `200 OK`
    pub status: String,
    /// Response body, exactly as received
    pub body: Bytes,
}

impl Outcome {
    /// Create a new outcome
    pub fn new(status: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status: status.into(),
            body: body.into(),
        }
    }

    /// Numeric status code, if the status line starts with one
    pub fn status_code(&self) -> Option<u16> {
        self.status.split_whitespace().next()?.parse().ok()
    }

    /// Status class label (`2xx` .. `5xx`, or `other`)
    pub fn status_class(&self) -> &'static str {
        match self.status_code() {
            Some(200..=299) => "2xx",
            Some(300..=399) => "3xx",
            Some(400..=499) => "4xx",
            Some(500..=599) => "5xx",
            _ => "other",
        }
    }

    /// Payload handed to readers: `"<status>\n<body>"`, body bytes untouched
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.status.len() + 1 + self.body.len());
        payload.extend_from_slice(self.status.as_bytes());
        payload.push(b'\n');
        payload.extend_from_slice(&self.body);
        payload
    }

    /// Body decoded for display; invalid UTF-8 is replaced
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.status, String::from_utf8_lossy(&self.body))
    }
}
