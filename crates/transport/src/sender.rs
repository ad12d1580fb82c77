//! Batch senders - one network call per batch

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use contracts::{HttpConfig, Outcome, SinkError};

/// Delivers one batch and reports the collector's answer
///
/// Implementations make exactly one delivery attempt per call; retries
/// belong to a wrapping layer such as `RetryingSender`.
#[trait_variant::make(BatchSender: Send)]
pub trait LocalBatchSender {
    /// Send a non-empty, ordered batch
    ///
    /// # Errors
    /// `NetworkFailure` when the collector cannot be reached,
    /// `BodyReadFailure` when the response body cannot be read.
    async fn send_batch(&self, batch: &[Bytes]) -> Result<Outcome, SinkError>;
}

/// JSON envelope wrapping raw records: `{"<key>": [r1,r2,...]}`
#[derive(Debug, Clone)]
pub struct Envelope {
    prefix: String,
}

impl Envelope {
    /// Envelope around a list named `key`
    pub fn new(key: &str) -> Self {
        // Value's Display quotes and escapes the key.
        let key = serde_json::Value::from(key);
        Self {
            prefix: format!("{{{key}: ["),
        }
    }

    /// Join records with `,` inside the envelope, bytes untouched
    pub fn encode(&self, batch: &[Bytes]) -> Vec<u8> {
        let payload: usize = batch.iter().map(Bytes::len).sum();
        let mut body = Vec::with_capacity(self.prefix.len() + payload + batch.len() + 2);
        body.extend_from_slice(self.prefix.as_bytes());
        for (i, record) in batch.iter().enumerate() {
            if i > 0 {
                body.push(b',');
            }
            body.extend_from_slice(record);
        }
        body.extend_from_slice(b"]}");
        body
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new("gauges")
    }
}

/// Status line as `<code> <reason>`, or the bare code when the reason is unknown
///
/// The reason is the canonical phrase for the code, not the text the
/// collector sent: `200 Okay` on the wire is reported as `200 OK`, and an
/// unregistered code such as `599` is reported bare. Readers that need the
/// exact status should go by the numeric code.
pub fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Sender that POSTs each batch to a collector URL
#[derive(Debug, Clone)]
pub struct HttpSender {
    url: Url,
    client: Client,
    envelope: Envelope,
}

impl HttpSender {
    /// Create a sender with its own HTTP client
    ///
    /// The client is built without compression support, so requests and
    /// responses travel uncompressed.
    pub fn new(url: Url, config: &HttpConfig) -> Result<Self, SinkError> {
        let client = build_client(config.request_timeout())?;
        Ok(Self {
            url,
            client,
            envelope: Envelope::new(&config.envelope_key),
        })
    }

    /// Collector URL
    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn build_client(timeout: Duration) -> Result<Client, SinkError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SinkError::Client(e.to_string()))
}

impl BatchSender for HttpSender {
    #[instrument(
        name = "http_sender_send",
        skip(self, batch),
        fields(url = %self.url, records = batch.len())
    )]
    async fn send_batch(&self, batch: &[Bytes]) -> Result<Outcome, SinkError> {
        let body = self.envelope.encode(batch);
        debug!(bytes = body.len(), "Posting batch");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::network(self.url.as_str(), e.to_string()))?;

        let status = status_line(response.status());
        let payload = response
            .bytes()
            .await
            .map_err(|e| SinkError::body_read(self.url.as_str(), e.to_string()))?;

        debug!(status = %status, bytes = payload.len(), "Batch delivered");
        Ok(Outcome::new(status, payload))
    }
}
