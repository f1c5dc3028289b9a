//! Event client for the durable step SDK.
//!
//! Functions are triggered by events. [`Client`] sends events to the
//! orchestrator through an [`EventSender`] transport, which keeps HTTP and
//! retry policy outside of this crate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClientOptions;

/// An event sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event name, e.g. `"app/user.created"`
    pub name: String,

    /// Event data
    #[serde(default)]
    pub data: serde_json::Value,

    /// User the event relates to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user: Option<serde_json::Value>,

    /// Timestamp in milliseconds since the epoch; set by the orchestrator if absent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ts: Option<i64>,

    /// Event schema version
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub v: Option<String>,
}

impl EventPayload {
    /// Creates a new event.
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
            user: None,
            ts: None,
            v: None,
        }
    }

    /// Creates an unnamed event, for use with [`Client::send`].
    pub fn from_data(data: serde_json::Value) -> Self {
        Self::new("", data)
    }

    /// Sets the user.
    pub fn with_user(mut self, user: serde_json::Value) -> Self {
        self.user = Some(user);
        self
    }

    /// Sets the timestamp.
    pub fn with_ts(mut self, ts: i64) -> Self {
        self.ts = Some(ts);
        self
    }

    /// Sets the schema version.
    pub fn with_version(mut self, v: impl Into<String>) -> Self {
        self.v = Some(v.into());
        self
    }
}

/// A request to post events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    /// Target URL, including the event key
    pub url: String,
    /// Target environment header, if any
    pub env: Option<String>,
    /// Events to post as a JSON array
    pub payloads: Vec<EventPayload>,
}

/// The transport's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

/// Transport used to post events.
///
/// Implementations own HTTP, TLS and retry policy.
#[async_trait]
pub trait EventSender: Send + Sync {
    /// Posts a batch of events.
    async fn post(&self, request: EventRequest) -> Result<EventResponse, ClientError>;
}

/// Type alias for a shared EventSender.
pub type SharedEventSender = Arc<dyn EventSender>;

/// An error response from the orchestrator's event API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("API Error: {status} {message}")]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Human readable reason
    pub message: String,
}

impl ApiError {
    /// Maps a non-success status to an error, using `body` where the API
    /// returns details.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = match status {
            400 => "Cannot process event payload".to_string(),
            401 => "Event key Not Found".to_string(),
            403 => "Forbidden".to_string(),
            404 => "Event key not found".to_string(),
            406 => body.to_string(),
            409 | 412 => "Event transformation failed".to_string(),
            413 => "Event payload too large".to_string(),
            500 => "Internal server error".to_string(),
            _ => "Unknown error".to_string(),
        };
        Self { status, message }
    }
}

/// Errors returned when sending events.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No event key is configured.
    #[error("Failed to send event: no event key configured; set {} or call set_event_key", crate::config::EVENT_KEY_VAR)]
    MissingEventKey,

    /// An event had no name.
    #[error("Failed to send event: event at index {index} has no name")]
    MissingEventName {
        /// Position of the event in the batch
        index: usize,
    },

    /// The API rejected the request.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The transport failed before a response was received.
    #[error("Transport error: {message}")]
    Transport {
        /// Error message from the transport
        message: String,
    },
}

impl ClientError {
    /// Creates a new Transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// Sends events to the orchestrator.
///
/// # Example
///
/// ```rust,ignore
/// let client = Client::new(ClientOptions::from_env("My App")?, HttpSender::default());
/// client
///     .send("app/user.created", [EventPayload::from_data(json!({ "id": 123 }))])
///     .await?;
/// ```
#[derive(Clone)]
pub struct Client {
    options: ClientOptions,
    sender: SharedEventSender,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client posting through `sender`.
    pub fn new(options: ClientOptions, sender: impl EventSender + 'static) -> Self {
        Self::with_sender(options, Arc::new(sender))
    }

    /// Creates a client posting through a shared sender.
    pub fn with_sender(options: ClientOptions, sender: SharedEventSender) -> Self {
        if !options.has_event_key() {
            tracing::warn!(
                name = %options.name,
                "Could not find event key; sending events will fail until one is set"
            );
        }
        Self { options, sender }
    }

    /// Returns the client options.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sets the event key.
    pub fn set_event_key(&mut self, event_key: impl Into<String>) {
        self.options.event_key = Some(event_key.into());
    }

    /// Sends events named `name`, overwriting each payload's name.
    pub async fn send(
        &self,
        name: &str,
        payloads: impl IntoIterator<Item = EventPayload>,
    ) -> Result<(), ClientError> {
        let payloads = payloads
            .into_iter()
            .map(|mut payload| {
                payload.name = name.to_string();
                payload
            })
            .collect();
        self.send_events(payloads).await
    }

    /// Sends complete event payloads.
    ///
    /// Sending no events is not an error; a warning is logged and the
    /// transport is not called.
    pub async fn send_events(&self, payloads: Vec<EventPayload>) -> Result<(), ClientError> {
        let url = self.options.event_url().ok_or(ClientError::MissingEventKey)?;

        if payloads.is_empty() {
            tracing::warn!("send called with no events; nothing was sent");
            return Ok(());
        }

        if let Some(index) = payloads.iter().position(|p| p.name.trim().is_empty()) {
            return Err(ClientError::MissingEventName { index });
        }

        let count = payloads.len();
        let response = self
            .sender
            .post(EventRequest {
                url,
                env: self.options.env.clone(),
                payloads,
            })
            .await?;

        if (200..300).contains(&response.status) {
            tracing::debug!(count = count, "Sent events");
            return Ok(());
        }

        let error = ApiError::from_status(response.status, &response.body);
        tracing::debug!(status = response.status, error = %error, "Event API rejected request");
        Err(error.into())
    }
}

/// A mock implementation of EventSender for testing.
#[cfg(test)]
pub struct MockEventSender {
    responses: std::sync::Mutex<Vec<Result<EventResponse, ClientError>>>,
    requests: std::sync::Mutex<Vec<EventRequest>>,
}

#[cfg(test)]
impl MockEventSender {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(Vec::new()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: Result<EventResponse, ClientError>) -> Self {
        self.responses.lock().unwrap().push(response);
        self
    }

    pub fn requests(&self) -> Vec<EventRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl EventSender for MockEventSender {
    async fn post(&self, request: EventRequest) -> Result<EventResponse, ClientError> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(EventResponse {
                status: 200,
                body: String::new(),
            })
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options() -> ClientOptions {
        ClientOptions::new("test-app")
            .unwrap()
            .with_event_key("key-1")
            .with_env("preview")
    }

    fn client(sender: Arc<MockEventSender>) -> Client {
        Client::with_sender(options(), sender)
    }

    #[test]
    fn test_event_payload_serialization() {
        let payload = EventPayload::new("app/user.created", json!({ "id": 123 }));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, json!({ "name": "app/user.created", "data": { "id": 123 } }));

        let payload = payload.with_ts(1_700_000_000_000).with_version("2024-01-01.1");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["ts"], json!(1_700_000_000_000i64));
        assert_eq!(json["v"], json!("2024-01-01.1"));
    }

    #[test]
    fn test_api_error_messages() {
        let cases = [
            (400, "Cannot process event payload"),
            (401, "Event key Not Found"),
            (403, "Forbidden"),
            (404, "Event key not found"),
            (409, "Event transformation failed"),
            (412, "Event transformation failed"),
            (413, "Event payload too large"),
            (500, "Internal server error"),
            (418, "Unknown error"),
        ];
        for (status, message) in cases {
            assert_eq!(ApiError::from_status(status, "").message, message);
        }

        let error = ApiError::from_status(406, r#"{"error":"bad"}"#);
        assert_eq!(error.message, r#"{"error":"bad"}"#);
        assert_eq!(error.to_string(), r#"API Error: 406 {"error":"bad"}"#);
    }

    #[tokio::test]
    async fn test_send_stamps_name() {
        let sender = Arc::new(MockEventSender::new());
        let client = client(sender.clone());

        client
            .send(
                "app/user.created",
                [
                    EventPayload::from_data(json!({ "id": 1 })),
                    EventPayload::new("ignored", json!({ "id": 2 })),
                ],
            )
            .await
            .unwrap();

        let requests = sender.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://inn.gs/e/key-1");
        assert_eq!(requests[0].env.as_deref(), Some("preview"));
        assert!(requests[0]
            .payloads
            .iter()
            .all(|p| p.name == "app/user.created"));
    }

    #[tokio::test]
    async fn test_send_without_event_key_fails() {
        let sender = Arc::new(MockEventSender::new());
        let client = Client::with_sender(ClientOptions::new("test-app").unwrap(), sender.clone());

        let result = client
            .send_events(vec![EventPayload::new("app/event", json!({}))])
            .await;

        assert!(matches!(result, Err(ClientError::MissingEventKey)));
        assert!(sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_set_event_key() {
        let sender = Arc::new(MockEventSender::new());
        let mut client = Client::with_sender(ClientOptions::new("test-app").unwrap(), sender);
        client.set_event_key("late-key");
        client
            .send_events(vec![EventPayload::new("app/event", json!({}))])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_no_events_skips_transport() {
        let sender = Arc::new(MockEventSender::new());
        let client = client(sender.clone());

        client.send_events(Vec::new()).await.unwrap();

        assert!(sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unnamed_event_is_rejected() {
        let sender = Arc::new(MockEventSender::new());
        let client = client(sender.clone());

        let result = client
            .send_events(vec![
                EventPayload::new("app/event", json!({})),
                EventPayload::from_data(json!({})),
            ])
            .await;

        assert!(matches!(result, Err(ClientError::MissingEventName { index: 1 })));
        assert!(sender.requests().is_empty());
    }

    #[tokio::test]
    async fn test_api_rejection_is_mapped() {
        let sender = Arc::new(MockEventSender::new().with_response(Ok(EventResponse {
            status: 413,
            body: String::new(),
        })));
        let client = client(sender);

        let result = client
            .send_events(vec![EventPayload::new("app/event", json!({}))])
            .await;

        match result {
            Err(ClientError::Api(error)) => {
                assert_eq!(error.status, 413);
                assert_eq!(error.message, "Event payload too large");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let sender = Arc::new(
            MockEventSender::new().with_response(Err(ClientError::transport("connection reset"))),
        );
        let client = client(sender);

        let result = client
            .send_events(vec![EventPayload::new("app/event", json!({}))])
            .await;

        assert!(matches!(result, Err(ClientError::Transport { .. })));
    }
}
