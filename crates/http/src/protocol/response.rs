//! Write-once response handling.
//!
//! Every routed request gets exactly one [`ResponseHandle`]. Whoever writes first wins:
//! the handle records that a response was sent, and later writes fail with
//! [`SendError::AlreadySent`]. The dispatcher in the web layer reads the same flag to
//! avoid answering a request twice.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode};
use mime::Mime;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::protocol::SendError;

/// A cloneable handle to the response slot of one request.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    response: Option<Response<Bytes>>,
    sent: bool,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a complete response.
    pub async fn send(&self, response: Response<Bytes>) -> Result<(), SendError> {
        let mut slot = self.slot.lock().await;
        if slot.sent {
            return Err(SendError::AlreadySent);
        }
        slot.response = Some(response);
        slot.sent = true;
        Ok(())
    }

    /// Serializes `value` as JSON and writes it with the given status.
    pub async fn json<T: Serialize + ?Sized>(&self, status: StatusCode, value: &T) -> Result<(), SendError> {
        let body = serde_json::to_vec(value).map_err(SendError::invalid_body)?;
        self.send_bytes(status, &mime::APPLICATION_JSON, body).await
    }

    /// Writes a plain text body.
    pub async fn text(&self, status: StatusCode, body: impl Into<String>) -> Result<(), SendError> {
        self.send_bytes(status, &mime::TEXT_PLAIN_UTF_8, body.into()).await
    }

    /// Writes raw bytes with an explicit content type, the way a file transfer would.
    pub async fn send_bytes(
        &self,
        status: StatusCode,
        content_type: &Mime,
        body: impl Into<Bytes>,
    ) -> Result<(), SendError> {
        let content_type = HeaderValue::from_str(content_type.as_ref()).map_err(SendError::invalid_body)?;
        let response =
            Response::builder().status(status).header(http::header::CONTENT_TYPE, content_type).body(body.into())?;
        self.send(response).await
    }

    /// Returns true once any write succeeded.
    pub async fn is_sent(&self) -> bool {
        self.slot.lock().await.sent
    }

    /// Takes the written response out of the slot, leaving the sent flag untouched.
    pub async fn take(&self) -> Option<Response<Bytes>> {
        self.slot.lock().await.response.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_write_is_rejected() {
        let handle = ResponseHandle::new();
        assert!(!handle.is_sent().await);

        handle.text(StatusCode::OK, "first").await.unwrap();
        assert!(handle.is_sent().await);

        let second = handle.text(StatusCode::OK, "second").await;
        assert!(matches!(second, Err(SendError::AlreadySent)));

        let response = handle.take().await.unwrap();
        assert_eq!(response.body().as_ref(), b"first");
    }

    #[tokio::test]
    async fn test_json_sets_content_type() {
        let handle = ResponseHandle::new();
        handle.json(StatusCode::CREATED, &serde_json::json!({"id": 1})).await.unwrap();

        let response = handle.take().await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "application/json");
        assert_eq!(response.body().as_ref(), br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let handle = ResponseHandle::new();
        let clone = handle.clone();
        clone.send_bytes(StatusCode::OK, &mime::APPLICATION_OCTET_STREAM, vec![1u8, 2, 3]).await.unwrap();

        assert!(handle.is_sent().await);
        assert!(handle.take().await.is_some());
        // taking does not reset the flag
        assert!(handle.is_sent().await);
    }
}
