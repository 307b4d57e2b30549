//! HTTP transport for prediction and weather endpoints
//!
//! The dispatcher only sees the [`Transport`] trait; [`HttpTransport`] is the
//! reqwest-backed implementation used by the binary.

use crate::fields::FileInput;
use crate::request::{Endpoint, HttpMethod, MultipartPart, WirePayload};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("AgriSense/", env!("CARGO_PKG_VERSION"));

/// Any failure between sending a request and holding a decoded response
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// The request body could not be encoded locally; nothing was sent
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The service answered but reported a failure in its body
    #[error("Service error: {0}")]
    Service(String),
}

/// One network call per invocation; no retry, no queuing
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, endpoint: &Endpoint, payload: WirePayload) -> Result<Value, TransportError>;
}

/// reqwest-backed transport bound to one service base URL
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `timeout: None` keeps reqwest's default, which never times out
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn multipart_form(parts: Vec<MultipartPart>) -> Result<reqwest::multipart::Form, TransportError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part {
            MultipartPart::Text { name, value } => form.text(name, value),
            MultipartPart::File { name, file } => {
                let FileInput {
                    file_name,
                    content_type,
                    bytes,
                } = file;
                let part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name.clone())
                    .mime_str(&content_type)
                    .map_err(|e| TransportError::Encoding(format!("{}: {}", file_name, e)))?;
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &Endpoint, payload: WirePayload) -> Result<Value, TransportError> {
        let url = endpoint.url(&self.base_url);

        let request = match endpoint.method {
            HttpMethod::Get => self.http_client.get(&url),
            HttpMethod::Post => self.http_client.post(&url),
        };
        let request = match payload {
            WirePayload::Multipart(parts) => request.multipart(multipart_form(parts)?),
            WirePayload::Json(body) => request.json(&body),
            WirePayload::Query(pairs) => request.query(&pairs),
        };

        tracing::debug!(endpoint = endpoint.name, "Sending request");

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() && !endpoint.status_in_body {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                endpoint = endpoint.name,
                status = status.as_u16(),
                "Request rejected"
            );
            return Err(TransportError::Status(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Parse(e.to_string()))?;

        tracing::debug!(endpoint = endpoint.name, status = status.as_u16(), "Response received");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let transport = HttpTransport::new("http://localhost:5000", None);
        assert!(transport.is_ok());
        assert_eq!(transport.unwrap().base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_client_creation_with_timeout() {
        assert!(HttpTransport::new("http://localhost:5000", Some(Duration::from_secs(5))).is_ok());
    }

    #[test]
    fn test_bad_mime_type_is_encoding_error() {
        let parts = vec![MultipartPart::File {
            name: "image".to_string(),
            file: FileInput {
                file_name: "leaf.jpg".to_string(),
                content_type: "not a mime".to_string(),
                bytes: vec![1],
            },
        }];
        assert!(matches!(
            multipart_form(parts),
            Err(TransportError::Encoding(ref msg)) if msg.starts_with("leaf.jpg")
        ));
    }
}
