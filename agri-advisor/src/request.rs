//! Endpoint descriptors and wire payload construction

use crate::fields::{FieldValue, FileInput, PredictionRequest};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Body shape an endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// One multipart part per field; files allowed
    Multipart,
    /// A flat JSON object
    Json,
    /// URL query parameters
    Query,
}

/// Static description of one remote endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Short name used in logs and events
    pub name: &'static str,
    pub method: HttpMethod,
    /// Path joined onto the service base URL; empty means the base URL itself
    pub path: &'static str,
    pub shape: PayloadShape,
    /// Field → wire name renames declared by the endpoint
    pub renames: &'static [(&'static str, &'static str)],
    /// Error statuses still carry a meaningful JSON body that the caller inspects
    pub status_in_body: bool,
}

impl Endpoint {
    pub fn wire_name<'a>(&self, field: &'a str) -> &'a str {
        self.renames
            .iter()
            .find(|(from, _)| *from == field)
            .map(|(_, to)| *to)
            .unwrap_or(field)
    }

    /// Join `path` onto `base_url`
    pub fn url(&self, base_url: &str) -> String {
        if self.path.is_empty() {
            return base_url.to_string();
        }
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Text { name: String, value: String },
    File { name: String, file: FileInput },
}

/// Request body ready for the transport
#[derive(Debug, Clone, PartialEq)]
pub enum WirePayload {
    Multipart(Vec<MultipartPart>),
    Json(Map<String, Value>),
    Query(Vec<(String, String)>),
}

impl WirePayload {
    /// Query payload from literal pairs
    pub fn query<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        WirePayload::Query(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Names of all entries, in order
    pub fn keys(&self) -> Vec<&str> {
        match self {
            WirePayload::Multipart(parts) => parts
                .iter()
                .map(|p| match p {
                    MultipartPart::Text { name, .. } | MultipartPart::File { name, .. } => name.as_str(),
                })
                .collect(),
            WirePayload::Json(map) => map.keys().map(String::as_str).collect(),
            WirePayload::Query(pairs) => pairs.iter().map(|(k, _)| k.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Field {field} holds a file, which {endpoint} cannot carry")]
    FileNotSupported { field: String, endpoint: String },
}

fn scalar_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Number(n) => Some(n.to_string()),
        FieldValue::File(_) => None,
    }
}

/// Map a validated request onto `endpoint`'s payload shape
///
/// Every request entry becomes exactly one payload entry, in request order.
pub fn build(endpoint: &Endpoint, request: &PredictionRequest) -> Result<WirePayload, PayloadError> {
    let file_error = |field: &str| PayloadError::FileNotSupported {
        field: field.to_string(),
        endpoint: endpoint.name.to_string(),
    };

    match endpoint.shape {
        PayloadShape::Multipart => {
            let parts = request
                .entries()
                .iter()
                .map(|(field, value)| {
                    let name = endpoint.wire_name(field).to_string();
                    match value {
                        FieldValue::File(file) => MultipartPart::File {
                            name,
                            file: file.clone(),
                        },
                        other => MultipartPart::Text {
                            name,
                            value: scalar_text(other).unwrap_or_default(),
                        },
                    }
                })
                .collect();
            Ok(WirePayload::Multipart(parts))
        }
        PayloadShape::Json => {
            let mut body = Map::new();
            for (field, value) in request.entries() {
                let json = match value {
                    FieldValue::Text(s) => Value::String(s.clone()),
                    FieldValue::Number(n) => serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    FieldValue::File(_) => return Err(file_error(field)),
                };
                body.insert(endpoint.wire_name(field).to_string(), json);
            }
            Ok(WirePayload::Json(body))
        }
        PayloadShape::Query => {
            let mut pairs = Vec::with_capacity(request.entries().len());
            for (field, value) in request.entries() {
                let text = scalar_text(value).ok_or_else(|| file_error(field))?;
                pairs.push((endpoint.wire_name(field).to_string(), text));
            }
            Ok(WirePayload::Query(pairs))
        }
    }
}
