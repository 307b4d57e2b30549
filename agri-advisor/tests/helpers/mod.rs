//! Test doubles for the transport and geolocation seams

#![allow(dead_code)]

use agri_advisor::request::{Endpoint, WirePayload};
use agri_advisor::transport::{Transport, TransportError};
use agri_advisor::weather::{Coordinates, GeolocationError, Geolocator};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

/// One request as the transport saw it
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub endpoint: &'static str,
    pub path: &'static str,
    pub payload: WirePayload,
}

impl RecordedCall {
    /// Value of a query parameter, if this was a query payload
    pub fn query_value(&self, key: &str) -> Option<&str> {
        match &self.payload {
            WirePayload::Query(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Replies from a queue of canned responses and records every call
///
/// An exhausted queue answers with a network error.
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = Result<Value, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: Result<Value, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, endpoint: &Endpoint, payload: WirePayload) -> Result<Value, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            endpoint: endpoint.name,
            path: endpoint.path,
            payload,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no canned response".to_string())))
    }
}

/// Holds every request open until the test releases it
///
/// Call `gate()` once per expected request, in the order the requests will
/// be sent; each send waits on the next gate.
#[derive(Default)]
pub struct GatedTransport {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<Value, TransportError>>>>,
    calls: AtomicUsize,
}

impl GatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> oneshot::Sender<Result<Value, TransportError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().push_back(rx);
        tx
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Wait until `n` requests have reached the transport
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("requests never reached the transport");
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, _endpoint: &Endpoint, _payload: WirePayload) -> Result<Value, TransportError> {
        let gate = self.gates.lock().unwrap().pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("gate dropped".to_string()))),
            None => Err(TransportError::Network("no gate".to_string())),
        }
    }
}

/// Counts position requests and answers with a fixed result
pub struct CountingGeolocator {
    result: Result<Coordinates, GeolocationError>,
    calls: AtomicUsize,
}

impl CountingGeolocator {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            result: Ok(Coordinates { latitude, longitude }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geolocator for CountingGeolocator {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Current-weather body in the service's shape
pub fn weather_body(name: &str, temp: f64, wind: f64, condition: &str) -> Value {
    json!({
        "cod": 200,
        "name": name,
        "sys": {"country": "FR"},
        "main": {"temp": temp, "humidity": 60, "feels_like": temp},
        "wind": {"speed": wind},
        "weather": [{"main": condition, "description": condition.to_lowercase(), "icon": "01d"}]
    })
}
