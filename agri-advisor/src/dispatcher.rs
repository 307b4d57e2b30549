//! Single-flight request dispatcher
//!
//! State machine per logical form:
//!
//! ```text
//! Idle -> Submitting -> Success | Failure -> (reset) -> Idle
//! ```
//!
//! At most one request is in flight per dispatcher. Every accepted submit
//! advances a generation counter; a resolution that comes back carrying an
//! older generation is dropped instead of overwriting newer state.

use crate::request::{Endpoint, WirePayload};
use crate::transport::{Transport, TransportError};
use agri_common::events::{AdvisorEvent, EventBus};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Turns a raw response body into the form's response type
pub type Decoder<R> = fn(Value) -> Result<R, TransportError>;

/// Default decoder: plain serde deserialization
pub fn decode_json<R: DeserializeOwned>(body: Value) -> Result<R, TransportError> {
    serde_json::from_value(body).map_err(|e| TransportError::Parse(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState<R> {
    Idle,
    Submitting { generation: u64 },
    Success(R),
    Failure(TransportError),
}

impl<R> DispatchState<R> {
    pub fn is_idle(&self) -> bool {
        matches!(self, DispatchState::Idle)
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, DispatchState::Submitting { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            DispatchState::Idle => "idle",
            DispatchState::Submitting { .. } => "submitting",
            DispatchState::Success(_) => "success",
            DispatchState::Failure(_) => "failure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("A request for {0} is already in flight")]
    AlreadyInFlight(String),

    #[error("Invalid dispatcher state: {0}")]
    InvalidState(String),
}

/// Proof that a submission was accepted; consumed when it settles
#[derive(Debug, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<R> {
    /// Outcome became the dispatcher's state
    Applied(Result<R, TransportError>),
    /// Outcome belonged to a superseded generation and was dropped
    Discarded,
}

impl<R> Resolution<R> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Resolution::Applied(_))
    }
}

struct Inner<R> {
    state: DispatchState<R>,
    generation: u64,
}

pub struct RequestDispatcher<R> {
    form_id: Uuid,
    form: &'static str,
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
    decode: Decoder<R>,
    inner: Mutex<Inner<R>>,
    events: Option<EventBus>,
}

impl<R> RequestDispatcher<R>
where
    R: Clone + Send,
{
    pub fn new(form: &'static str, endpoint: Endpoint, transport: Arc<dyn Transport>, decode: Decoder<R>) -> Self {
        Self {
            form_id: Uuid::new_v4(),
            form,
            endpoint,
            transport,
            decode,
            inner: Mutex::new(Inner {
                state: DispatchState::Idle,
                generation: 0,
            }),
            events: None,
        }
    }

    /// Report transitions on `bus`
    pub fn with_events(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn form_id(&self) -> Uuid {
        self.form_id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn state(&self) -> DispatchState<R> {
        self.inner.lock().await.state.clone()
    }

    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    /// Accept a new submission unless one is in flight
    ///
    /// A held Success/Failure is discarded.
    pub async fn begin(&self) -> Result<Ticket, DispatchError> {
        let mut inner = self.inner.lock().await;
        if inner.state.is_submitting() {
            debug!(form = self.form, "Submit rejected: request in flight");
            return Err(DispatchError::AlreadyInFlight(self.form.to_string()));
        }

        inner.generation += 1;
        let generation = inner.generation;
        inner.state = DispatchState::Submitting { generation };
        drop(inner);

        debug!(form = self.form, generation, "Submitting");
        self.emit(AdvisorEvent::SubmissionStarted {
            form_id: self.form_id,
            form: self.form.to_string(),
            generation,
            timestamp: chrono::Utc::now(),
        });

        Ok(Ticket { generation })
    }

    /// Apply a resolution if its generation is still current
    pub async fn settle(&self, ticket: Ticket, outcome: Result<R, TransportError>) -> Resolution<R> {
        let mut inner = self.inner.lock().await;
        let current = inner.generation;
        let is_current = matches!(
            inner.state,
            DispatchState::Submitting { generation } if generation == ticket.generation
        );

        if !is_current {
            drop(inner);
            warn!(
                form = self.form,
                generation = ticket.generation,
                current_generation = current,
                "Discarding stale resolution"
            );
            self.emit(AdvisorEvent::StaleResolutionDiscarded {
                form_id: self.form_id,
                form: self.form.to_string(),
                generation: ticket.generation,
                current_generation: current,
                timestamp: chrono::Utc::now(),
            });
            return Resolution::Discarded;
        }

        let succeeded = outcome.is_ok();
        inner.state = match &outcome {
            Ok(response) => DispatchState::Success(response.clone()),
            Err(error) => DispatchState::Failure(error.clone()),
        };
        drop(inner);

        info!(form = self.form, generation = ticket.generation, succeeded, "Request settled");
        self.emit(AdvisorEvent::SubmissionSettled {
            form_id: self.form_id,
            form: self.form.to_string(),
            generation: ticket.generation,
            succeeded,
            timestamp: chrono::Utc::now(),
        });

        Resolution::Applied(outcome)
    }

    /// Send `payload` and apply the outcome
    ///
    /// The lock is not held across the network call.
    pub async fn submit(&self, payload: WirePayload) -> Result<Resolution<R>, DispatchError> {
        let ticket = self.begin().await?;
        let outcome = self
            .transport
            .send(&self.endpoint, payload)
            .await
            .and_then(self.decode);
        Ok(self.settle(ticket, outcome).await)
    }

    /// Return to Idle from a settled state, discarding the held value
    ///
    /// No-op when already Idle; rejected while a request is in flight.
    pub async fn reset(&self) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            DispatchState::Idle => return Ok(()),
            DispatchState::Submitting { .. } => {
                return Err(DispatchError::InvalidState(format!(
                    "cannot reset {} while a request is in flight",
                    self.form
                )));
            }
            DispatchState::Success(_) | DispatchState::Failure(_) => {}
        }
        inner.state = DispatchState::Idle;
        drop(inner);

        self.emit_reset();
        Ok(())
    }

    /// Return to Idle from any state
    ///
    /// An in-flight request keeps running but its resolution will be
    /// discarded when it lands.
    pub async fn abandon(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state.is_idle() {
            return;
        }
        if inner.state.is_submitting() {
            inner.generation += 1;
        }
        let previous = inner.state.label();
        inner.state = DispatchState::Idle;
        drop(inner);

        debug!(form = self.form, previous, "Dispatcher abandoned");
        self.emit_reset();
    }

    fn emit_reset(&self) {
        self.emit(AdvisorEvent::DispatcherReset {
            form_id: self.form_id,
            form: self.form.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }

    fn emit(&self, event: AdvisorEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{HttpMethod, PayloadShape};
    use serde_json::json;

    const ENDPOINT: Endpoint = Endpoint {
        name: "test",
        method: HttpMethod::Post,
        path: "/predict",
        shape: PayloadShape::Json,
        renames: &[],
        status_in_body: false,
    };

    struct EchoTransport;

    #[async_trait::async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, _endpoint: &Endpoint, _payload: WirePayload) -> Result<Value, TransportError> {
            Ok(json!("pong"))
        }
    }

    struct FailingTransport;

    #[async_trait::async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _endpoint: &Endpoint, _payload: WirePayload) -> Result<Value, TransportError> {
            Err(TransportError::Network("connection refused".to_string()))
        }
    }

    fn dispatcher(transport: Arc<dyn Transport>) -> RequestDispatcher<String> {
        RequestDispatcher::new("test", ENDPOINT, transport, decode_json::<String>)
    }

    fn empty() -> WirePayload {
        WirePayload::Json(Default::default())
    }

    #[tokio::test]
    async fn test_submit_success() {
        let d = dispatcher(Arc::new(EchoTransport));
        assert_eq!(
            d.submit(empty()).await,
            Ok(Resolution::Applied(Ok("pong".to_string())))
        );
        assert_eq!(d.state().await, DispatchState::Success("pong".to_string()));
        assert_eq!(d.generation().await, 1);
    }

    #[tokio::test]
    async fn test_submit_failure() {
        let d = dispatcher(Arc::new(FailingTransport));
        d.submit(empty()).await.unwrap();
        assert!(matches!(d.state().await, DispatchState::Failure(TransportError::Network(_))));
    }

    #[tokio::test]
    async fn test_decode_failure_is_failure_state() {
        let d: RequestDispatcher<u32> =
            RequestDispatcher::new("test", ENDPOINT, Arc::new(EchoTransport), decode_json::<u32>);
        d.submit(empty()).await.unwrap();
        assert!(matches!(d.state().await, DispatchState::Failure(TransportError::Parse(_))));
    }

    #[tokio::test]
    async fn test_begin_rejected_while_submitting() {
        let d = dispatcher(Arc::new(EchoTransport));
        let ticket = d.begin().await.unwrap();
        assert_eq!(
            d.begin().await,
            Err(DispatchError::AlreadyInFlight("test".to_string()))
        );
        assert!(d.settle(ticket, Ok("done".to_string())).await.is_applied());
        assert!(d.begin().await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_rules() {
        let d = dispatcher(Arc::new(EchoTransport));
        assert!(d.reset().await.is_ok());

        let ticket = d.begin().await.unwrap();
        assert!(matches!(d.reset().await, Err(DispatchError::InvalidState(_))));

        d.settle(ticket, Err(TransportError::Network("down".to_string()))).await;
        assert!(d.reset().await.is_ok());
        assert!(d.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_abandoned_resolution_discarded() {
        let d = dispatcher(Arc::new(EchoTransport));
        let stale = d.begin().await.unwrap();
        d.abandon().await;
        assert!(d.state().await.is_idle());

        assert_eq!(d.settle(stale, Ok("late".to_string())).await, Resolution::Discarded);
        assert!(d.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_events_emitted() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let d = dispatcher(Arc::new(EchoTransport)).with_events(bus);

        d.submit(empty()).await.unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            AdvisorEvent::SubmissionStarted { generation: 1, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            AdvisorEvent::SubmissionSettled { succeeded: true, .. }
        ));
    }
}
