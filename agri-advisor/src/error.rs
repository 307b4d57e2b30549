//! Error types for agri-advisor
//!
//! Validation errors never reach the network. Transport errors are shown to
//! the user as one generic message per view; the variants exist for logs.

use crate::dispatcher::DispatchError;
use crate::fields::ValidationError;
use crate::request::PayloadError;
use crate::transport::TransportError;
use crate::weather::GeolocationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Form input rejected before submission
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Request could not be shaped for its endpoint
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// Dispatcher misuse (double submit, reset while in flight)
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Network, HTTP status, or decode failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    /// agri-common error
    #[error("Common error: {0}")]
    Common(#[from] agri_common::Error),
}

/// Result type for advisor operations
pub type AdvisorResult<T> = Result<T, AdvisorError>;
