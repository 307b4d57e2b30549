//! agri-advisor library interface
//!
//! Recommender views (crop, fertilizer, disease, seed/pesticide) and the
//! weather view, built on a single-flight request dispatcher. The binary is
//! a thin command-line front end over these modules.

pub mod aggregate;
pub mod alerts;
pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod fields;
pub mod request;
pub mod transport;
pub mod units;
pub mod views;
pub mod weather;

pub use crate::error::{AdvisorError, AdvisorResult};
