//! # AgriSense Common Library
//!
//! Shared code for the AgriSense advisor crates:
//! - Error type and result alias
//! - Configuration loading and value resolution
//! - Persisted user preferences
//! - Event types and the in-process event bus

pub mod config;
pub mod error;
pub mod events;
pub mod preferences;

pub use error::{Error, Result};
pub use events::{AdvisorEvent, EventBus};
pub use preferences::PreferenceStore;
