//! # BCR GUI Common Library
//!
//! Shared code for the bcrg crates including:
//! - Error type and result alias
//! - Configuration loading (TOML file, environment, compiled defaults)
//! - Timestamp helpers (epoch milliseconds)
//! - Progress events and the EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, IndexEvent};
