//! graphbridge-core: Shared types, configuration, and error handling for graphbridge.
//!
//! This crate provides the foundational types used across all graphbridge crates:
//! - Normalized graph elements (nodes, relationships) and property maps
//! - The result envelope every operation returns
//! - Configuration loading and validation
//! - The error taxonomy shared by the store layer and the dispatcher

pub mod config;
pub mod error;
pub mod types;

pub use config::Settings;
pub use error::{BridgeError, ErrorKind};
pub use types::{Envelope, JsonObject, NodeElement, Payload, PropertyMap};
