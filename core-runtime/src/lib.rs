//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the player core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Analytics event bus
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback and service
//! crates depend on. It establishes the logging conventions, the bridge
//! wiring done at start-up, and the publish/subscribe channel every player
//! action is reported through.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
