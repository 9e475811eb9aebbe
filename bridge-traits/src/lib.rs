//! # Host Bridge Traits
//!
//! Capability traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the player core and the
//! platform-specific pieces it cannot own itself. Each trait represents a
//! capability that the core requires but that must be implemented differently
//! per platform (desktop, mobile, web).
//!
//! ## Traits
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!   used to persist volume, repeat/shuffle mode and the uploaded-track list
//!
//! ### Identity
//! - [`UserSession`](user::UserSession) - Read-only accessor for the signed-in
//!   user plus the "recently played" hook
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should convert platform-specific
//! errors to `BridgeError` and include context (keys, paths) in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so a single implementation
//! can be shared between the playback core and its background writer task.

pub mod error;
pub mod storage;
pub mod time;
pub mod user;

pub use error::BridgeError;

// Re-export commonly used types
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use user::{AnonymousSession, UserSession};
