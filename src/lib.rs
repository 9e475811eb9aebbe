//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`, `core-playback`). Host applications
//! can depend on `player-core-workspace` and enable the documented features
//! without needing to wire each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service;

#[cfg(feature = "playback-only")]
pub use core_playback;

#[cfg(feature = "playback-only")]
pub use core_runtime;
