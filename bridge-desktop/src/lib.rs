//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `SettingsStore` backed by a JSON document in the platform config
//!   directory ([`JsonFileSettingsStore`])
//! - `SettingsStore` kept purely in memory ([`InMemorySettingsStore`])
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::JsonFileSettingsStore;
//! use bridge_traits::SettingsStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = JsonFileSettingsStore::default_location("my-player").await.unwrap();
//!     store.set_string("theme", "dark").await.unwrap();
//! }
//! ```

mod memory;
mod settings;

pub use memory::InMemorySettingsStore;
pub use settings::JsonFileSettingsStore;
