//! `adminpanel-client`
//!
//! **Responsibility:** Client-side state behind the admin console's
//! authorization decisions.
//!
//! This crate provides:
//! - Persisted key-value storage (in-memory and JSON file)
//! - A time-bounded profile cache (10 minute TTL by default)
//! - Cache-first profile retrieval with deduplicated, generation-checked fetches
//! - A Leptos route adapter for wasm builds
//!
//! The server remains the authority; nothing here is a security boundary.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(target_arch = "wasm32")]
pub mod frontend;

pub use cache::{PROFILE_TTL_MINUTES, ProfileCache};
pub use config::{ClientConfig, ConfigError};
pub use fetch::{FetchError, ProfileEnvelope, ProfileFetcher};
#[cfg(all(feature = "http", not(target_arch = "wasm32")))]
pub use fetch::HttpProfileFetcher;
pub use session::Session;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{ProfileStore, StoreOptions, StoreSnapshot};
