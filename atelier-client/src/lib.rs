//! Atelier Client - SDK for the fashion catalog API
//!
//! Auth session, cart synchronization (guest + server-backed), catalog
//! browsing, and local persistence for the storefront frontends.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod profile;
pub mod storage;
pub mod users;

pub use auth::{AuthSession, TokenStore};
pub use cart::{CACHE_FRESHNESS, CartApi, CartService};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::HttpClient;
pub use storage::{LocalStore, StorageError};

// Re-export shared types for convenience
pub use shared::auth::{AuthTokens, Profile};
pub use shared::cart::{CartLine, CartLineInput, CartSnapshot, CartSummary, MAX_LINE_QUANTITY};
