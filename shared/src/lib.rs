//! Shared types for the Atelier catalog platform
//!
//! Wire and domain types used across the client crates: cart state,
//! auth/profile DTOs, catalog entities, and utility helpers.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Cart re-exports (the most frequently consumed types)
pub use cart::{CartLine, CartSnapshot, CartSummary, MAX_LINE_QUANTITY};
