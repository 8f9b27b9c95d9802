//! Catalog entities and admin DTOs
//!
//! Items, variants, comments, and the admin user-management payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purchasable configuration (size/color/sku) of a catalog item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variant {
    pub id: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub sku: Option<String>,
    pub stock: Option<u32>,
    pub price: Option<f64>,
}

/// Catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub clothing_type: Option<String>,
    pub article: Option<String>,
    pub size: Option<String>,
    pub style: Option<String>,
    pub collection: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub is_favorite: bool,
}

/// Query parameters for item listings. `None` fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

// =============================================================================
// Comments
// =============================================================================

/// Create-comment payload; rating is optional (1..=5 when present).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentCreate {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Item comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u32,
}

// =============================================================================
// Admin user management
// =============================================================================

/// User account row as shown in the admin console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Admin create-user payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

/// Admin update-user payload; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}
