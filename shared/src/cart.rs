//! Cart state types shared between the synchronizer and its callers
//!
//! A cart is a list of lines, one per purchasable variant, plus an
//! aggregate summary. Authenticated carts are server-owned and these types
//! mirror the REST contract; guest carts persist the reduced
//! [`StoredCartLine`] shape locally and are inflated back into full lines
//! for display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-line quantity cap. Increments past this clamp instead of failing.
pub const MAX_LINE_QUANTITY: u32 = 99;

fn default_true() -> bool {
    true
}

fn default_quantity() -> u32 {
    1
}

// =============================================================================
// Denormalized display snapshots
// =============================================================================

/// Variant snapshot embedded in a cart line (size/color/sku configuration).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantInfo {
    pub id: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub discount_price: Option<f64>,
    /// Stock still purchasable for this variant, as last reported.
    pub available_stock: Option<u32>,
    pub display_name: Option<String>,
    /// Price after discount resolution, server-computed.
    pub actual_price: Option<f64>,
}

/// Catalog item snapshot embedded in a cart line, enough to render a row
/// without a catalog lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i64,
    pub name: String,
    pub brand: Option<String>,
    pub article: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

// =============================================================================
// Cart lines
// =============================================================================

/// One active cart entry referencing a purchasable variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Cart-entry identity, unique per cart.
    pub id: i64,
    pub variant_id: i64,
    pub quantity: u32,
    /// Price snapshot taken when the line was created; may diverge from the
    /// live price.
    pub price_at_time: Option<f64>,
    /// Server-reported line total once synced; locally estimated before.
    pub subtotal: Option<f64>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_reserved: bool,
    /// Stock hold expiry. In the past means the reservation is expired,
    /// which is distinct from "available, unreserved".
    pub reserved_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub variant: VariantInfo,
    pub item: ItemSummary,
}

impl CartLine {
    /// Best-known unit price for local estimation: the add-time snapshot,
    /// falling back to the variant's resolved or list price.
    pub fn effective_unit_price(&self) -> f64 {
        self.price_at_time
            .or(self.variant.actual_price)
            .or(self.variant.discount_price)
            .or(self.variant.price)
            .unwrap_or(0.0)
    }

    /// Line total: the server value when synced, otherwise estimated.
    pub fn effective_subtotal(&self) -> f64 {
        self.subtotal
            .unwrap_or_else(|| self.effective_unit_price() * f64::from(self.quantity))
    }
}

// =============================================================================
// Summary and snapshot
// =============================================================================

/// Aggregate cart view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSummary {
    #[serde(default)]
    pub total: f64,
    /// Sum of line quantities.
    #[serde(default)]
    pub total_items: u32,
    /// Number of distinct lines.
    #[serde(default)]
    pub items_count: u32,
    #[serde(default)]
    pub has_unavailable: bool,
    /// Ids of lines that became unpurchasable.
    #[serde(default)]
    pub unavailable_items: Vec<i64>,
}

impl CartSummary {
    /// Derives a summary from lines, estimating totals locally. Used for
    /// guest carts and for optimistic intermediate states; authoritative
    /// values come from the server once synced.
    pub fn from_lines(lines: &[CartLine]) -> Self {
        let unavailable_items: Vec<i64> = lines
            .iter()
            .filter(|l| !l.is_available)
            .map(|l| l.id)
            .collect();

        Self {
            total: lines.iter().map(CartLine::effective_subtotal).sum(),
            total_items: lines.iter().map(|l| l.quantity).sum(),
            items_count: lines.len() as u32,
            has_unavailable: !unavailable_items.is_empty(),
            unavailable_items,
        }
    }
}

/// Materialized cart state returned by the synchronizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
    pub summary: CartSummary,
}

impl CartSnapshot {
    /// An empty cart.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from lines with a locally derived summary.
    pub fn from_lines(items: Vec<CartLine>) -> Self {
        let summary = CartSummary::from_lines(&items);
        Self { items, summary }
    }
}

// =============================================================================
// Guest persistence shape
// =============================================================================

/// Reduced line shape persisted by the guest cart under the local `cart`
/// key. Inflated back into a [`CartLine`] for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCartLine {
    pub id: i64,
    pub variant_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub image_url: Option<String>,
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl StoredCartLine {
    /// Inflates the stored shape into a display line. Guest lines carry no
    /// server-side availability or reservation state.
    pub fn to_line(&self) -> CartLine {
        CartLine {
            id: self.id,
            variant_id: self.variant_id,
            quantity: self.quantity,
            price_at_time: Some(self.price),
            subtotal: Some(self.price * f64::from(self.quantity)),
            is_available: true,
            is_reserved: false,
            reserved_until: None,
            notes: self.notes.clone(),
            added_at: self.added_at,
            updated_at: None,
            variant: VariantInfo {
                id: self.variant_id,
                price: Some(self.price),
                ..VariantInfo::default()
            },
            item: ItemSummary {
                id: self.variant_id,
                name: self.name.clone(),
                image_urls: self.image_url.clone().into_iter().collect(),
                ..ItemSummary::default()
            },
        }
    }
}

// =============================================================================
// Mutation requests
// =============================================================================

/// Payload for adding a variant to the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineCreate {
    pub variant_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// What a caller holds when it adds something to the cart: the variant id
/// the server needs plus the display snapshot the guest cart persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineInput {
    pub variant_id: i64,
    pub name: String,
    pub price: f64,
    pub image_url: Option<String>,
}

/// Payload for patching an existing line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartLineUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, quantity: u32, price: f64, available: bool) -> CartLine {
        CartLine {
            id,
            variant_id: id,
            quantity,
            price_at_time: Some(price),
            subtotal: None,
            is_available: available,
            is_reserved: false,
            reserved_until: None,
            notes: None,
            added_at: Utc::now(),
            updated_at: None,
            variant: VariantInfo::default(),
            item: ItemSummary::default(),
        }
    }

    #[test]
    fn summary_from_lines_estimates_totals() {
        let lines = vec![line(1, 2, 100.0, true), line(2, 1, 50.0, true)];
        let summary = CartSummary::from_lines(&lines);

        assert_eq!(summary.total, 250.0);
        assert_eq!(summary.total_items, 3);
        assert_eq!(summary.items_count, 2);
        assert!(!summary.has_unavailable);
        assert!(summary.unavailable_items.is_empty());
    }

    #[test]
    fn summary_tracks_unavailable_lines() {
        let lines = vec![line(1, 1, 10.0, true), line(7, 1, 10.0, false)];
        let summary = CartSummary::from_lines(&lines);

        assert!(summary.has_unavailable);
        assert_eq!(summary.unavailable_items, vec![7]);
    }

    #[test]
    fn server_subtotal_wins_over_estimate() {
        let mut l = line(1, 3, 100.0, true);
        l.subtotal = Some(270.0);
        assert_eq!(l.effective_subtotal(), 270.0);
    }

    #[test]
    fn stored_line_round_trips_into_display_line() {
        let stored = StoredCartLine {
            id: 42,
            variant_id: 10,
            name: "Wool coat".into(),
            price: 129.0,
            quantity: 2,
            image_url: Some("https://cdn.example/coat.jpg".into()),
            notes: None,
            added_at: Utc::now(),
        };

        let inflated = stored.to_line();
        assert_eq!(inflated.id, 42);
        assert_eq!(inflated.variant_id, 10);
        assert_eq!(inflated.effective_subtotal(), 258.0);
        assert!(inflated.is_available);
        assert!(!inflated.is_reserved);
    }
}
