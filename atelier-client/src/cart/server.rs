//! Server cart backend
//!
//! For authenticated sessions the server owns the cart; the client holds a
//! read-through cache with a freshness window. Every mutation follows the
//! two-phase discipline: remember the last known-good snapshot, apply the
//! change tentatively so observers see it immediately, fire the request,
//! then either commit the server's authoritative state or roll back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use shared::cart::{
    CartLine, CartLineCreate, CartLineInput, CartLineUpdate, CartSnapshot, CartSummary,
    ItemSummary, MAX_LINE_QUANTITY, VariantInfo,
};
use shared::util::snowflake_id;

use crate::{ClientError, ClientResult};

use super::api::CartApi;

/// How long a fetched snapshot is served without a refetch.
pub const CACHE_FRESHNESS: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CachedSnapshot {
    snapshot: CartSnapshot,
    fetched_at: Instant,
}

impl CachedSnapshot {
    fn fresh(snapshot: CartSnapshot) -> Self {
        Self {
            snapshot,
            fetched_at: Instant::now(),
        }
    }

    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < CACHE_FRESHNESS
    }
}

/// Read-through cache over the server cart.
pub(crate) struct ServerCart {
    api: Arc<dyn CartApi>,
    cache: RwLock<Option<CachedSnapshot>>,
}

impl std::fmt::Debug for ServerCart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerCart").finish_non_exhaustive()
    }
}

impl ServerCart {
    pub fn new(api: Arc<dyn CartApi>) -> Self {
        Self {
            api,
            cache: RwLock::new(None),
        }
    }

    /// Current snapshot, served from cache while fresh.
    pub async fn snapshot(&self) -> ClientResult<CartSnapshot> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.snapshot.clone());
            }
        }
        self.refetch().await
    }

    /// Fetch from the server and replace the cache.
    pub async fn refetch(&self) -> ClientResult<CartSnapshot> {
        let snapshot = self.api.fetch_cart().await?;
        *self.cache.write().await = Some(CachedSnapshot::fresh(snapshot.clone()));
        tracing::debug!(
            lines = snapshot.items.len(),
            "Server cart snapshot refreshed"
        );
        Ok(snapshot)
    }

    /// Drop the cached snapshot (e.g., on logout).
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn remember(&self) -> Option<CachedSnapshot> {
        self.cache.read().await.clone()
    }

    async fn apply_tentative(&self, snapshot: CartSnapshot) {
        *self.cache.write().await = Some(CachedSnapshot::fresh(snapshot));
    }

    async fn rollback(&self, prev: Option<CachedSnapshot>) {
        *self.cache.write().await = prev;
    }

    /// The tentative line shown between the optimistic apply and the
    /// server's authoritative answer.
    fn provisional_line(input: &CartLineInput, quantity: u32, notes: Option<String>) -> CartLine {
        CartLine {
            id: snowflake_id(),
            variant_id: input.variant_id,
            quantity,
            price_at_time: Some(input.price),
            subtotal: Some(input.price * f64::from(quantity)),
            is_available: true,
            is_reserved: false,
            reserved_until: None,
            notes,
            added_at: Utc::now(),
            updated_at: None,
            variant: VariantInfo {
                id: input.variant_id,
                price: Some(input.price),
                ..VariantInfo::default()
            },
            item: ItemSummary {
                id: input.variant_id,
                name: input.name.clone(),
                image_urls: input.image_url.clone().into_iter().collect(),
                ..ItemSummary::default()
            },
        }
    }

    fn with_recomputed_summary(mut items: Vec<CartLine>) -> CartSnapshot {
        items.retain(|l| l.quantity > 0);
        let summary = CartSummary::from_lines(&items);
        CartSnapshot { items, summary }
    }

    /// Add a variant to the server cart.
    ///
    /// Callers must hold the synchronizer's mutation lock.
    pub async fn add(
        &self,
        input: &CartLineInput,
        quantity: u32,
        notes: Option<String>,
    ) -> ClientResult<CartSnapshot> {
        let prev = self.remember().await;

        if let Some(cached) = &prev {
            let mut items = cached.snapshot.items.clone();
            match items.iter_mut().find(|l| l.variant_id == input.variant_id) {
                Some(line) => {
                    line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
                    line.subtotal = Some(line.effective_unit_price() * f64::from(line.quantity));
                }
                None => items.push(Self::provisional_line(input, quantity, notes.clone())),
            }
            self.apply_tentative(Self::with_recomputed_summary(items)).await;
        }

        let request = CartLineCreate {
            variant_id: input.variant_id,
            quantity,
            notes,
        };

        match self.api.add_line(&request).await {
            Ok(snapshot) => {
                self.apply_tentative(snapshot.clone()).await;
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(variant_id = input.variant_id, "Add to cart failed: {}", e);
                self.rollback(prev).await;
                Err(e)
            }
        }
    }

    /// Set one line's quantity (callers route zero to `remove`).
    pub async fn update_quantity(&self, line_id: i64, quantity: u32) -> ClientResult<CartSnapshot> {
        let prev = self.remember().await;

        if let Some(cached) = &prev {
            let mut items = cached.snapshot.items.clone();
            if let Some(line) = items.iter_mut().find(|l| l.id == line_id) {
                line.quantity = quantity;
                line.subtotal = Some(line.effective_unit_price() * f64::from(quantity));
            }
            self.apply_tentative(Self::with_recomputed_summary(items)).await;
        }

        let request = CartLineUpdate {
            quantity: Some(quantity),
            notes: None,
        };

        match self.api.update_line(line_id, &request).await {
            Ok(snapshot) => {
                self.apply_tentative(snapshot.clone()).await;
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(line_id, "Quantity update failed: {}", e);
                self.rollback(prev).await;
                Err(e)
            }
        }
    }

    /// Replace one line's notes.
    pub async fn update_notes(
        &self,
        line_id: i64,
        notes: Option<String>,
    ) -> ClientResult<CartSnapshot> {
        let prev = self.remember().await;

        let request = CartLineUpdate {
            quantity: None,
            notes: notes.clone(),
        };

        match self.api.update_line(line_id, &request).await {
            Ok(snapshot) => {
                self.apply_tentative(snapshot.clone()).await;
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(line_id, "Notes update failed: {}", e);
                self.rollback(prev).await;
                Err(e)
            }
        }
    }

    /// Delete a line. Removing a line the server no longer has counts as
    /// success.
    pub async fn remove(&self, line_id: i64) -> ClientResult<CartSnapshot> {
        let prev = self.remember().await;

        // Absent in a fresh snapshot means nothing to do.
        if let Some(cached) = &prev {
            if cached.is_fresh() && !cached.snapshot.items.iter().any(|l| l.id == line_id) {
                return Ok(cached.snapshot.clone());
            }

            let mut items = cached.snapshot.items.clone();
            items.retain(|l| l.id != line_id);
            self.apply_tentative(Self::with_recomputed_summary(items)).await;
        }

        match self.api.remove_line(line_id).await {
            Ok(()) | Err(ClientError::NotFound(_)) => self.refetch().await,
            Err(e) => {
                tracing::warn!(line_id, "Remove from cart failed: {}", e);
                self.rollback(prev).await;
                Err(e)
            }
        }
    }

    /// Clear the whole cart server-side.
    pub async fn clear(&self) -> ClientResult<CartSnapshot> {
        let prev = self.remember().await;
        self.apply_tentative(CartSnapshot::empty()).await;

        match self.api.clear().await {
            Ok(()) => self.refetch().await,
            Err(e) => {
                tracing::warn!("Cart clear failed: {}", e);
                self.rollback(prev).await;
                Err(e)
            }
        }
    }
}
