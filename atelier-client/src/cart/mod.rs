//! Cart synchronizer
//!
//! One cart abstraction regardless of authentication state. Two backends
//! sit behind the façade: guest carts live in the local store, server
//! carts behind a read-through cache over the REST API. Which backend
//! serves a call is decided per operation from the auth session, so a
//! login or logout switches the source of truth without rebuilding the
//! service.
//!
//! Mutations never silently drop: the server path is optimistic with
//! rollback, and every mutation is serialized behind an internal lock so
//! rapid-fire updates on the same line cannot interleave.

mod api;
mod guest;
pub mod metrics;
mod server;

pub use api::CartApi;
pub use server::CACHE_FRESHNESS;

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use shared::cart::{CartLine, CartLineInput, CartSnapshot, MAX_LINE_QUANTITY};

use crate::auth::AuthSession;
use crate::storage::LocalStore;
use crate::{ClientError, ClientResult};

use guest::GuestCart;
use server::ServerCart;

/// Unified cart façade over the guest and server backends.
#[derive(Debug)]
pub struct CartService {
    session: Arc<AuthSession>,
    guest: RwLock<GuestCart>,
    server: ServerCart,
    /// Serializes mutations across their whole optimistic span.
    mutation_lock: Mutex<()>,
}

impl CartService {
    /// Create a service using the session's own transport for the server
    /// backend. Guest lines are loaded from the store once, here.
    pub fn new(session: Arc<AuthSession>, store: LocalStore) -> ClientResult<Self> {
        let api: Arc<dyn CartApi> = Arc::new(session.http().clone());
        Self::with_api(api, session, store)
    }

    /// Create a service over a custom transport implementation.
    pub fn with_api(
        api: Arc<dyn CartApi>,
        session: Arc<AuthSession>,
        store: LocalStore,
    ) -> ClientResult<Self> {
        Ok(Self {
            session,
            guest: RwLock::new(GuestCart::load(store)?),
            server: ServerCart::new(api),
            mutation_lock: Mutex::new(()),
        })
    }

    fn validate_quantity(quantity: u32) -> ClientResult<()> {
        if quantity == 0 {
            return Err(ClientError::Validation(
                "Quantity must be a positive integer".to_string(),
            ));
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(ClientError::Validation(format!(
                "Quantity must not exceed {MAX_LINE_QUANTITY}"
            )));
        }
        Ok(())
    }

    /// Current cart state.
    ///
    /// Authenticated sessions read the server cart through the freshness
    /// cache; a rejected session falls back to the guest view for reads so
    /// browsing keeps working while re-authentication is pending.
    pub async fn snapshot(&self) -> ClientResult<CartSnapshot> {
        if self.session.is_authenticated().await {
            match self.server.snapshot().await {
                Ok(snapshot) => Ok(snapshot),
                Err(ClientError::Unauthorized) => {
                    tracing::warn!("Session rejected by server, serving guest cart for reads");
                    Ok(self.guest.read().await.snapshot())
                }
                Err(e) => Err(e),
            }
        } else {
            Ok(self.guest.read().await.snapshot())
        }
    }

    /// Force a server refetch (no-op freshness-wise for guests).
    pub async fn refresh(&self) -> ClientResult<CartSnapshot> {
        if self.session.is_authenticated().await {
            self.server.refetch().await
        } else {
            Ok(self.guest.read().await.snapshot())
        }
    }

    /// Drop the cached server snapshot (call after logout).
    pub async fn invalidate(&self) {
        self.server.invalidate().await;
    }

    /// Add a variant to the cart; an existing line for the same variant is
    /// incremented (clamped to the cap) instead of duplicated.
    pub async fn add_item(
        &self,
        input: &CartLineInput,
        quantity: u32,
        notes: Option<String>,
    ) -> ClientResult<CartSnapshot> {
        Self::validate_quantity(quantity)?;
        let _guard = self.mutation_lock.lock().await;

        if self.session.is_authenticated().await {
            self.server.add(input, quantity, notes).await
        } else {
            Ok(self.guest.write().await.add(input, quantity, notes)?)
        }
    }

    /// Set a line's quantity. Zero is equivalent to removal.
    pub async fn update_quantity(
        &self,
        line_id: i64,
        quantity: u32,
    ) -> ClientResult<CartSnapshot> {
        if quantity == 0 {
            return self.remove_item(line_id).await;
        }
        Self::validate_quantity(quantity)?;
        let _guard = self.mutation_lock.lock().await;

        if self.session.is_authenticated().await {
            self.server.update_quantity(line_id, quantity).await
        } else {
            Ok(self.guest.write().await.update_quantity(line_id, quantity)?)
        }
    }

    /// Replace a line's notes.
    pub async fn update_notes(
        &self,
        line_id: i64,
        notes: Option<String>,
    ) -> ClientResult<CartSnapshot> {
        let _guard = self.mutation_lock.lock().await;

        if self.session.is_authenticated().await {
            self.server.update_notes(line_id, notes).await
        } else {
            Ok(self.guest.write().await.update_notes(line_id, notes)?)
        }
    }

    /// Delete a line. Removing an absent line is a no-op, not an error.
    pub async fn remove_item(&self, line_id: i64) -> ClientResult<CartSnapshot> {
        let _guard = self.mutation_lock.lock().await;

        if self.session.is_authenticated().await {
            self.server.remove(line_id).await
        } else {
            Ok(self.guest.write().await.remove(line_id)?)
        }
    }

    /// Empty the cart.
    pub async fn clear(&self) -> ClientResult<CartSnapshot> {
        let _guard = self.mutation_lock.lock().await;

        if self.session.is_authenticated().await {
            self.server.clear().await
        } else {
            Ok(self.guest.write().await.clear()?)
        }
    }

    // ========== Lookup helpers ==========

    /// Whether the cart holds a line for the given variant.
    pub async fn contains_variant(&self, variant_id: i64) -> ClientResult<bool> {
        Ok(self
            .snapshot()
            .await?
            .items
            .iter()
            .any(|l| l.variant_id == variant_id))
    }

    /// Quantity currently held for the given variant (zero when absent).
    pub async fn variant_quantity(&self, variant_id: i64) -> ClientResult<u32> {
        Ok(self
            .snapshot()
            .await?
            .items
            .iter()
            .find(|l| l.variant_id == variant_id)
            .map(|l| l.quantity)
            .unwrap_or(0))
    }

    /// The line holding the given variant, if any.
    pub async fn line_for_variant(&self, variant_id: i64) -> ClientResult<Option<CartLine>> {
        Ok(self
            .snapshot()
            .await?
            .items
            .iter()
            .find(|l| l.variant_id == variant_id)
            .cloned())
    }

    // ========== Guest cart adoption ==========

    /// Push the stored guest lines into the authenticated cart.
    ///
    /// Guest and server carts are tracked independently; logging in does
    /// NOT merge them. Callers that want the guest cart carried over
    /// invoke this explicitly after login. Lines are transferred one by
    /// one and removed from the guest store as they land; on failure the
    /// untransferred remainder stays put and the error surfaces.
    pub async fn adopt_guest_cart(&self) -> ClientResult<CartSnapshot> {
        if !self.session.is_authenticated().await {
            return Err(ClientError::Unauthorized);
        }

        let _guard = self.mutation_lock.lock().await;

        let stored = self.guest.read().await.lines().to_vec();
        if stored.is_empty() {
            return self.server.snapshot().await;
        }

        tracing::info!(lines = stored.len(), "Adopting guest cart into server cart");

        for line in stored {
            let input = CartLineInput {
                variant_id: line.variant_id,
                name: line.name.clone(),
                price: line.price,
                image_url: line.image_url.clone(),
            };
            self.server
                .add(&input, line.quantity, line.notes.clone())
                .await?;
            self.guest.write().await.remove(line.id)?;
        }

        self.server.refetch().await
    }
}
