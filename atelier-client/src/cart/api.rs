//! Cart transport seam
//!
//! The synchronizer talks to the server cart through this trait so the
//! network transport stays swappable: production uses [`HttpClient`],
//! tests drive the same synchronizer against an in-memory implementation.

use async_trait::async_trait;

use shared::cart::{CartLineCreate, CartLineUpdate, CartSnapshot};

use crate::{ClientResult, HttpClient};

/// Server-side cart operations.
///
/// Mutations return the full updated snapshot, which the synchronizer
/// treats as authoritative; `remove_line`/`clear` return nothing and the
/// synchronizer refetches.
#[async_trait]
pub trait CartApi: Send + Sync {
    /// Current cart items + summary.
    async fn fetch_cart(&self) -> ClientResult<CartSnapshot>;

    /// Add a variant (or increment its existing line).
    async fn add_line(&self, req: &CartLineCreate) -> ClientResult<CartSnapshot>;

    /// Patch one line's quantity and/or notes.
    async fn update_line(&self, line_id: i64, req: &CartLineUpdate) -> ClientResult<CartSnapshot>;

    /// Delete one line.
    async fn remove_line(&self, line_id: i64) -> ClientResult<()>;

    /// Delete every line.
    async fn clear(&self) -> ClientResult<()>;
}

#[async_trait]
impl CartApi for HttpClient {
    async fn fetch_cart(&self) -> ClientResult<CartSnapshot> {
        self.get("/api/cart/").await
    }

    async fn add_line(&self, req: &CartLineCreate) -> ClientResult<CartSnapshot> {
        self.post("/api/cart/add", req).await
    }

    async fn update_line(&self, line_id: i64, req: &CartLineUpdate) -> ClientResult<CartSnapshot> {
        self.patch(&format!("/api/cart/{line_id}"), req).await
    }

    async fn remove_line(&self, line_id: i64) -> ClientResult<()> {
        self.delete(&format!("/api/cart/{line_id}")).await
    }

    async fn clear(&self) -> ClientResult<()> {
        self.delete("/api/cart/").await
    }
}
