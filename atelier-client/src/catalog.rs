//! Catalog API surface
//!
//! Item browsing, favorites, view history, and comments. These are thin
//! typed wrappers over the transport; favorites and history require an
//! authenticated session and surface the auth error to guests.

use serde::Deserialize;

use shared::catalog::{Comment, CommentCreate, Item, ItemQuery};

use crate::{ClientResult, HttpClient};

#[derive(Debug, Deserialize)]
struct FavoriteToggled {
    favorited: bool,
}

#[derive(Debug, Deserialize)]
struct CommentLiked {
    liked: bool,
}

impl HttpClient {
    // ========== Items ==========

    /// List catalog items matching the query filters.
    pub async fn list_items(&self, query: &ItemQuery) -> ClientResult<Vec<Item>> {
        self.get_with_query("/api/items/", query).await
    }

    /// Fetch one item with its variants.
    pub async fn get_item(&self, id: i64) -> ClientResult<Item> {
        self.get(&format!("/api/items/{id}")).await
    }

    /// Trending items.
    pub async fn trending_items(&self, limit: Option<u32>) -> ClientResult<Vec<Item>> {
        self.get_with_query("/api/items/trending", &[("limit", limit)])
            .await
    }

    /// Items similar to the given one.
    pub async fn similar_items(&self, id: i64, limit: Option<u32>) -> ClientResult<Vec<Item>> {
        self.get_with_query(&format!("/api/items/{id}/similar"), &[("limit", limit)])
            .await
    }

    /// Items belonging to a named collection.
    pub async fn items_by_collection(&self, name: &str) -> ClientResult<Vec<Item>> {
        self.get_with_query("/api/items/collections", &[("name", name)])
            .await
    }

    // ========== Favorites ==========

    /// Toggle an item's favorite flag; returns the resulting state.
    pub async fn toggle_favorite(&self, item_id: i64) -> ClientResult<bool> {
        let resp: FavoriteToggled = self
            .post_empty(&format!("/api/items/{item_id}/favorite"))
            .await?;
        Ok(resp.favorited)
    }

    /// The current user's favorite items.
    pub async fn list_favorites(&self) -> ClientResult<Vec<Item>> {
        self.get("/api/items/favorites").await
    }

    // ========== View history ==========

    /// Recently viewed items, most recent first.
    pub async fn view_history(&self, limit: u32) -> ClientResult<Vec<Item>> {
        self.get_with_query("/api/items/history", &[("limit", limit)])
            .await
    }

    /// Clear the view history.
    pub async fn clear_view_history(&self) -> ClientResult<()> {
        self.delete("/api/items/history").await
    }

    // ========== Comments ==========

    /// Comments on an item, oldest first.
    pub async fn list_comments(&self, item_id: i64) -> ClientResult<Vec<Comment>> {
        self.get(&format!("/api/items/{item_id}/comments")).await
    }

    /// Post a comment (optionally with a rating).
    pub async fn add_comment(
        &self,
        item_id: i64,
        comment: &CommentCreate,
    ) -> ClientResult<Comment> {
        self.post(&format!("/api/items/{item_id}/comments"), comment)
            .await
    }

    /// Toggle a like on a comment; returns the resulting state.
    pub async fn like_comment(&self, item_id: i64, comment_id: i64) -> ClientResult<bool> {
        let resp: CommentLiked = self
            .post_empty(&format!("/api/items/{item_id}/comments/{comment_id}/like"))
            .await?;
        Ok(resp.liked)
    }

    /// Delete a comment (author or admin only).
    pub async fn delete_comment(&self, item_id: i64, comment_id: i64) -> ClientResult<()> {
        self.delete(&format!("/api/items/{item_id}/comments/{comment_id}"))
            .await
    }
}
