//! Guest cart backend
//!
//! Cart lines for unauthenticated sessions live entirely client-side:
//! an in-memory line list loaded once from the local store and written
//! back synchronously on every mutation. No server record exists.

use chrono::Utc;

use shared::cart::{
    CartLineInput, CartSnapshot, MAX_LINE_QUANTITY, StoredCartLine,
};
use shared::util::snowflake_id;

use crate::storage::{CART_KEY, LocalStore, StorageError};

/// Local-store-backed cart for guest sessions.
#[derive(Debug)]
pub(crate) struct GuestCart {
    store: LocalStore,
    lines: Vec<StoredCartLine>,
}

impl GuestCart {
    /// Load persisted guest lines (once per session start).
    pub fn load(store: LocalStore) -> Result<Self, StorageError> {
        let lines = store.get(CART_KEY)?.unwrap_or_default();
        Ok(Self { store, lines })
    }

    fn persist(&self) -> Result<(), StorageError> {
        self.store.put(CART_KEY, &self.lines)
    }

    /// Materialize the current state with a locally estimated summary.
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot::from_lines(self.lines.iter().map(StoredCartLine::to_line).collect())
    }

    /// Stored lines, for adoption into a server cart.
    pub fn lines(&self) -> &[StoredCartLine] {
        &self.lines
    }

    /// Add a variant: increments the existing line (clamped to the cap)
    /// or creates a new one.
    pub fn add(
        &mut self,
        input: &CartLineInput,
        quantity: u32,
        notes: Option<String>,
    ) -> Result<CartSnapshot, StorageError> {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.variant_id == input.variant_id)
        {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
            if notes.is_some() {
                line.notes = notes;
            }
        } else {
            self.lines.push(StoredCartLine {
                id: snowflake_id(),
                variant_id: input.variant_id,
                name: input.name.clone(),
                price: input.price,
                quantity: quantity.min(MAX_LINE_QUANTITY),
                image_url: input.image_url.clone(),
                notes,
                added_at: Utc::now(),
            });
        }

        self.persist()?;
        Ok(self.snapshot())
    }

    /// Set a line's quantity. Zero removes the line; an unknown line id is
    /// a no-op.
    pub fn update_quantity(
        &mut self,
        line_id: i64,
        quantity: u32,
    ) -> Result<CartSnapshot, StorageError> {
        if quantity == 0 {
            return self.remove(line_id);
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.id == line_id) {
            line.quantity = quantity.min(MAX_LINE_QUANTITY);
            self.persist()?;
        }
        Ok(self.snapshot())
    }

    /// Replace a line's notes; an unknown line id is a no-op.
    pub fn update_notes(
        &mut self,
        line_id: i64,
        notes: Option<String>,
    ) -> Result<CartSnapshot, StorageError> {
        if let Some(line) = self.lines.iter_mut().find(|l| l.id == line_id) {
            line.notes = notes;
            self.persist()?;
        }
        Ok(self.snapshot())
    }

    /// Delete a line. Removing an absent line is a no-op, not an error.
    pub fn remove(&mut self, line_id: i64) -> Result<CartSnapshot, StorageError> {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        if self.lines.len() != before {
            self.persist()?;
        }
        Ok(self.snapshot())
    }

    /// Drop every line and reset the persisted document.
    pub fn clear(&mut self) -> Result<CartSnapshot, StorageError> {
        self.lines.clear();
        self.persist()?;
        Ok(self.snapshot())
    }
}
