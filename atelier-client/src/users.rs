//! Admin user-management API surface
//!
//! Requires an admin session; non-admin callers receive the permission
//! error from the server.

use shared::catalog::{UserAccount, UserCreate, UserUpdate};

use crate::{ClientResult, HttpClient};

impl HttpClient {
    /// List all user accounts.
    pub async fn list_users(&self) -> ClientResult<Vec<UserAccount>> {
        self.get("/api/users/").await
    }

    /// Create a user account.
    pub async fn create_user(&self, user: &UserCreate) -> ClientResult<UserAccount> {
        self.post("/api/users/", user).await
    }

    /// Fetch one user account.
    pub async fn get_user(&self, id: i64) -> ClientResult<UserAccount> {
        self.get(&format!("/api/users/{id}")).await
    }

    /// Apply a partial update to a user account.
    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> ClientResult<UserAccount> {
        self.patch(&format!("/api/users/{id}"), update).await
    }

    /// Delete a user account.
    pub async fn delete_user(&self, id: i64) -> ClientResult<()> {
        self.delete(&format!("/api/users/{id}")).await
    }
}
