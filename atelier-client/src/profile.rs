//! Profile API surface

use shared::auth::{Profile, ProfileUpdate};

use crate::{ClientResult, HttpClient};

impl HttpClient {
    /// Fetch the current user's full profile.
    pub async fn get_profile(&self) -> ClientResult<Profile> {
        self.get("/api/profile/").await
    }

    /// Apply a partial profile update; returns the updated profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Profile> {
        self.patch("/api/profile/", update).await
    }
}
