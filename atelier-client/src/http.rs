//! HTTP client for network-based API calls
//!
//! Thin JSON transport over reqwest: bearer-token injection, query/body
//! encoding, and the status-code to [`ClientError`] mapping every surface
//! (auth, cart, catalog) funnels through.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use shared::auth::{AuthTokens, Credentials, Profile, RefreshTokenIn};

use crate::{ClientConfig, ClientError, ClientResult};

/// HTTP client for making network requests to the catalog API.
///
/// Cloning is cheap and clones share the same token slot, so a login
/// performed through the auth session is visible to every surface built
/// from the same client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the bearer token used for subsequent requests.
    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    /// Current bearer token, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn auth_header(&self) -> Option<String> {
        self.token.read().await.as_ref().map(|t| format!("Bearer {t}"))
    }

    // ========== Generic verbs ==========

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a GET request with serialized query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + Sync>(
        &self,
        path: &str,
        query: &Q,
    ) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path)).query(query);
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path));
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a form-encoded POST request.
    pub async fn post_form<T: DeserializeOwned, F: Serialize + Sync>(
        &self,
        path: &str,
        form: &F,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a PATCH request with JSON body.
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.patch(self.url(path)).json(body);
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a DELETE request with no response body.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let mut request = self.client.delete(self.url(path));
        if let Some(auth) = self.auth_header().await {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }

        let response = request.send().await?;
        Self::handle_empty(response).await
    }

    // ========== Response handling ==========

    /// Map a non-success status to the typed error taxonomy.
    fn status_error(status: StatusCode, text: String) -> ClientError {
        let message = Self::extract_error_message(&text);
        match status {
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
            StatusCode::FORBIDDEN => ClientError::Forbidden(message),
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            s if s.is_client_error() => ClientError::Rejected {
                status: s.as_u16(),
                message,
            },
            s => ClientError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }

    /// Pull a human message out of a JSON error body (`detail` per the
    /// API contract, `message` as fallback), else use the raw text.
    fn extract_error_message(text: &str) -> String {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(text) {
            if let Some(detail) = json.get("detail").and_then(|v| v.as_str()) {
                return detail.to_string();
            }
            if let Some(message) = json.get("message").and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
        text.to_string()
    }

    /// Handle an HTTP response with a JSON body.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, text));
        }

        response.json().await.map_err(Into::into)
    }

    /// Handle an HTTP response whose body is irrelevant.
    async fn handle_empty(response: reqwest::Response) -> ClientResult<()> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, text));
        }

        Ok(())
    }

    // ========== Auth API ==========

    /// Exchange credentials for a token pair. The token endpoint is
    /// form-encoded and names the email field `username`.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthTokens> {
        let form = [("username", email), ("password", password)];
        self.post_form("/api/auth/token", &form).await
    }

    /// Register a new account; returns tokens plus the created user.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<AuthTokens> {
        let request = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.post("/api/auth/register", &request).await
    }

    /// Invalidate the refresh token server-side.
    pub async fn logout(&self, refresh_token: &str) -> ClientResult<()> {
        let request = RefreshTokenIn {
            refresh_token: refresh_token.to_string(),
        };
        let _: serde_json::Value = self.post("/api/auth/logout", &request).await?;
        Ok(())
    }

    /// Get the current user's profile.
    pub async fn me(&self) -> ClientResult<Profile> {
        self.get("/api/me").await
    }

    /// Readiness probe.
    pub async fn ready(&self) -> ClientResult<serde_json::Value> {
        self.get("/api/health/ready").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        let err = HttpClient::status_error(StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(err, ClientError::Unauthorized));

        let err = HttpClient::status_error(StatusCode::CONFLICT, "{\"detail\":\"taken\"}".into());
        match err {
            ClientError::Rejected { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "taken");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }

        let err = HttpClient::status_error(StatusCode::BAD_GATEWAY, String::new());
        assert!(err.is_transient());
    }

    #[test]
    fn error_message_prefers_detail_field() {
        assert_eq!(
            HttpClient::extract_error_message("{\"detail\":\"Недостаточно товара\"}"),
            "Недостаточно товара"
        );
        assert_eq!(
            HttpClient::extract_error_message("{\"message\":\"nope\"}"),
            "nope"
        );
        assert_eq!(HttpClient::extract_error_message("plain text"), "plain text");
    }
}
