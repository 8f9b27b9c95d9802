//! Auth session and token persistence
//!
//! Tracks the current user across restarts. Tokens and the cached profile
//! live in the local store under fixed keys; the live session state is an
//! in-memory cache on top. The cart and favorites surfaces branch their
//! authenticated/guest behavior off the presence of this session's user.

use tokio::sync::RwLock;

use shared::auth::{Profile, TokenPair};

use crate::storage::{LocalStore, StorageError, TOKENS_KEY, USER_KEY};
use crate::{ClientError, ClientResult, HttpClient};

/// Persisted access/refresh pair under the fixed `tokens` key.
#[derive(Debug, Clone)]
pub struct TokenStore {
    store: LocalStore,
}

impl TokenStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Load the persisted token pair, if any.
    pub fn load(&self) -> Result<Option<TokenPair>, StorageError> {
        self.store.get(TOKENS_KEY)
    }

    /// Persist a token pair.
    pub fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.store.put(TOKENS_KEY, tokens)
    }

    /// Delete the persisted token pair.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(TOKENS_KEY)
    }
}

/// Parse the expiry (Unix seconds) out of a JWT without verifying it.
///
/// Used to skip a doomed profile fetch when the stored access token is
/// already past its `exp` claim.
pub fn parse_jwt_exp(token: &str) -> Option<u64> {
    // JWT layout: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes).ok()?;
    payload.get("exp")?.as_u64()
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Current-user session: login/register/logout plus restore-on-startup.
#[derive(Debug)]
pub struct AuthSession {
    http: HttpClient,
    tokens: TokenStore,
    store: LocalStore,
    user: RwLock<Option<Profile>>,
}

impl AuthSession {
    /// Create a session over the given transport and local store. No I/O
    /// happens here; call [`AuthSession::restore`] to pick up a persisted
    /// login.
    pub fn new(http: HttpClient, store: LocalStore) -> Self {
        Self {
            http,
            tokens: TokenStore::new(store.clone()),
            store,
            user: RwLock::new(None),
        }
    }

    /// Prime the in-memory session from the locally cached profile without
    /// a network round-trip, so the UI can show the signed-in state
    /// immediately at startup. Call [`AuthSession::restore`] afterwards to
    /// revalidate against the server.
    pub async fn load_cached_user(&self) -> Result<Option<Profile>, StorageError> {
        if let Some(pair) = self.tokens.load()? {
            self.http.set_token(Some(pair.access_token)).await;
        }

        let cached: Option<Profile> = self.store.get(USER_KEY)?;
        *self.user.write().await = cached.clone();
        Ok(cached)
    }

    /// Restore a persisted session at startup.
    ///
    /// Loads stored tokens, re-fetches the profile, and returns the user.
    /// An expired or rejected token clears local auth state and yields
    /// `Ok(None)` (guest). Transient network failures propagate without
    /// touching the stored tokens so a retry can still restore the session.
    pub async fn restore(&self) -> ClientResult<Option<Profile>> {
        let Some(pair) = self.tokens.load()? else {
            return Ok(None);
        };

        if let Some(exp) = parse_jwt_exp(&pair.access_token) {
            if now_secs() >= exp {
                tracing::info!("Stored access token expired, falling back to guest");
                self.clear_local_auth().await?;
                return Ok(None);
            }
        }

        self.http.set_token(Some(pair.access_token.clone())).await;

        match self.http.me().await {
            Ok(profile) => {
                self.store.put(USER_KEY, &profile)?;
                *self.user.write().await = Some(profile.clone());
                tracing::info!(user_id = profile.id, "Session restored from stored tokens");
                Ok(Some(profile))
            }
            Err(ClientError::Unauthorized | ClientError::Forbidden(_)) => {
                tracing::info!("Stored tokens rejected, falling back to guest");
                self.clear_local_auth().await?;
                Ok(None)
            }
            Err(e) => {
                // Leave tokens in place; the session may still be valid.
                self.http.set_token(None).await;
                Err(e)
            }
        }
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Profile> {
        let auth = self.http.login(email, password).await.map_err(|e| match e {
            ClientError::Unauthorized => ClientError::rejected(401, "Неверный email или пароль"),
            ClientError::NotFound(_) => ClientError::rejected(404, "Пользователь не найден"),
            other => other,
        })?;

        self.install(auth).await
    }

    /// Register a new account and log in as it.
    pub async fn register(&self, email: &str, password: &str) -> ClientResult<Profile> {
        let auth = self.http.register(email, password).await.map_err(|e| match e {
            ClientError::Rejected { status: 400, .. } => {
                ClientError::rejected(400, "Пользователь с таким email уже существует")
            }
            other => other,
        })?;

        self.install(auth).await
    }

    async fn install(&self, auth: shared::auth::AuthTokens) -> ClientResult<Profile> {
        self.tokens.save(&auth.token_pair())?;
        self.http.set_token(Some(auth.access_token.clone())).await;
        self.store.put(USER_KEY, &auth.user)?;
        *self.user.write().await = Some(auth.user.clone());

        tracing::info!(user_id = auth.user.id, "Logged in");
        Ok(auth.user)
    }

    /// Log out. Local auth state is cleared unconditionally; a failed
    /// server-side invalidation is logged and swallowed.
    pub async fn logout(&self) -> ClientResult<()> {
        if let Ok(Some(pair)) = self.tokens.load() {
            if let Err(e) = self.http.logout(&pair.refresh_token).await {
                tracing::warn!("Server-side logout failed: {}", e);
            }
        }

        self.clear_local_auth().await?;
        tracing::info!("Logged out");
        Ok(())
    }

    async fn clear_local_auth(&self) -> Result<(), StorageError> {
        self.tokens.clear()?;
        self.store.remove(USER_KEY)?;
        self.http.set_token(None).await;
        *self.user.write().await = None;
        Ok(())
    }

    /// The current user, if authenticated.
    pub async fn current_user(&self) -> Option<Profile> {
        self.user.read().await.clone()
    }

    /// Whether a user is logged in.
    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Whether the current user has the admin role.
    pub async fn is_admin(&self) -> bool {
        self.user.read().await.as_ref().is_some_and(|u| u.is_admin)
    }

    /// The transport this session authenticates.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}
