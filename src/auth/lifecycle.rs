//! Token validity, refresh, and login reconciliation.

use std::sync::Arc;

use super::device::CLIENT_ID;
use super::error::AuthError;
use super::jwt;
use super::projector::CredentialProjector;
use super::server::token_url;
use super::store::TokenStore;
use super::transport::AuthTransport;
use super::types::{StoredToken, TokenResponse, TokenStatus};

/// Decides whether the stored credential is usable and refreshes it when not.
///
/// Every successful login or refresh is written back to the store and then
/// projected into external credential files on a best-effort basis.
pub struct TokenLifecycle {
    store: TokenStore,
    transport: Arc<dyn AuthTransport>,
    projector: CredentialProjector,
}

impl TokenLifecycle {
    pub fn new(
        store: TokenStore,
        transport: Arc<dyn AuthTransport>,
        projector: CredentialProjector,
    ) -> Self {
        Self {
            store,
            transport,
            projector,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn transport(&self) -> &dyn AuthTransport {
        self.transport.as_ref()
    }

    pub fn projector(&self) -> &CredentialProjector {
        &self.projector
    }

    /// Return a stored token that is valid now, refreshing it if expired.
    pub async fn ensure_valid(&self) -> Result<StoredToken, AuthError> {
        self.refresh(false).await
    }

    /// Refresh the stored token. With `force == false` an unexpired token is
    /// returned untouched without any network call.
    pub async fn refresh(&self, force: bool) -> Result<StoredToken, AuthError> {
        let stored = self.load()?;
        if !force && !jwt::is_expired(&stored.access_token, stored.expires_in) {
            return Ok(stored);
        }
        if !stored.has_refresh_token() {
            return Err(AuthError::RefreshUnavailable);
        }

        tracing::info!(server = %stored.server, force, "refreshing access token");
        let response = self.exchange_refresh_token(&stored).await?;
        let refreshed = merge_refreshed(&stored, &response)?;
        self.store.write(&refreshed.server, &refreshed)?;
        self.projector.sync_existing(&refreshed.server, &refreshed);
        Ok(refreshed)
    }

    /// Persist a device-flow result as the active credential for `server`,
    /// replacing whatever identity was stored before.
    pub fn complete_login(
        &self,
        server: &str,
        response: &TokenResponse,
    ) -> Result<StoredToken, AuthError> {
        let token = token_from_login(server, response)?;
        self.store.write(server, &token)?;
        self.projector.sync_after_login(server, &token);
        Ok(token)
    }

    /// Summarize the stored credential without touching the network.
    pub fn status(&self) -> Result<TokenStatus, AuthError> {
        let stored = self.load()?;
        let access_claims = jwt::decode(&stored.access_token).ok();
        let id_claims = jwt::decode(&stored.id_token).ok();
        Ok(TokenStatus {
            expires_at_unix: access_claims
                .as_ref()
                .and_then(|claims| claims.expires_at(stored.expires_in)),
            expired: jwt::is_expired(&stored.access_token, stored.expires_in),
            username: id_claims
                .as_ref()
                .and_then(|claims| claims.preferred_username())
                .map(str::to_string),
            has_refresh_token: stored.has_refresh_token(),
            server: stored.server,
            name: stored.name,
            email: stored.email,
        })
    }

    fn load(&self) -> Result<StoredToken, AuthError> {
        match self.store.read() {
            Ok(token) if token.server.trim().is_empty() => {
                tracing::warn!(path = %self.store.path().display(), "stored token has no server");
                Err(AuthError::NotAuthenticated)
            }
            Ok(token) => Ok(token),
            Err(AuthError::NoStoredToken) => Err(AuthError::NotAuthenticated),
            Err(err) => {
                tracing::warn!(error = %err, "stored token unreadable");
                Err(AuthError::NotAuthenticated)
            }
        }
    }

    async fn exchange_refresh_token(
        &self,
        stored: &StoredToken,
    ) -> Result<TokenResponse, AuthError> {
        let form = [
            ("client_id", CLIENT_ID),
            ("grant_type", "refresh_token"),
            ("refresh_token", stored.refresh_token.as_str()),
        ];
        let reply = self
            .transport
            .post_form(&token_url(&stored.server), &form)
            .await
            .map_err(|err| AuthError::RefreshFailed(err.to_string()))?;
        let parsed = serde_json::from_str::<TokenResponse>(&reply.body).ok();
        if let Some(message) = parsed.as_ref().and_then(TokenResponse::error_message) {
            return Err(AuthError::RefreshFailed(message));
        }
        if !reply.is_success() {
            return Err(AuthError::RefreshFailed(format!(
                "status {}: {}",
                reply.status,
                reply.body.trim()
            )));
        }
        let response = parsed.ok_or_else(|| {
            AuthError::RefreshFailed("token response was not valid JSON".to_string())
        })?;
        if response.access_token().is_none() {
            return Err(AuthError::RefreshFailed(
                "token response did not include access_token".to_string(),
            ));
        }
        Ok(response)
    }
}

/// Apply a refresh response to the stored record. `server` never changes;
/// name and email only change when the new ID token carries them.
fn merge_refreshed(stored: &StoredToken, response: &TokenResponse) -> Result<StoredToken, AuthError> {
    let access_token = response.access_token().ok_or_else(|| {
        AuthError::RefreshFailed("token response did not include access_token".to_string())
    })?;
    let mut next = stored.clone();
    next.access_token = access_token.to_string();
    if let Some(refresh_token) = response.refresh_token() {
        next.refresh_token = refresh_token.to_string();
    }
    if let Some(token_type) = response.token_type.as_deref().filter(|t| !t.is_empty()) {
        next.token_type = token_type.to_string();
    }
    if let Some(expires_in) = response.expires_in {
        next.expires_in = expires_in;
    }
    if let Some(id_token) = response.id_token() {
        next.id_token = id_token.to_string();
        if let Ok(claims) = jwt::decode(id_token) {
            if let Some(name) = claims.name() {
                next.name = name.to_string();
            }
            if let Some(email) = claims.email() {
                next.email = email.to_string();
            }
        }
    }
    Ok(next)
}

/// Build a fresh record from a device-flow token response.
fn token_from_login(server: &str, response: &TokenResponse) -> Result<StoredToken, AuthError> {
    let access_token = response.access_token().ok_or_else(|| {
        AuthError::AuthorizationFailed("token response did not include access_token".to_string())
    })?;
    let id_token = response.id_token().unwrap_or_default();
    let claims = jwt::decode(id_token).unwrap_or_default();
    Ok(StoredToken {
        server: server.to_string(),
        access_token: access_token.to_string(),
        refresh_token: response.refresh_token().unwrap_or_default().to_string(),
        token_type: response.token_type.clone().unwrap_or_default(),
        expires_in: response.expires_in.unwrap_or_default(),
        id_token: id_token.to_string(),
        name: claims.name().unwrap_or_default().to_string(),
        email: claims.email().unwrap_or_default().to_string(),
    })
}
