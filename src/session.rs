//! Session token lifecycle on top of the flow engine
//!
//! [`SessionManager`] coordinates the engine and the long-lived token keys
//! in the parameter store into a single façade. Callers interact with it
//! through four operations:
//!
//! - [`SessionManager::complete_login`] -- handle the authorization callback
//!   and persist the resulting tokens.
//! - [`SessionManager::ensure_access_token`] -- return a valid access token,
//!   refreshing through the stored refresh token when the cached one has
//!   expired.
//! - [`SessionManager::clear_tokens`] -- explicit local logout cleanup.
//! - [`SessionManager::flow`] / [`SessionManager::flow_mut`] -- direct
//!   access to the underlying engine for the remaining operations
//!   (authorization URL, identity fetch, provider logout).
//!
//! The manager never re-initiates the authorization flow on its own; when
//! neither a valid access token nor a refresh token is available it fails
//! with [`AuthFlowError::MissingCredentials`] and the caller decides whether
//! to start over.

use chrono::Duration;
use tracing::debug;

use crate::error::{AuthFlowError, Result};
use crate::flow::{CallbackParams, OAuthFlow, TokenSet};
use crate::store::{ParameterStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Lifetime applied to a persisted refresh token.
///
/// Providers rarely report refresh-token expiry, so a conservative fixed
/// window is used; a refresh rejected by the provider surfaces as
/// [`AuthFlowError::Refresh`] regardless.
const REFRESH_TOKEN_TTL_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Persists and resolves session tokens around an [`OAuthFlow`].
///
/// Tokens live in the same [`ParameterStore`] as the flow parameters, under
/// the reserved `access_token` / `refresh_token` keys. The access token's
/// TTL comes from the provider's `expires_in`; the refresh token gets a
/// fixed conservative window.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authflow::config::{FlowConfig, ProviderEndpoints};
/// use authflow::flow::OAuthFlow;
/// use authflow::session::SessionManager;
/// use authflow::store::MemoryStore;
///
/// # fn main() -> authflow::error::Result<()> {
/// let config = FlowConfig::new(
///     "my-client-id",
///     "http://localhost:5500/login.html",
///     ProviderEndpoints::auth0("tenant.us.auth0.com"),
/// );
/// let flow = OAuthFlow::initialize(
///     config,
///     MemoryStore::new(),
///     Arc::new(reqwest::Client::new()),
/// )?;
/// let session = SessionManager::new(flow);
///
/// // Nothing persisted yet.
/// assert_eq!(session.access_token()?, None);
/// # Ok(())
/// # }
/// ```
pub struct SessionManager<S: ParameterStore> {
    flow: OAuthFlow<S>,
}

impl<S: ParameterStore> SessionManager<S> {
    /// Wraps an initialized flow engine.
    pub fn new(flow: OAuthFlow<S>) -> Self {
        Self { flow }
    }

    /// The underlying flow engine.
    pub fn flow(&self) -> &OAuthFlow<S> {
        &self.flow
    }

    /// Mutable access to the underlying flow engine.
    pub fn flow_mut(&mut self) -> &mut OAuthFlow<S> {
        &mut self.flow
    }

    /// Handles the authorization callback and persists the returned tokens.
    ///
    /// Equivalent to [`OAuthFlow::handle_callback`] followed by
    /// [`save_tokens`](Self::save_tokens); the engine's unconditional
    /// flow-parameter cleanup applies either way.
    ///
    /// # Errors
    ///
    /// Propagates the engine's callback errors unchanged, plus
    /// [`AuthFlowError::Storage`] when persisting the tokens fails.
    pub async fn complete_login(&mut self, params: &CallbackParams) -> Result<TokenSet> {
        let tokens = self.flow.handle_callback(params).await?;
        self.save_tokens(&tokens)?;
        Ok(tokens)
    }

    /// Persists an access token (TTL from `expires_in`) and, when present,
    /// its refresh token.
    ///
    /// A zero `expires_in` falls back to the configured parameter TTL rather
    /// than persisting an immediately-expired entry.
    pub fn save_tokens(&mut self, tokens: &TokenSet) -> Result<()> {
        let access_ttl = if tokens.expires_in > 0 {
            Duration::seconds(i64::try_from(tokens.expires_in).unwrap_or(i64::MAX))
        } else {
            self.flow.config().parameter_ttl
        };

        let store = self.flow.store_mut();
        store.set(ACCESS_TOKEN_KEY, &tokens.access_token, access_ttl)?;
        if let Some(refresh) = &tokens.refresh_token {
            store.set(
                REFRESH_TOKEN_KEY,
                refresh,
                Duration::days(REFRESH_TOKEN_TTL_DAYS),
            )?;
        }

        debug!("persisted session tokens");
        Ok(())
    }

    /// Returns the stored access token when present and not expired.
    pub fn access_token(&self) -> Result<Option<String>> {
        self.unexpired(ACCESS_TOKEN_KEY)
    }

    /// Returns the stored refresh token when present and not expired.
    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.unexpired(REFRESH_TOKEN_KEY)
    }

    /// Returns a valid access token, refreshing when necessary.
    ///
    /// Resolution order:
    ///
    /// 1. A cached, unexpired access token is returned as-is.
    /// 2. Otherwise a stored refresh token is exchanged via
    ///    [`OAuthFlow::refresh_access_token`]; the new token set is
    ///    persisted and its access token returned.
    /// 3. With neither available, fails with
    ///    [`AuthFlowError::MissingCredentials`] -- re-running the
    ///    authorization flow is a caller decision.
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::Refresh`] when the provider rejects the refresh,
    /// [`AuthFlowError::MissingCredentials`] when no token material exists.
    pub async fn ensure_access_token(&mut self) -> Result<String> {
        if let Some(token) = self.access_token()? {
            return Ok(token);
        }

        let refresh = self.refresh_token()?.ok_or_else(|| {
            AuthFlowError::MissingCredentials(
                "no valid access token and no refresh token stored".to_string(),
            )
        })?;

        debug!("cached access token expired; refreshing");
        let tokens = self.flow.refresh_access_token(&refresh).await?;
        self.save_tokens(&tokens)?;
        Ok(tokens.access_token)
    }

    /// Removes the persisted access and refresh tokens.
    ///
    /// Local cleanup is deliberately separate from
    /// [`OAuthFlow::terminate_session`]: a failed provider logout must not
    /// silently destroy local session state, and vice versa.
    pub fn clear_tokens(&mut self) -> Result<()> {
        let store = self.flow.store_mut();
        store.remove(ACCESS_TOKEN_KEY)?;
        store.remove(REFRESH_TOKEN_KEY)
    }

    fn unexpired(&self, key: &str) -> Result<Option<String>> {
        let store = self.flow.store();
        if store.is_expired(key)? {
            return Ok(None);
        }
        store.get(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
