//! OAuth 2.0 authorization code flow with PKCE
//!
//! This module implements the client side of the authorization code flow
//! with PKCE (RFC 7636) for a public client with no backend component.
//!
//! # Flow overview
//!
//! 1. [`OAuthFlow::initialize`] resolves the `state` and `code_verifier`
//!    from the [`ParameterStore`], generating and persisting fresh values
//!    when none survive. Persistence happens here, before any redirect, so
//!    the callback can be validated in a fresh process.
//! 2. [`OAuthFlow::build_authorization_url`] composes the redirect target.
//!    Navigation itself is the caller's responsibility.
//! 3. The provider redirects back with `code` and `state`;
//!    [`OAuthFlow::handle_callback`] validates the state, exchanges the code
//!    for tokens, and erases the consumed parameters from the store whether
//!    the exchange succeeded or not (authorization codes are single-use, so
//!    a stale verifier/state pair must never be retried).
//! 4. [`OAuthFlow::refresh_access_token`] and
//!    [`OAuthFlow::fetch_user_identity`] cover the rest of the token
//!    lifecycle.
//!
//! The engine never retries network calls and never navigates; all failures
//! propagate as typed [`AuthFlowError`] values.
//!
//! # References
//!
//! - RFC 6749 OAuth 2.0 <https://www.rfc-editor.org/rfc/rfc6749>
//! - RFC 7636 PKCE <https://www.rfc-editor.org/rfc/rfc7636>

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::FlowConfig;
use crate::error::{AuthFlowError, Result};
use crate::pkce;
use crate::store::{ParameterStore, CODE_VERIFIER_KEY, STATE_KEY};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Query parameters delivered to the redirect URI by the provider.
///
/// All fields are optional at the parse layer; [`OAuthFlow::handle_callback`]
/// enforces which combinations are valid. A present `error` field means the
/// provider rejected the authorization request (for example the user denied
/// consent), which is a distinct condition from a state mismatch.
///
/// # Examples
///
/// ```
/// use authflow::flow::CallbackParams;
///
/// let params = CallbackParams::from_query("code=abc&state=xyz");
/// assert_eq!(params.code.as_deref(), Some("abc"));
/// assert_eq!(params.state.as_deref(), Some("xyz"));
/// assert!(params.error.is_none());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,

    /// State nonce echoed back by the provider.
    pub state: Option<String>,

    /// Error code when the provider rejected the request
    /// (e.g. `access_denied`).
    pub error: Option<String>,

    /// Optional human-readable error detail accompanying `error`.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parses callback parameters from a raw URL query string.
    ///
    /// Values are percent-decoded. Keys other than `code`, `state`, `error`,
    /// and `error_description` are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut params = parse_query_string(query);
        Self {
            code: params.remove("code"),
            state: params.remove("state"),
            error: params.remove("error"),
            error_description: params.remove("error_description"),
        }
    }
}

/// Tokens returned by the token endpoint for both grants.
///
/// Field names follow the RFC 6749 token response, so the struct
/// deserializes directly from the provider's JSON body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// The access token string.
    pub access_token: String,

    /// Refresh token; not all grants return one.
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Access token lifetime in seconds. Zero when the provider omits it.
    #[serde(default)]
    pub expires_in: u64,

    /// Token type, typically `"Bearer"`.
    pub token_type: String,

    /// Space-joined granted scopes; may be narrower than requested.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Minimal identity projection from the user-info endpoint.
///
/// Only `name` and `email` are kept; every other provider-specific claim is
/// discarded during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

// ---------------------------------------------------------------------------
// OAuthFlow
// ---------------------------------------------------------------------------

/// Drives the authorization code flow with PKCE for one provider.
///
/// The engine owns its [`ParameterStore`] and holds an immutable
/// [`FlowConfig`] plus a shared HTTP client, all injected at construction.
/// One instance covers one authorization attempt end to end; the persisted
/// parameters make the instance reconstructible after the redirect
/// round-trip (a second [`initialize`](Self::initialize) against the same
/// store resolves the same `state` and `code_verifier`).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use authflow::config::{FlowConfig, ProviderEndpoints};
/// use authflow::flow::OAuthFlow;
/// use authflow::store::MemoryStore;
///
/// # fn main() -> authflow::error::Result<()> {
/// let config = FlowConfig::new(
///     "my-client-id",
///     "http://localhost:5500/login.html",
///     ProviderEndpoints::auth0("tenant.us.auth0.com"),
/// )
/// .with_scope(["openid", "profile"]);
///
/// let flow = OAuthFlow::initialize(
///     config,
///     MemoryStore::new(),
///     Arc::new(reqwest::Client::new()),
/// )?;
///
/// let url = flow.build_authorization_url(None)?;
/// assert!(url.contains("code_challenge_method=S256"));
/// # Ok(())
/// # }
/// ```
pub struct OAuthFlow<S: ParameterStore> {
    http: Arc<reqwest::Client>,
    config: FlowConfig,
    store: S,
    state: String,
    code_verifier: String,
}

impl<S: ParameterStore> OAuthFlow<S> {
    /// Creates an engine, resolving `state` and `code_verifier`.
    ///
    /// When the store holds a non-expired value under the reserved key, it
    /// is reused instead of regenerated -- this is what keeps the parameters
    /// stable across a page reload in the middle of the redirect. Otherwise
    /// a fresh value is generated and persisted with the configured TTL.
    ///
    /// Writes to the store; performs no network calls.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Storage`] when the store cannot be read or
    /// written.
    pub fn initialize(config: FlowConfig, mut store: S, http: Arc<reqwest::Client>) -> Result<Self> {
        let ttl = config.parameter_ttl;
        let state = resolve_parameter(&mut store, STATE_KEY, ttl, pkce::generate_state)?;
        let code_verifier =
            resolve_parameter(&mut store, CODE_VERIFIER_KEY, ttl, pkce::generate_verifier)?;

        Ok(Self {
            http,
            config,
            store,
            state,
            code_verifier,
        })
    }

    /// The `state` nonce bound to this flow instance.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// The PKCE code verifier bound to this flow instance.
    pub fn code_verifier(&self) -> &str {
        &self.code_verifier
    }

    /// The configuration this engine was constructed with.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Shared access to the underlying parameter store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying parameter store, for callers that
    /// keep session tokens in the same store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Builds the authorization URL the user agent should be redirected to.
    ///
    /// Query parameters: `response_type=code`, `client_id`, `redirect_uri`,
    /// `scope` (space-joined; `override_scopes` replaces the configured list
    /// when given -- the override is trusted, the caller validates it against
    /// its own allow-list), `state`, `code_challenge`, and
    /// `code_challenge_method=S256`. All values are form-url-encoded.
    ///
    /// The function composes the URL only; it never navigates. The embedded
    /// `state` and `code_verifier` were durably persisted by
    /// [`initialize`](Self::initialize), so redirecting immediately after
    /// this call is safe.
    ///
    /// # Errors
    ///
    /// Returns [`AuthFlowError::Config`] when the configured authorization
    /// endpoint is not a valid URL.
    pub fn build_authorization_url(&self, override_scopes: Option<&[String]>) -> Result<String> {
        let scope = match override_scopes {
            Some(scopes) => scopes.join(" "),
            None => self.config.scope_string(),
        };
        let code_challenge = pkce::compute_challenge(&self.code_verifier);

        let mut url = Url::parse(&self.config.authorization_endpoint).map_err(|e| {
            AuthFlowError::Config(format!("invalid authorization endpoint URL: {e}"))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &scope)
            .append_pair("state", &self.state)
            .append_pair("code_challenge", &code_challenge)
            .append_pair("code_challenge_method", "S256");

        debug!(provider = %self.config.provider, "built authorization URL");
        Ok(url.to_string())
    }

    /// Validates the authorization callback and exchanges the code for
    /// tokens.
    ///
    /// Validation happens before any network I/O:
    ///
    /// - A present `error` parameter fails with
    ///   [`AuthFlowError::AuthorizationDenied`].
    /// - A missing or mismatching `state` fails with
    ///   [`AuthFlowError::InvalidState`].
    ///
    /// On success the token endpoint is POSTed a form-encoded body with
    /// `grant_type=authorization_code`, `code`, `redirect_uri`, `client_id`,
    /// and `code_verifier`. `client_secret` is added only for confidential
    /// clients (see [`FlowConfig::confidential`]).
    ///
    /// The persisted `state` and `code_verifier` are consumed by this call:
    /// they are erased from the store whether the exchange succeeds or
    /// fails, so a poisoned verifier is never replayed against a provider
    /// that has already invalidated the single-use authorization code.
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::TokenRequest`] on non-success status, transport
    /// failure, or a malformed response body, preserving the underlying
    /// error message for diagnostics.
    pub async fn handle_callback(&mut self, params: &CallbackParams) -> Result<TokenSet> {
        debug!(provider = %self.config.provider, "handling authorization callback");

        let outcome = self.validate_and_exchange(params).await;

        // Unconditional cleanup: the parameters are single-use.
        if let Err(e) = self.clear_flow_parameters() {
            warn!("failed to clear flow parameters after callback: {e}");
        }

        outcome
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// POSTs `grant_type=refresh_token`, `refresh_token`, and `client_id`
    /// (plus `client_secret` under the confidential-client policy) to the
    /// token endpoint. Does not consult or mutate `state`/`code_verifier`.
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::Refresh`] on non-success status, transport failure,
    /// or a malformed response body.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenSet> {
        debug!(provider = %self.config.provider, "refreshing access token");

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &self.config.client_id),
        ];
        if self.config.confidential {
            if let Some(secret) = self.config.client_secret.as_deref() {
                form.push(("client_secret", secret));
            }
        }

        let resp = self
            .http
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthFlowError::Refresh(format!("refresh request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthFlowError::Refresh(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        resp.json::<TokenSet>()
            .await
            .map_err(|e| AuthFlowError::Refresh(format!("failed to parse refresh response: {e}")))
    }

    /// Fetches the user's identity from the user-info endpoint.
    ///
    /// GETs the configured `user_endpoint` with an
    /// `Authorization: Bearer <access_token>` header and projects the
    /// response down to [`UserIdentity`].
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::UserInfo`] on non-success status, transport failure,
    /// or a response missing the `name`/`email` claims.
    pub async fn fetch_user_identity(&self, access_token: &str) -> Result<UserIdentity> {
        debug!(provider = %self.config.provider, "fetching user identity");

        let resp = self
            .http
            .get(&self.config.user_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthFlowError::UserInfo(format!("user info request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthFlowError::UserInfo(format!(
                "user endpoint returned {status}: {body}"
            )));
        }

        resp.json::<UserIdentity>()
            .await
            .map_err(|e| AuthFlowError::UserInfo(format!("failed to parse user info: {e}")))
    }

    /// Terminates the provider-side session.
    ///
    /// GETs the logout endpoint with `client_id` and a `returnTo` target.
    /// The engine does not clear the store here -- local token cleanup must
    /// stay explicit so a failed logout call cannot silently destroy the
    /// session state.
    ///
    /// # Errors
    ///
    /// [`AuthFlowError::Logout`] when no logout endpoint is configured, on
    /// non-success status, or on transport failure.
    pub async fn terminate_session(&self, return_to: &str) -> Result<()> {
        debug!(provider = %self.config.provider, "terminating provider session");

        let endpoint = self
            .config
            .logout_endpoint
            .as_deref()
            .ok_or_else(|| AuthFlowError::Logout("no logout endpoint configured".to_string()))?;

        let mut url = Url::parse(endpoint)
            .map_err(|e| AuthFlowError::Logout(format!("invalid logout endpoint URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("returnTo", return_to);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AuthFlowError::Logout(format!("logout request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(AuthFlowError::Logout(format!(
                "logout endpoint returned {status}"
            )));
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    /// Callback validation and token exchange, separated from
    /// [`handle_callback`](Self::handle_callback) so cleanup can wrap it.
    async fn validate_and_exchange(&self, params: &CallbackParams) -> Result<TokenSet> {
        if let Some(error) = &params.error {
            let detail = match &params.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error.clone(),
            };
            return Err(AuthFlowError::AuthorizationDenied(detail));
        }

        if params.state.as_deref() != Some(self.state.as_str()) {
            return Err(AuthFlowError::InvalidState);
        }

        let code = params.code.as_deref().ok_or_else(|| {
            AuthFlowError::TokenRequest("authorization code missing from callback".to_string())
        })?;

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("client_id", &self.config.client_id),
            ("code_verifier", &self.code_verifier),
        ];
        if self.config.confidential {
            if let Some(secret) = self.config.client_secret.as_deref() {
                form.push(("client_secret", secret));
            }
        }

        let resp = self
            .http
            .post(&self.config.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthFlowError::TokenRequest(format!("token exchange failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthFlowError::TokenRequest(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        resp.json::<TokenSet>().await.map_err(|e| {
            AuthFlowError::TokenRequest(format!("failed to parse token response: {e}"))
        })
    }

    /// Erases the consumed `state` and `code_verifier` from the store.
    fn clear_flow_parameters(&mut self) -> Result<()> {
        self.store.remove(STATE_KEY)?;
        self.store.remove(CODE_VERIFIER_KEY)
    }
}

// ---------------------------------------------------------------------------
// Utility functions
// ---------------------------------------------------------------------------

/// Resolves one security parameter: reuse the persisted value when present
/// and not expired, otherwise generate and persist a fresh one.
fn resolve_parameter<S: ParameterStore>(
    store: &mut S,
    key: &str,
    ttl: chrono::Duration,
    generate: fn() -> String,
) -> Result<String> {
    if !store.is_expired(key)? {
        if let Some(value) = store.get(key)? {
            debug!(key, "reusing persisted flow parameter");
            return Ok(value);
        }
    }

    let value = generate();
    store.set(key, &value, ttl)?;
    debug!(key, "generated fresh flow parameter");
    Ok(value)
}

/// Parses a URL query string into a key-value map.
///
/// Values are percent-decoded. Duplicate keys are overwritten by the last
/// occurrence.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in query.split('&') {
        let mut iter = pair.splitn(2, '=');
        let key = iter.next().unwrap_or("").to_string();
        let value = iter.next().unwrap_or("").to_string();
        if !key.is_empty() {
            map.insert(key, percent_decode(&value));
        }
    }
    map
}

/// Performs minimal percent-decoding of a URL query parameter value.
///
/// Converts `+` to space and `%XX` sequences to the corresponding byte.
fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'+' {
            out.push(' ');
            i += 1;
        } else if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(hex) = std::str::from_utf8(&bytes[i + 1..i + 3]) {
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte as char);
                    i += 3;
                    continue;
                }
            }
            out.push(bytes[i] as char);
            i += 1;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpoints;
    use crate::store::MemoryStore;

    fn test_config() -> FlowConfig {
        FlowConfig::new(
            "test-client-id",
            "http://localhost:5500/login.html",
            ProviderEndpoints::auth0("tenant.us.auth0.com"),
        )
        .with_scope(["openid", "profile", "email"])
        .with_provider("AUTH0")
    }

    fn test_flow() -> OAuthFlow<MemoryStore> {
        OAuthFlow::initialize(
            test_config(),
            MemoryStore::new(),
            Arc::new(reqwest::Client::new()),
        )
        .expect("initialize must succeed with a memory store")
    }

    // -----------------------------------------------------------------------
    // parse_query_string / percent_decode
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_query_string_with_code_and_state() {
        let map = parse_query_string("code=abc123&state=xyz789");
        assert_eq!(map.get("code"), Some(&"abc123".to_string()));
        assert_eq!(map.get("state"), Some(&"xyz789".to_string()));
    }

    #[test]
    fn test_parse_query_string_empty_returns_empty_map() {
        assert!(parse_query_string("").is_empty());
    }

    #[test]
    fn test_parse_query_string_decodes_percent_encoding() {
        let map = parse_query_string("scope=openid%20profile");
        assert_eq!(map.get("scope"), Some(&"openid profile".to_string()));
    }

    #[test]
    fn test_percent_decode_converts_plus_to_space() {
        assert_eq!(percent_decode("hello+world"), "hello world");
    }

    #[test]
    fn test_percent_decode_incomplete_percent_passes_through() {
        let result = percent_decode("%zz");
        assert!(!result.is_empty());
    }

    // -----------------------------------------------------------------------
    // CallbackParams::from_query
    // -----------------------------------------------------------------------

    #[test]
    fn test_callback_params_from_query() {
        let params = CallbackParams::from_query("code=abc&state=xyz");
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(params.error.is_none());
    }

    #[test]
    fn test_callback_params_from_query_with_error() {
        let params =
            CallbackParams::from_query("error=access_denied&error_description=user+declined");
        assert_eq!(params.error.as_deref(), Some("access_denied"));
        assert_eq!(params.error_description.as_deref(), Some("user declined"));
        assert!(params.code.is_none());
    }

    // -----------------------------------------------------------------------
    // initialize: parameter resolution
    // -----------------------------------------------------------------------

    #[test]
    fn test_initialize_persists_parameters() {
        let flow = test_flow();
        let state_in_store = flow.store().get(STATE_KEY).unwrap();
        let verifier_in_store = flow.store().get(CODE_VERIFIER_KEY).unwrap();
        assert_eq!(state_in_store.as_deref(), Some(flow.state()));
        assert_eq!(verifier_in_store.as_deref(), Some(flow.code_verifier()));
    }

    #[test]
    fn test_initialize_reuses_unexpired_parameters() {
        let http = Arc::new(reqwest::Client::new());
        let first = OAuthFlow::initialize(test_config(), MemoryStore::new(), Arc::clone(&http))
            .expect("first initialize");
        let state = first.state().to_string();
        let verifier = first.code_verifier().to_string();

        // Simulate a page reload before the redirect completes: a second
        // engine constructed over the same store must resolve the same pair.
        let store = {
            let mut this = first;
            std::mem::take(this.store_mut())
        };
        let second =
            OAuthFlow::initialize(test_config(), store, http).expect("second initialize");

        assert_eq!(second.state(), state);
        assert_eq!(second.code_verifier(), verifier);
    }

    #[test]
    fn test_initialize_regenerates_expired_parameters() {
        let http = Arc::new(reqwest::Client::new());
        let config = test_config().with_parameter_ttl(chrono::Duration::seconds(-1));
        let first = OAuthFlow::initialize(config, MemoryStore::new(), Arc::clone(&http))
            .expect("first initialize");
        let state = first.state().to_string();

        let store = {
            let mut this = first;
            std::mem::take(this.store_mut())
        };
        let second =
            OAuthFlow::initialize(test_config(), store, http).expect("second initialize");

        assert_ne!(
            second.state(),
            state,
            "an expired state must be regenerated, not reused"
        );
    }

    #[test]
    fn test_generated_verifier_is_rfc_compliant() {
        let flow = test_flow();
        assert_eq!(flow.code_verifier().len(), 128);
        assert!(flow
            .code_verifier()
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')));
    }

    // -----------------------------------------------------------------------
    // build_authorization_url
    // -----------------------------------------------------------------------

    #[test]
    fn test_authorization_url_roundtrips_through_query_parsing() {
        let flow = test_flow();
        let url = Url::parse(&flow.build_authorization_url(None).unwrap()).unwrap();
        let query: HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(
            query.get("client_id").map(String::as_str),
            Some("test-client-id")
        );
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("http://localhost:5500/login.html")
        );
        assert_eq!(
            query.get("scope").map(String::as_str),
            Some("openid profile email")
        );
        assert_eq!(query.get("state").map(String::as_str), Some(flow.state()));
        assert_eq!(
            query.get("code_challenge").map(String::as_str),
            Some(pkce::compute_challenge(flow.code_verifier()).as_str())
        );
        assert_eq!(
            query.get("code_challenge_method").map(String::as_str),
            Some("S256")
        );
    }

    #[test]
    fn test_authorization_url_with_override_scopes() {
        let flow = test_flow();
        let override_scopes = vec!["openid".to_string(), "admin".to_string()];
        let url =
            Url::parse(&flow.build_authorization_url(Some(&override_scopes)).unwrap()).unwrap();

        let scope = url
            .query_pairs()
            .find(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned());
        assert_eq!(scope.as_deref(), Some("openid admin"));
    }

    #[test]
    fn test_authorization_url_embeds_challenge_not_verifier() {
        let flow = test_flow();
        let url = flow.build_authorization_url(None).unwrap();
        assert!(
            !url.contains(flow.code_verifier()),
            "the verifier must never appear in the authorization URL"
        );
    }

    #[test]
    fn test_authorization_url_rejects_malformed_endpoint() {
        let mut config = test_config();
        config.authorization_endpoint = "not a url".to_string();
        let flow = OAuthFlow::initialize(
            config,
            MemoryStore::new(),
            Arc::new(reqwest::Client::new()),
        )
        .unwrap();

        let result = flow.build_authorization_url(None);
        assert!(matches!(result, Err(AuthFlowError::Config(_))));
    }

    // -----------------------------------------------------------------------
    // handle_callback: local validation (no network)
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_callback_with_mismatched_state_fails_without_network() {
        // The configured token endpoint is unroutable; if validation tried
        // the network the test would error differently (or hang).
        let mut config = test_config();
        config.token_endpoint = "http://127.0.0.1:1/token".to_string();
        let mut flow = OAuthFlow::initialize(
            config,
            MemoryStore::new(),
            Arc::new(reqwest::Client::new()),
        )
        .unwrap();

        let params = CallbackParams {
            code: Some("some_code".to_string()),
            state: Some("wrong_state".to_string()),
            ..Default::default()
        };

        let err = flow.handle_callback(&params).await.unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState));
        assert_eq!(err.code(), "invalid_state");
    }

    #[tokio::test]
    async fn test_callback_with_missing_state_is_invalid_state() {
        let mut flow = test_flow();
        let params = CallbackParams {
            code: Some("some_code".to_string()),
            ..Default::default()
        };

        let err = flow.handle_callback(&params).await.unwrap_err();
        assert!(matches!(err, AuthFlowError::InvalidState));
    }

    #[tokio::test]
    async fn test_callback_with_provider_error_is_authorization_denied() {
        let mut flow = test_flow();
        let params = CallbackParams {
            error: Some("access_denied".to_string()),
            error_description: Some("user declined consent".to_string()),
            ..Default::default()
        };

        let err = flow.handle_callback(&params).await.unwrap_err();
        match err {
            AuthFlowError::AuthorizationDenied(detail) => {
                assert!(detail.contains("access_denied"));
                assert!(detail.contains("user declined consent"));
            }
            other => panic!("expected AuthorizationDenied, got: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_callback_still_clears_parameters() {
        let mut flow = test_flow();
        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some("mismatch".to_string()),
            ..Default::default()
        };

        let _ = flow.handle_callback(&params).await;

        assert_eq!(flow.store().get(STATE_KEY).unwrap(), None);
        assert_eq!(flow.store().get(CODE_VERIFIER_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_callback_missing_code_after_state_match() {
        let mut flow = test_flow();
        let params = CallbackParams {
            state: Some(flow.state().to_string()),
            ..Default::default()
        };

        let err = flow.handle_callback(&params).await.unwrap_err();
        match err {
            AuthFlowError::TokenRequest(msg) => {
                assert!(msg.contains("authorization code missing"))
            }
            other => panic!("expected TokenRequest, got: {other}"),
        }
    }

    // -----------------------------------------------------------------------
    // TokenSet deserialization
    // -----------------------------------------------------------------------

    #[test]
    fn test_token_set_parses_full_response() {
        let token: TokenSet = serde_json::from_str(
            r#"{"access_token":"abc","refresh_token":"r1","expires_in":3600,
                "token_type":"Bearer","scope":"openid profile"}"#,
        )
        .unwrap();
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.refresh_token.as_deref(), Some("r1"));
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scope.as_deref(), Some("openid profile"));
    }

    #[test]
    fn test_token_set_parses_minimal_response() {
        let token: TokenSet =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"Bearer"}"#).unwrap();
        assert!(token.refresh_token.is_none());
        assert_eq!(token.expires_in, 0);
        assert!(token.scope.is_none());
    }

    #[test]
    fn test_user_identity_discards_extra_claims() {
        let identity: UserIdentity = serde_json::from_str(
            r#"{"name":"Ada","email":"ada@example.com","sub":"auth0|123","picture":"x"}"#,
        )
        .unwrap();
        assert_eq!(identity.name, "Ada");
        assert_eq!(identity.email, "ada@example.com");
    }
}
