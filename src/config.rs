//! Flow configuration and provider endpoint presets
//!
//! [`FlowConfig`] carries everything the engine needs for one provider:
//! client identity, endpoint URLs, requested scopes, and the
//! confidential-client policy. It is immutable for the engine's lifetime
//! and injected at construction -- there is no ambient global configuration.
//!
//! [`ProviderEndpoints`] presets map a tenant domain to the concrete
//! endpoint set for a few common hosted providers. They are static lookup
//! tables, not protocol logic; any provider works by filling the endpoints
//! manually.

use chrono::Duration;

/// Default lifetime for the persisted `state` and `code_verifier`.
///
/// Long enough to survive the redirect round-trip and a page reload or two,
/// short enough that an abandoned flow's parameters cannot be replayed much
/// later. A policy choice, not a protocol requirement.
pub const DEFAULT_PARAMETER_TTL_SECS: i64 = 600;

// ---------------------------------------------------------------------------
// ProviderEndpoints
// ---------------------------------------------------------------------------

/// The endpoint set for one OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    /// Authorization endpoint the user agent is redirected to.
    pub authorization_endpoint: String,
    /// Token endpoint used for both code exchange and refresh.
    pub token_endpoint: String,
    /// User-info endpoint queried with a bearer token.
    pub user_endpoint: String,
    /// Logout endpoint, when the provider has one.
    pub logout_endpoint: Option<String>,
}

impl ProviderEndpoints {
    /// Auth0 endpoints for a tenant domain.
    ///
    /// # Examples
    ///
    /// ```
    /// let endpoints = authflow::config::ProviderEndpoints::auth0("tenant.us.auth0.com");
    /// assert_eq!(
    ///     endpoints.authorization_endpoint,
    ///     "https://tenant.us.auth0.com/authorize"
    /// );
    /// ```
    pub fn auth0(domain: &str) -> Self {
        Self {
            authorization_endpoint: format!("https://{domain}/authorize"),
            token_endpoint: format!("https://{domain}/oauth/token"),
            user_endpoint: format!("https://{domain}/userinfo"),
            logout_endpoint: Some(format!("https://{domain}/v2/logout")),
        }
    }

    /// Clerk endpoints (fixed host).
    pub fn clerk() -> Self {
        Self {
            authorization_endpoint: "https://clerk.com/oauth/authorize".to_string(),
            token_endpoint: "https://clerk.com/oauth/token".to_string(),
            user_endpoint: "https://clerk.com/oauth/userinfo".to_string(),
            logout_endpoint: None,
        }
    }

    /// Kinde endpoints for a tenant domain.
    pub fn kinde(domain: &str) -> Self {
        Self {
            authorization_endpoint: format!("https://{domain}/oauth2/auth"),
            token_endpoint: format!("https://{domain}/oauth2/token"),
            user_endpoint: format!("https://{domain}/oauth2/user_profile"),
            logout_endpoint: Some(format!("https://{domain}/logout")),
        }
    }
}

// ---------------------------------------------------------------------------
// FlowConfig
// ---------------------------------------------------------------------------

/// Configuration for one authorization flow.
///
/// # Confidential clients
///
/// A pure-PKCE public client must never transmit a `client_secret`; some
/// providers nevertheless require one alongside PKCE. The secret is stored
/// with [`with_client_secret`](Self::with_client_secret) but only
/// transmitted after an explicit opt-in via
/// [`confidential`](Self::confidential) -- the two knobs are deliberately
/// separate so a configured secret cannot leak into token requests by
/// accident.
///
/// # Examples
///
/// ```
/// use authflow::config::{FlowConfig, ProviderEndpoints};
///
/// let config = FlowConfig::new(
///     "my-client-id",
///     "http://localhost:5500/login.html",
///     ProviderEndpoints::auth0("tenant.us.auth0.com"),
/// )
/// .with_scope(["openid", "profile", "email", "offline_access"])
/// .with_provider("AUTH0");
///
/// assert_eq!(config.scope.len(), 4);
/// assert!(!config.confidential);
/// ```
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// OAuth client identifier.
    pub client_id: String,

    /// Client secret, transmitted only when [`confidential`](Self::confidential)
    /// has been set.
    pub client_secret: Option<String>,

    /// Redirect URI registered with the provider.
    pub redirect_uri: String,

    /// Authorization endpoint URL.
    pub authorization_endpoint: String,

    /// Token endpoint URL.
    pub token_endpoint: String,

    /// User-info endpoint URL.
    pub user_endpoint: String,

    /// Logout endpoint URL, when the provider has one.
    pub logout_endpoint: Option<String>,

    /// Requested scopes, space-joined on the wire.
    pub scope: Vec<String>,

    /// Provider label, for logging only. No behavioral branching.
    pub provider: String,

    /// Whether this is a confidential client that transmits `client_secret`
    /// in token requests. Defaults to `false` (public PKCE client).
    pub confidential: bool,

    /// Lifetime of the persisted `state`/`code_verifier` parameters.
    pub parameter_ttl: Duration,
}

impl FlowConfig {
    /// Creates a public-client configuration with empty scope.
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        endpoints: ProviderEndpoints,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: redirect_uri.into(),
            authorization_endpoint: endpoints.authorization_endpoint,
            token_endpoint: endpoints.token_endpoint,
            user_endpoint: endpoints.user_endpoint,
            logout_endpoint: endpoints.logout_endpoint,
            scope: Vec::new(),
            provider: String::new(),
            confidential: false,
            parameter_ttl: Duration::seconds(DEFAULT_PARAMETER_TTL_SECS),
        }
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the provider label.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    /// Stores a client secret. The secret is not transmitted unless
    /// [`confidential`](Self::confidential) is also called.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Opts in to confidential-client behavior: `client_secret` is included
    /// in code-exchange and refresh requests.
    #[must_use]
    pub fn confidential(mut self) -> Self {
        self.confidential = true;
        self
    }

    /// Overrides the security-parameter lifetime.
    #[must_use]
    pub fn with_parameter_ttl(mut self, ttl: Duration) -> Self {
        self.parameter_ttl = ttl;
        self
    }

    /// The configured scopes joined with spaces, as sent on the wire.
    pub fn scope_string(&self) -> String {
        self.scope.join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
