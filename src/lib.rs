//! Authflow - OAuth 2.0 authorization-code flow with PKCE
//!
//! This library implements the client side of the OAuth 2.0 Authorization
//! Code flow with PKCE (RFC 7636) against hosted identity providers, with
//! durable storage for the flow's security parameters and session tokens.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `flow`: The flow engine -- authorization URL construction, callback
//!   handling, code exchange, token refresh, identity fetch, and logout
//! - `session`: Token lifecycle on top of the engine (persist, resolve,
//!   refresh-on-expiry)
//! - `store`: The [`ParameterStore`] trait and its in-memory and file-backed
//!   implementations
//! - `pkce`: State and code-verifier generation, S256 challenge computation
//! - `config`: Flow configuration and provider endpoint presets
//! - `error`: Error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authflow::{FlowConfig, MemoryStore, OAuthFlow, ProviderEndpoints};
//!
//! #[tokio::main]
//! async fn main() -> authflow::Result<()> {
//!     let config = FlowConfig::new(
//!         "my-client-id",
//!         "http://localhost:5500/login.html",
//!         ProviderEndpoints::auth0("tenant.us.auth0.com"),
//!     )
//!     .with_scope(["openid", "profile", "email", "offline_access"]);
//!
//!     let flow = OAuthFlow::initialize(
//!         config,
//!         MemoryStore::new(),
//!         Arc::new(reqwest::Client::new()),
//!     )?;
//!
//!     // Redirect the user agent here, then feed the callback query back
//!     // into `flow.handle_callback(..)`.
//!     let url = flow.build_authorization_url(None)?;
//!     println!("{url}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::{FlowConfig, ProviderEndpoints};
pub use error::{AuthFlowError, Result};
pub use flow::{CallbackParams, OAuthFlow, TokenSet, UserIdentity};
pub use session::SessionManager;
pub use store::{FileStore, MemoryStore, ParameterStore};
