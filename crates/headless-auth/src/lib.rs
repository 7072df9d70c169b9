//! Headless Spotify OAuth for zotify
//!
//! Runs the OAuth 2.0 authorization code flow with PKCE without a browser on
//! the server side, and persists the resulting token in the file format
//! librespot-based downloaders read.
//!
//! Flow:
//! 1. `OAuthClient::authorization_request()` returns the authorize URL and
//!    the PKCE verifier the caller must keep
//! 2. The end user authorizes; the caller receives `code` out of band
//! 3. `OAuthClient::exchange_code(code, verifier)` posts the code and looks
//!    up the account name, yielding `Credentials`
//! 4. `credentials::save()` writes the file; `credentials::load()` reads it
//!    back (current or legacy layout)

pub mod constants;
pub mod credentials;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod proxy;
pub mod token;

pub use constants::*;
pub use credentials::{CredentialSummary, Credentials};
pub use error::{Error, Result};
pub use flow::{
    AuthorizationRequest, Endpoints, HeadlessAuth, OAuthClient, OAuthConfig,
    exchange_code_for_credentials, generate_auth_url,
};
pub use pkce::{PkcePair, compute_challenge, generate_verifier};
pub use proxy::ProxySettings;
