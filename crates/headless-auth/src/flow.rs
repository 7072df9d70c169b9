//! Authorization flow controller
//!
//! [`OAuthClient`] is the explicit form: it returns the verifier alongside the
//! authorization URL and takes it back at exchange time. [`HeadlessAuth`]
//! wraps it for callers that prefer the client to remember the last verifier.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::constants::{
    AUTHORIZE_ENDPOINT, DEFAULT_EXPIRES_IN, HTTP_TIMEOUT, SCOPES, TOKEN_ENDPOINT, USER_ENDPOINT,
};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::pkce;
use crate::proxy::ProxySettings;
use crate::token::{self, CodeGrant};

/// Service endpoints. Defaults to the public Spotify accounts service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub user: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: AUTHORIZE_ENDPOINT.to_owned(),
            token: TOKEN_ENDPOINT.to_owned(),
            user: USER_ENDPOINT.to_owned(),
        }
    }
}

impl Endpoints {
    /// Endpoints rooted at `base`, using the service's path layout.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize: format!("{base}/authorize"),
            token: format!("{base}/api/token"),
            user: format!("{base}/v1/me"),
        }
    }
}

/// Everything needed to run one authorization flow.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub proxy: ProxySettings,
    pub endpoints: Endpoints,
    /// Applied to each HTTP call separately
    pub timeout: Duration,
}

impl OAuthConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            proxy: ProxySettings::none(),
            endpoints: Endpoints::default(),
            timeout: HTTP_TIMEOUT,
        }
    }

    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Configuration("client_id is required".into()));
        }
        if self.redirect_uri.trim().is_empty() {
            return Err(Error::Configuration("redirect_uri is required".into()));
        }
        Ok(())
    }
}

/// Authorization URL plus the verifier that must accompany the code exchange.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub verifier: String,
}

/// Build the authorize URL for `challenge`.
///
/// Query values are form-encoded, so the space-joined scope list comes out
/// with `+` separators.
pub fn build_authorization_url(config: &OAuthConfig, challenge: &str) -> Result<String> {
    let scope = SCOPES.join(" ");
    let url = Url::parse_with_params(
        &config.endpoints.authorize,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_challenge_method", "S256"),
            ("code_challenge", challenge),
            ("scope", scope.as_str()),
        ],
    )
    .map_err(|e| Error::Configuration(format!("invalid authorize endpoint: {e}")))?;
    Ok(url.into())
}

/// PKCE authorization code client.
///
/// Holds no per-attempt state, so one instance may serve any number of
/// authorization attempts.
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
}

impl OAuthClient {
    /// Validate `config` and build the HTTP client with its proxy and timeout.
    pub fn new(config: OAuthConfig) -> Result<Self> {
        config.validate()?;
        let builder = reqwest::Client::builder().timeout(config.timeout);
        let http = config
            .proxy
            .apply(builder)?
            .build()
            .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))?;
        debug!(proxied = !config.proxy.is_direct(), "oauth client ready");
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Start an attempt: fresh PKCE pair, authorize URL carrying its challenge.
    pub fn authorization_request(&self) -> Result<AuthorizationRequest> {
        let pair = pkce::generate();
        let url = build_authorization_url(&self.config, &pair.challenge)?;
        debug!("built authorization url");
        Ok(AuthorizationRequest {
            url,
            verifier: pair.verifier,
        })
    }

    /// Trade an authorization code for credentials.
    ///
    /// Posts the code to the token endpoint, then looks up the account behind
    /// the issued token. The second call only runs if the first succeeded.
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<Credentials> {
        if verifier.is_empty() {
            return Err(Error::Configuration("code verifier is required".into()));
        }

        debug!("exchanging authorization code");
        let grant = CodeGrant {
            code,
            verifier,
            client_id: &self.config.client_id,
            redirect_uri: &self.config.redirect_uri,
        };
        let token = token::exchange_code(&self.http, &self.config.endpoints.token, &grant).await?;

        let username =
            token::fetch_username(&self.http, &self.config.endpoints.user, &token.access_token)
                .await?;
        debug!(username = %username, "resolved account identity");

        Ok(Credentials::new(
            username,
            token.access_token,
            token.refresh_token,
            token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        ))
    }
}

/// Stateful wrapper over [`OAuthClient`] that remembers the verifier of the
/// most recent authorization URL.
///
/// Each call to [`HeadlessAuth::authorization_url`] replaces the remembered
/// verifier. Not meant to be shared between parallel attempts.
pub struct HeadlessAuth {
    client: OAuthClient,
    verifier: Option<String>,
}

impl HeadlessAuth {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        Ok(Self {
            client: OAuthClient::new(config)?,
            verifier: None,
        })
    }

    pub fn authorization_url(&mut self) -> Result<String> {
        let request = self.client.authorization_request()?;
        self.verifier = Some(request.verifier);
        Ok(request.url)
    }

    /// Verifier of the last generated URL. The caller must keep it if the
    /// exchange happens elsewhere.
    pub fn code_verifier(&self) -> Option<&str> {
        self.verifier.as_deref()
    }

    /// Exchange `code` using `verifier`, or the remembered one when `None`
    /// or empty.
    pub async fn exchange_code(&self, code: &str, verifier: Option<&str>) -> Result<Credentials> {
        let verifier = verifier
            .filter(|v| !v.is_empty())
            .or(self.verifier.as_deref())
            .ok_or_else(|| {
                Error::Configuration(
                    "code verifier is required; pass one or generate an authorization URL first"
                        .into(),
                )
            })?;
        self.client.exchange_code(code, verifier).await
    }
}

/// Produce `(authorization_url, code_verifier)` for a client.
///
/// Proxy settings come from the environment, as in [`ProxySettings::from_env`].
pub fn generate_auth_url(client_id: &str, redirect_uri: &str) -> Result<(String, String)> {
    let config =
        OAuthConfig::new(client_id, redirect_uri).with_proxy(ProxySettings::from_env());
    let request = OAuthClient::new(config)?.authorization_request()?;
    Ok((request.url, request.verifier))
}

/// Complete a flow started with [`generate_auth_url`].
pub async fn exchange_code_for_credentials(
    client_id: &str,
    redirect_uri: &str,
    code: &str,
    code_verifier: &str,
) -> Result<Credentials> {
    let config =
        OAuthConfig::new(client_id, redirect_uri).with_proxy(ProxySettings::from_env());
    OAuthClient::new(config)?
        .exchange_code(code, code_verifier)
        .await
}
