//! Token endpoint and identity lookups
//!
//! The exchange is two sequential calls: POST the authorization code to the
//! token endpoint, then GET the identity endpoint with the new bearer token
//! to learn which account it belongs to. Neither call is retried.

use serde::Deserialize;

use crate::constants::UNKNOWN_USERNAME;
use crate::error::{Error, Result};

/// Form fields of an `authorization_code` grant.
pub struct CodeGrant<'a> {
    pub code: &'a str,
    pub verifier: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
}

/// Successful token endpoint response.
///
/// `expires_in` is a delta in seconds; `None` when the service omits it.
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Deserialize)]
struct UserProfile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Exchange an authorization code for tokens.
///
/// The body is inspected before the status: the service reports OAuth
/// failures (`invalid_grant` and friends) as a 4xx with an `error` field, and
/// those surface as [`Error::Authentication`]. Any other non-2xx is a
/// transport failure.
pub async fn exchange_code(
    client: &reqwest::Client,
    endpoint: &str,
    grant: &CodeGrant<'_>,
) -> Result<TokenResponse> {
    let response = client
        .post(endpoint)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", grant.code),
            ("redirect_uri", grant.redirect_uri),
            ("client_id", grant.client_id),
            ("code_verifier", grant.verifier),
        ])
        .send()
        .await
        .map_err(|e| Error::Transport(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Transport(format!("reading token response: {e}")))?;

    let json: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
        Error::Transport(format!("token endpoint returned {status} with non-JSON body: {e}"))
    })?;

    if let Some(error) = json.get("error") {
        return Err(Error::Authentication(oauth_error_message(&json, error)));
    }

    if !status.is_success() {
        return Err(Error::Transport(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    serde_json::from_value(json)
        .map_err(|e| Error::MalformedResponse(format!("token response: {e}")))
}

/// Resolve the account name behind an access token.
///
/// Uses the profile `id`, falling back to `email`, then to `"unknown"`.
pub async fn fetch_username(
    client: &reqwest::Client,
    endpoint: &str,
    access_token: &str,
) -> Result<String> {
    let response = client
        .get(endpoint)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| Error::Transport(format!("identity request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Transport(format!(
            "identity endpoint returned {status}: {body}"
        )));
    }

    let profile = response
        .json::<UserProfile>()
        .await
        .map_err(|e| Error::Transport(format!("invalid identity response: {e}")))?;

    Ok(profile
        .id
        .or(profile.email)
        .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()))
}

/// `error_description` when the service sent one, else the raw `error` code.
fn oauth_error_message(body: &serde_json::Value, error: &serde_json::Value) -> String {
    if let Some(description) = body.get("error_description").and_then(|d| d.as_str()) {
        return description.to_owned();
    }
    match error {
        serde_json::Value::String(code) => code.clone(),
        other => other.to_string(),
    }
}
