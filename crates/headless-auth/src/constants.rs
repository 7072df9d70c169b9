//! Spotify OAuth constants
//!
//! Public endpoints and the fixed scope set requested during authorization.
//! Client IDs are supplied by the caller; none is baked in here.

use std::time::Duration;

/// Authorization endpoint the end user is redirected to
pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";

/// Token endpoint for authorization code exchange
pub const TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Identity endpoint used to resolve the account username after exchange
pub const USER_ENDPOINT: &str = "https://api.spotify.com/v1/me";

/// Permission scopes requested by the downloader. Joined with spaces in the
/// authorization URL.
pub const SCOPES: &[&str] = &[
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-library-read",
    "user-follow-read",
    "playlist-read-private",
    "playlist-read-collaborative",
];

/// Lifetime assumed when the token response omits `expires_in`
pub const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Bound on each HTTP call of the exchange
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `type` marker of the stored credential file. librespot-based tools read
/// `credentials` as base64 only when this exact value is present.
pub const CREDENTIAL_TYPE: &str = "AUTHENTICATION_SPOTIFY_TOKEN";

/// Username recorded when neither the identity response nor a legacy file
/// carries one
pub const UNKNOWN_USERNAME: &str = "unknown";
