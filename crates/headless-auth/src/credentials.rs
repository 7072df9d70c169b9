//! Credential persistence
//!
//! Writes the three-field file librespot-based downloaders read:
//! `{"username", "credentials": base64(access_token), "type"}`. Only the
//! access token survives a save; refresh token and lifetime are dropped
//! because the consumer has no place for them.
//!
//! Loading also accepts the legacy layout, where a whole
//! `{"username", "credentials"}` object is base64-wrapped under a single
//! `credentials` key.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{CREDENTIAL_TYPE, DEFAULT_EXPIRES_IN, UNKNOWN_USERNAME};
use crate::error::{Error, Result};

/// Account credentials produced by a code exchange or read from disk.
///
/// Immutable once built; a new exchange yields a new value.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    access_token: Secret<String>,
    refresh_token: Option<Secret<String>>,
    /// Seconds until `access_token` expires, as reported at issue time
    expires_in: u64,
}

/// Token-free view of [`Credentials`] for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub username: String,
    pub has_refresh_token: bool,
    pub expires_in: u64,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            username: username.into(),
            access_token: Secret::new(access_token.into()),
            refresh_token: refresh_token.map(Secret::new),
            expires_in,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn access_token(&self) -> &str {
        self.access_token.expose_str()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(Secret::expose_str)
    }

    pub fn expires_in(&self) -> u64 {
        self.expires_in
    }

    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            username: self.username.clone(),
            has_refresh_token: self.refresh_token.is_some(),
            expires_in: self.expires_in,
        }
    }
}

/// On-disk record in the current layout. Field order is the file's order.
#[derive(Serialize)]
struct StoredCredential<'a> {
    username: &'a str,
    credentials: String,
    #[serde(rename = "type")]
    credential_type: &'static str,
}

/// Inner object of the legacy layout
#[derive(Deserialize)]
struct LegacyCredential {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    credentials: Option<String>,
}

/// Save credentials to `path`, creating parent directories and replacing
/// any existing file.
pub async fn save(credentials: &Credentials, path: &Path) -> Result<()> {
    let record = StoredCredential {
        username: credentials.username(),
        credentials: STANDARD.encode(credentials.access_token()),
        credential_type: CREDENTIAL_TYPE,
    };
    let json = serde_json::to_string(&record)
        .map_err(|e| Error::Format(format!("serializing credentials: {e}")))?;

    let dir = parent_dir(path);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating {}: {e}", dir.display())))?;

    write_atomic(path, dir, json.as_bytes()).await?;
    debug!(path = %path.display(), username = credentials.username(), "saved credentials");
    Ok(())
}

/// Load credentials from `path` in either the current or the legacy layout.
///
/// Loaded credentials never carry a refresh token and report the default
/// lifetime, since the file does not record either.
pub async fn load(path: &Path) -> Result<Credentials> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading {}: {e}", path.display())))?;
    let credentials = parse(&contents)?;
    debug!(path = %path.display(), username = credentials.username(), "loaded credentials");
    Ok(credentials)
}

/// Parse the contents of a credential file.
pub fn parse(contents: &str) -> Result<Credentials> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| Error::Format(format!("not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::Format("expected a JSON object".into()))?;

    let has = |key: &str| object.contains_key(key);

    if has("username") && has("credentials") && has("type") {
        let username = string_field(object, "username")?;
        let encoded = string_field(object, "credentials")?;
        let access_token = String::from_utf8(decode_base64(encoded)?)
            .map_err(|e| Error::Format(format!("decoded token is not UTF-8: {e}")))?;
        return Ok(Credentials::new(username, access_token, None, DEFAULT_EXPIRES_IN));
    }

    if has("credentials") && !has("username") {
        let wrapped = decode_base64(string_field(object, "credentials")?)?;
        let legacy: LegacyCredential = serde_json::from_slice(&wrapped)
            .map_err(|e| Error::Format(format!("legacy payload is not a JSON object: {e}")))?;
        return Ok(Credentials::new(
            legacy.username.unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()),
            legacy.credentials.unwrap_or_default(),
            None,
            DEFAULT_EXPIRES_IN,
        ));
    }

    Err(Error::Format(
        "file matches neither the current nor the legacy layout".into(),
    ))
}

fn string_field<'a>(
    object: &'a serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<&'a str> {
    object
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::Format(format!("`{key}` must be a string")))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Format(format!("`credentials` is not valid base64: {e}")))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Write to a temp file beside `path`, then rename over it, so readers never
/// see a half-written file. The file holds a bearer token: mode 0600 on unix.
async fn write_atomic(path: &Path, dir: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io(format!("{} has no file name", path.display())))?;
    let tmp_path = dir.join(format!(
        ".{}.tmp.{}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(Error::Io(format!("replacing {}: {e}", path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials::new("user42", "BQD-access", Some("AQ-refresh".into()), 1800)
    }

    #[tokio::test]
    async fn save_then_load_keeps_username_and_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("credentials.json");

        save(&sample(), &path).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded.username(), "user42");
        assert_eq!(loaded.access_token(), "BQD-access");
        // Lossy: the file has no room for these
        assert_eq!(loaded.refresh_token(), None);
        assert_eq!(loaded.expires_in(), DEFAULT_EXPIRES_IN);
    }

    #[tokio::test]
    async fn saved_file_has_exactly_three_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        save(&Credentials::new("user42", "AT1", None, 3600), &path)
            .await
            .unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            contents,
            r#"{"username":"user42","credentials":"QVQx","type":"AUTHENTICATION_SPOTIFY_TOKEN"}"#
        );
    }

    #[tokio::test]
    async fn save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, "{\"stale\": true, \"padding\": \"xxxxxxxxxxxxxxxxxxxxxxxx\"}")
            .await
            .unwrap();

        save(&sample(), &path).await.unwrap();
        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.access_token(), "BQD-access");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temp file left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn legacy_layout_is_unwrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let inner = STANDARD.encode(r#"{"username":"alice","credentials":"tok123"}"#);
        tokio::fs::write(&path, format!(r#"{{"credentials": "{inner}"}}"#))
            .await
            .unwrap();

        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.username(), "alice");
        assert_eq!(loaded.access_token(), "tok123");
        assert_eq!(loaded.refresh_token(), None);
    }

    #[test]
    fn legacy_layout_defaults_missing_fields() {
        let inner = STANDARD.encode("{}");
        let loaded = parse(&format!(r#"{{"credentials":"{inner}"}}"#)).unwrap();
        assert_eq!(loaded.username(), UNKNOWN_USERNAME);
        assert_eq!(loaded.access_token(), "");
    }

    #[test]
    fn current_layout_ignores_type_value() {
        let loaded = parse(r#"{"username":"bob","credentials":"QVQx","type":"OTHER"}"#).unwrap();
        assert_eq!(loaded.username(), "bob");
        assert_eq!(loaded.access_token(), "AT1");
    }

    #[test]
    fn unknown_shape_is_format_error() {
        let err = parse(r#"{"foo": "bar"}"#).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "got {err:?}");
    }

    #[test]
    fn username_without_type_is_format_error() {
        let err = parse(r#"{"username":"bob","credentials":"QVQx"}"#).unwrap_err();
        assert!(matches!(err, Error::Format(_)), "got {err:?}");
    }

    #[test]
    fn undecodable_content_is_format_error() {
        for contents in [
            r#"{"username":"bob","credentials":"not base64!","type":"AUTHENTICATION_SPOTIFY_TOKEN"}"#,
            r#"{"credentials":"bm90IGpzb24="}"#,
            r#"{"username":"bob","credentials":42,"type":"AUTHENTICATION_SPOTIFY_TOKEN"}"#,
            r#"["credentials"]"#,
            "not json",
        ] {
            let err = parse(contents).unwrap_err();
            assert!(matches!(err, Error::Format(_)), "{contents}: got {err:?}");
        }
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.json")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        save(&sample(), &path).await.unwrap();

        let mode = tokio::fs::metadata(&path).await.unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let debug = format!("{:?}", sample());
        assert!(debug.contains("user42"));
        assert!(!debug.contains("BQD-access"), "leaked: {debug}");
        assert!(!debug.contains("AQ-refresh"), "leaked: {debug}");
    }

    #[test]
    fn summary_omits_token_values() {
        let summary = sample().summary();
        assert_eq!(
            summary,
            CredentialSummary {
                username: "user42".into(),
                has_refresh_token: true,
                expires_in: 1800,
            }
        );
    }
}
