//! zotify-auth
//!
//! Headless login helper for zotify:
//! 1. `--generate-auth-url` prints the authorize URL and its code verifier
//! 2. `--auth-code` + `--code-verifier` exchange the code and save the
//!    credential file zotify reads
//! 3. `--show-credentials` inspects a saved file

mod config;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use headless_auth::{Credentials, OAuthClient, OAuthConfig, ProxySettings, credentials};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "zotify-auth", version, about = "Headless Spotify OAuth for zotify")]
struct Cli {
    /// TOML config file (defaults to ./zotify-auth.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spotify application client ID
    #[arg(long, env = "ZOTIFY_CLIENT_ID")]
    client_id: Option<String>,

    /// Redirect URI registered for the client
    #[arg(long, visible_alias = "redirect-uri", env = "ZOTIFY_REDIRECT_URI")]
    oauth_redirect_uri: Option<String>,

    /// Print an OAuth URL and code verifier for headless authentication
    #[arg(long, conflicts_with_all = ["auth_code", "show_credentials"])]
    generate_auth_url: bool,

    /// Authorization code copied from the redirect URL
    #[arg(long, requires = "code_verifier", conflicts_with = "show_credentials")]
    auth_code: Option<String>,

    /// Code verifier printed by --generate-auth-url
    #[arg(long)]
    code_verifier: Option<String>,

    /// Where the credential file is written or read
    #[arg(long)]
    credentials_location: Option<PathBuf>,

    /// Print the account stored in the credential file
    #[arg(long)]
    show_credentials: bool,

    /// Proxy URL for both HTTP and HTTPS traffic
    #[arg(long)]
    proxy: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// CLI flags, environment and config file merged into one view.
#[derive(Debug)]
struct Settings {
    client_id: Option<String>,
    redirect_uri: Option<String>,
    proxy: ProxySettings,
    timeout: Duration,
    credentials_path: PathBuf,
}

impl Settings {
    fn resolve<F>(cli: &Cli, config: Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            client_id: cli.client_id.clone().or(config.oauth.client_id.clone()),
            redirect_uri: cli
                .oauth_redirect_uri
                .clone()
                .or(config.oauth.redirect_uri.clone()),
            proxy: resolve_proxy(cli.proxy.as_deref(), config.oauth.proxy.as_deref(), lookup),
            timeout: config.oauth.timeout(),
            credentials_path: cli
                .credentials_location
                .clone()
                .unwrap_or(config.storage.credentials_path),
        }
    }

    fn oauth_config(&self) -> Result<OAuthConfig> {
        let client_id = self
            .client_id
            .as_deref()
            .context("--client-id is required")?;
        let redirect_uri = self
            .redirect_uri
            .as_deref()
            .context("--oauth-redirect-uri is required")?;
        Ok(OAuthConfig::new(client_id, redirect_uri)
            .with_proxy(self.proxy.clone())
            .with_timeout(self.timeout))
    }
}

/// `--proxy`, then the environment, then the config file.
fn resolve_proxy<F>(cli: Option<&str>, file: Option<&str>, lookup: F) -> ProxySettings
where
    F: Fn(&str) -> Option<String>,
{
    let resolved = ProxySettings::resolve(cli, lookup);
    match file {
        Some(url) if resolved.is_direct() && !url.is_empty() => ProxySettings::explicit(url),
        _ => resolved,
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the URL and verifier; logs go to stderr
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config =
        Config::discover(cli.config.as_deref()).context("failed to load configuration")?;
    let settings = Settings::resolve(&cli, config, |key| std::env::var(key).ok());

    if cli.generate_auth_url {
        return generate_auth_url(&settings);
    }

    if let Some(code) = cli.auth_code.as_deref() {
        let verifier = cli.code_verifier.as_deref().unwrap_or_default();
        return exchange_and_save(&settings, code, verifier).await;
    }

    if cli.show_credentials {
        return show_credentials(&settings.credentials_path).await;
    }

    Cli::command().print_help()?;
    Ok(())
}

fn generate_auth_url(settings: &Settings) -> Result<()> {
    if settings.client_id.is_none() {
        anyhow::bail!("--client-id is required for --generate-auth-url");
    }
    if settings.redirect_uri.is_none() {
        anyhow::bail!("--oauth-redirect-uri is required for --generate-auth-url");
    }

    let client = OAuthClient::new(settings.oauth_config()?)?;
    let request = client.authorization_request()?;
    print!("{}", auth_instructions(&request.url, &request.verifier));
    Ok(())
}

fn auth_instructions(url: &str, verifier: &str) -> String {
    format!(
        "OAuth URL: {url}\n\
         Code Verifier: {verifier}\n\
         \n\
         Instructions:\n\
         1. Open the OAuth URL in a browser\n\
         2. Authorize the application\n\
         3. Copy the 'code' parameter from the redirect URL\n\
         4. Run zotify-auth with --auth-code <CODE> --code-verifier <VERIFIER>\n"
    )
}

async fn exchange_and_save(settings: &Settings, code: &str, verifier: &str) -> Result<()> {
    let client = OAuthClient::new(settings.oauth_config()?)?;

    let credentials: Credentials = match client.exchange_code(code, verifier).await {
        Ok(credentials) => credentials,
        Err(e @ headless_auth::Error::Authentication(_)) => {
            return Err(anyhow::Error::new(e)
                .context("authorization code rejected; generate a new URL and try again"));
        }
        Err(e) if e.is_transport() => {
            return Err(anyhow::Error::new(e).context("could not complete the token exchange"));
        }
        Err(e) => return Err(e.into()),
    };

    credentials::save(&credentials, &settings.credentials_path)
        .await
        .with_context(|| {
            format!(
                "failed to save credentials to {}",
                settings.credentials_path.display()
            )
        })?;

    info!(username = credentials.username(), "authenticated");
    println!(
        "Saved credentials for {} to {}",
        credentials.username(),
        settings.credentials_path.display()
    );
    Ok(())
}

async fn show_credentials(path: &Path) -> Result<()> {
    let credentials = credentials::load(path)
        .await
        .with_context(|| format!("failed to load credentials from {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&credentials.summary())?);
    Ok(())
}
