//! Authentication module for the Google Photos Library API.
//!
//! Tokens live in the system keyring. An access token can be obtained from an
//! environment override, by exchanging a stored refresh token, or by running
//! the browser consent flow.

use keyring::Entry;
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use url::Url;

const KEYRING_SERVICE_NAME: &str = "albumgrab";
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const PHOTOS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/photoslibrary.readonly";

pub const CLIENT_ID_ENV: &str = "GOOGLE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "GOOGLE_CLIENT_SECRET";
pub const TOKEN_URL_ENV: &str = "GOOGLE_TOKEN_URL";
pub const ACCESS_TOKEN_ENV: &str = "ALBUMGRAB_ACCESS_TOKEN";
pub const REFRESH_TOKEN_ENV: &str = "ALBUMGRAB_REFRESH_TOKEN";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Keyring Error: {0}")]
    Keyring(#[from] keyring::Error),
    #[error("OAuth Error: {0}")]
    OAuth(String),
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
    #[error("Other Error: {0}")]
    Other(String),
}

fn oauth_client() -> Result<BasicClient, AuthError> {
    let client_id = std::env::var(CLIENT_ID_ENV)
        .map_err(|_| AuthError::MissingCredentials(format!("{} is not set", CLIENT_ID_ENV)))?;
    let client_secret = std::env::var(CLIENT_SECRET_ENV)
        .map_err(|_| AuthError::MissingCredentials(format!("{} is not set", CLIENT_SECRET_ENV)))?;
    let token_url = std::env::var(TOKEN_URL_ENV).unwrap_or_else(|_| TOKEN_URL.to_string());

    Ok(BasicClient::new(
        ClientId::new(client_id),
        Some(ClientSecret::new(client_secret)),
        AuthUrl::new(AUTH_URL.to_string()).map_err(|e| AuthError::OAuth(e.to_string()))?,
        Some(TokenUrl::new(token_url).map_err(|e| AuthError::OAuth(e.to_string()))?),
    ))
}

/// Run the browser consent flow and store the resulting tokens.
#[tracing::instrument]
pub async fn authenticate(redirect_port: u16) -> Result<String, AuthError> {
    let redirect = format!("http://127.0.0.1:{}", redirect_port);
    let client = oauth_client()?.set_redirect_uri(
        RedirectUrl::new(redirect.clone()).map_err(|e| AuthError::OAuth(e.to_string()))?,
    );

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let (authorize_url, csrf_state) = client
        .authorize_url(CsrfToken::new_random)
        .add_scope(Scope::new(PHOTOS_READONLY_SCOPE.to_string()))
        .set_pkce_challenge(pkce_challenge)
        .url();

    let listener = TcpListener::bind(("127.0.0.1", redirect_port))
        .await
        .map_err(|e| AuthError::Other(format!("Failed to bind redirect listener: {}", e)))?;

    println!("Opening browser for authentication: {}", authorize_url);
    if let Err(e) = webbrowser::open(authorize_url.as_str()) {
        tracing::warn!(error = %e, "Could not open a browser; open the URL manually");
    }

    let (stream, _) = listener
        .accept()
        .await
        .map_err(|e| AuthError::Other(e.to_string()))?;
    let mut stream = BufReader::new(stream);
    let mut request_line = String::new();
    stream
        .read_line(&mut request_line)
        .await
        .map_err(|e| AuthError::Other(e.to_string()))?;

    let path = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| AuthError::OAuth("No redirect URL found".into()))?;
    let redirect_url = Url::parse(&format!("{}{}", redirect, path))
        .map_err(|e| AuthError::OAuth(e.to_string()))?;

    let param = |name: &str| {
        redirect_url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };
    if param("state").as_deref() != Some(csrf_state.secret().as_str()) {
        return Err(AuthError::OAuth("CSRF state mismatch".into()));
    }
    let code = param("code")
        .ok_or_else(|| AuthError::OAuth("No authorization code found in redirect URL".into()))?;

    let body = "Authentication complete. You can close this window.";
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.get_mut().write_all(response.as_bytes()).await;

    let token_response = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(async_http_client)
        .await
        .map_err(|e| AuthError::OAuth(e.to_string()))?;

    let access_token = token_response.access_token().secret().to_string();
    store_token("access_token", &access_token)?;
    if let Some(refresh_token) = token_response.refresh_token() {
        store_token("refresh_token", refresh_token.secret())?;
    }

    tracing::info!("Authentication successful");
    Ok(access_token)
}

fn store_token(kind: &str, value: &str) -> Result<(), AuthError> {
    Entry::new(KEYRING_SERVICE_NAME, kind)?.set_password(value)?;
    Ok(())
}

fn load_token(kind: &str) -> Result<Option<String>, AuthError> {
    match Entry::new(KEYRING_SERVICE_NAME, kind)?.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_refresh_token() -> Result<Option<String>, AuthError> {
    match std::env::var(REFRESH_TOKEN_ENV) {
        Ok(token) => Ok(Some(token)),
        Err(_) => load_token("refresh_token"),
    }
}

/// Exchange the stored refresh token for a fresh access token.
pub async fn refresh_access_token() -> Result<String, AuthError> {
    let refresh_token = get_refresh_token()?
        .ok_or_else(|| AuthError::MissingCredentials("No refresh token found".into()))?;

    let token_response = oauth_client()?
        .exchange_refresh_token(&RefreshToken::new(refresh_token))
        .request_async(async_http_client)
        .await
        .map_err(|e| AuthError::OAuth(e.to_string()))?;

    let access_token = token_response.access_token().secret().to_string();
    store_token("access_token", &access_token)?;
    tracing::debug!("Access token refreshed");
    Ok(access_token)
}

/// Resolve an access token for a new session.
///
/// Order: `ALBUMGRAB_ACCESS_TOKEN`, refresh-token exchange, interactive consent.
pub async fn obtain_access_token(redirect_port: u16) -> Result<String, AuthError> {
    if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
        tracing::info!("Using access token from {}", ACCESS_TOKEN_ENV);
        return Ok(token);
    }

    match get_refresh_token() {
        Ok(Some(_)) => match refresh_access_token().await {
            Ok(token) => return Ok(token),
            Err(e) => tracing::warn!(error = %e, "Refresh failed, falling back to consent flow"),
        },
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read stored refresh token"),
    }

    authenticate(redirect_port).await
}
