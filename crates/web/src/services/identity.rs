//! OpenID Connect client for the external identity provider.
//!
//! # Flow
//!
//! 1. `GET /sign-in` stores a random `state` and `nonce` in the session and
//!    redirects to [`IdentityClient::authorization_url`]
//! 2. The provider redirects back to `/auth/callback?code=..&state=..`
//! 3. The code is exchanged with [`IdentityClient::exchange_code`]
//! 4. [`IdentityClient::userinfo`] resolves the stable subject id and display
//!    name, which are stored in the session as the current identity
//!
//! The ID token is kept only as a logout hint; identity comes from the
//! `userinfo` endpoint over the back channel.

use monance_core::{IdentityId, IdentityIdError};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Length of generated `state` and `nonce` values.
const RANDOM_TOKEN_LENGTH: usize = 32;

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider rejected the request.
    #[error("provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Subject claim is not a usable identity id.
    #[error("invalid subject: {0}")]
    InvalidSubject(#[from] IdentityIdError),

    /// Callback `state` does not match the one issued at sign-in.
    #[error("state mismatch")]
    StateMismatch,
}

/// Raw token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

/// Tokens returned by the token endpoint.
#[derive(Clone)]
pub struct TokenSet {
    pub access_token: SecretString,
    pub id_token: Option<String>,
}

impl From<TokenResponse> for TokenSet {
    fn from(raw: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(raw.access_token),
            id_token: raw.id_token,
        }
    }
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
}

/// The calling human as resolved by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity_id: IdentityId,
    pub display_name: String,
}

impl TryFrom<UserInfo> for ResolvedIdentity {
    type Error = IdentityError;

    fn try_from(info: UserInfo) -> Result<Self, Self::Error> {
        let identity_id = IdentityId::parse(&info.sub)?;
        let display_name = info
            .name
            .or(info.preferred_username)
            .or(info.email)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| identity_id.to_string());
        Ok(Self {
            identity_id,
            display_name,
        })
    }
}

/// Generate a random URL-safe token for `state` or `nonce`.
#[must_use]
pub fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Client for the provider's authorize, token, userinfo and logout endpoints.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: SecretString,
}

impl IdentityClient {
    /// Create a new identity client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            issuer: config.issuer_url.as_str().trim_end_matches('/').to_owned(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.issuer)
    }

    /// Build the URL that starts sign-in.
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str, nonce: &str) -> String {
        format!(
            "{}?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20profile%20email&\
            state={}&\
            nonce={}",
            self.endpoint("authorize"),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(nonce)
        )
    }

    /// Build the provider logout URL.
    #[must_use]
    pub fn logout_url(&self, id_token: Option<&str>, post_logout_redirect_uri: &str) -> String {
        let mut url = format!(
            "{}?client_id={}&post_logout_redirect_uri={}",
            self.endpoint("logout"),
            urlencoding::encode(&self.client_id),
            urlencoding::encode(post_logout_redirect_uri)
        );
        if let Some(token) = id_token {
            url.push_str("&id_token_hint=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Provider` if the provider rejects the code.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenSet, IdentityError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .client
            .post(self.endpoint("token"))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Provider { status, message });
        }

        let raw: TokenResponse = response.json().await?;
        Ok(raw.into())
    }

    /// Resolve the signed-in identity from an access token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Provider` if the token is rejected, or
    /// `IdentityError::InvalidSubject` if the subject is not a valid id.
    pub async fn userinfo(&self, tokens: &TokenSet) -> Result<ResolvedIdentity, IdentityError> {
        let response = self
            .client
            .get(self.endpoint("userinfo"))
            .bearer_auth(tokens.access_token.expose_secret())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Provider { status, message });
        }

        let info: UserInfo = response.json().await?;
        ResolvedIdentity::try_from(info)
    }
}
