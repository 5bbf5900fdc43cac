//! Service account credentials for Google APIs.
//!
//! Credentials arrive as individual values (one environment variable per
//! field). The private key is never logged; `Debug` redacts it.

use crate::error::CredentialError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default OAuth token endpoint for service accounts.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Grant type for exchanging a signed assertion for an access token.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion.
const ASSERTION_LIFETIME_MINUTES: i64 = 60;

/// A Google service account identity.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    /// Project the account belongs to.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Key ID, sent as the assertion's `kid`.
    pub private_key_id: String,
    /// PEM encoded RSA private key.
    pub private_key: String,
    /// Service account email, used as the assertion issuer.
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Where assertions are exchanged for access tokens.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Claims of a service account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl ServiceAccountCredentials {
    /// Checks required fields and restores newlines in the private key.
    ///
    /// Environment variables usually carry the PEM with literal `\n`
    /// sequences; those are turned back into line breaks.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty.
    pub fn normalized(mut self) -> Result<Self, CredentialError> {
        if self.client_email.trim().is_empty() {
            return Err(CredentialError::MissingField {
                field: "client_email",
            });
        }
        if self.private_key.trim().is_empty() {
            return Err(CredentialError::MissingField {
                field: "private_key",
            });
        }
        if self.token_uri.trim().is_empty() {
            self.token_uri = default_token_uri();
        }
        self.private_key = self.private_key.replace("\\n", "\n");
        Ok(self)
    }

    /// Builds the claims for an assertion issued at `now`.
    #[must_use]
    pub fn claims(&self, scopes: &[&str], now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: scopes.join(" "),
            aud: self.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        }
    }

    /// Signs an RS256 assertion for the given scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is not a valid RSA PEM or signing
    /// fails.
    pub fn sign_assertion(
        &self,
        scopes: &[&str],
        now: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            CredentialError::InvalidKey {
                reason: e.to_string(),
            }
        })?;

        let mut header = Header::new(Algorithm::RS256);
        if !self.private_key_id.is_empty() {
            header.kid = Some(self.private_key_id.clone());
        }

        jsonwebtoken::encode(&header, &self.claims(scopes, now), &key).map_err(|e| {
            CredentialError::SigningFailed {
                reason: e.to_string(),
            }
        })
    }
}

/// A bearer token returned by the token endpoint.
#[derive(Clone)]
pub struct AccessToken {
    /// The token value.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Creates a token that expires `expires_in` seconds after `now`.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_in: i64, now: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: now + Duration::seconds(expires_in),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
