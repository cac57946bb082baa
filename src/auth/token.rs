use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

/// Refresh this many seconds before the access token expires.
pub const REFRESH_MARGIN_SECS: i64 = 30;
/// Never re-arm the refresh timer sooner than this.
pub const MIN_REFRESH_DELAY_SECS: i64 = 10;
/// Assumed remaining lifetime when a token carries no `exp` claim.
const DEFAULT_LIFETIME_SECS: i64 = 60;

/// Bearer access token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Token endpoint response, also the persisted session format.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleSet {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The subset of access-token claims the client reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub exp: Option<i64>,
    pub sub: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub realm_access: Option<RoleSet>,
    #[serde(default)]
    pub resource_access: IndexMap<String, RoleSet>,
}

impl Claims {
    /// Realm roles followed by every client's resource roles.
    pub fn roles(&self) -> Vec<String> {
        let realm = self
            .realm_access
            .iter()
            .flat_map(|access| access.roles.iter().cloned());
        let resource = self
            .resource_access
            .values()
            .flat_map(|access| access.roles.iter().cloned());
        realm.chain(resource).collect()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now)
    }
}

/// Authenticated user as exposed to commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
    pub picture: Option<String>,
    pub sub: Option<String>,
    pub roles: Vec<String>,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            email: claims.email.clone(),
            name: claims.name.clone(),
            preferred_username: claims.preferred_username.clone(),
            picture: claims.picture.clone(),
            sub: claims.sub.clone(),
            roles: claims.roles(),
        }
    }
}

/// Decodes the payload segment of a JWT without verifying its signature.
///
/// The backend verifies tokens; the client only reads display claims and `exp`.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| TallyError::Identity("Malformed access token".into()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TallyError::Identity(format!("Malformed access token payload: {e}")))?;

    Ok(serde_json::from_slice(&bytes)?)
}

/// Builds an unsigned token carrying `claims`, used by the offline identity.
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.")
}

/// Delay before the next refresh attempt.
pub fn refresh_delay(exp: Option<i64>, now: i64) -> Duration {
    let exp = exp.unwrap_or(now + DEFAULT_LIFETIME_SECS);
    let secs = (exp - now - REFRESH_MARGIN_SECS).max(MIN_REFRESH_DELAY_SECS);
    #[allow(clippy::cast_sign_loss)]
    Duration::from_secs(secs as u64)
}
