use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use url::Url;

use crate::error::{Result, TallyError};

use super::pkce::PkceChallenge;
use super::token::{encode_unsigned, TokenSet};

/// An OIDC identity provider the session delegates to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL the user must open to sign in.
    fn authorization_url(&self, pkce: &PkceChallenge) -> Result<Url>;

    /// Exchanges an authorization code for tokens.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet>;

    /// Trades a refresh token for a new token set.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet>;

    /// Ends the provider-side session.
    async fn logout(&self, refresh_token: Option<&str>) -> Result<()>;
}

/// Offline identity used with the in-memory stores.
///
/// Issues unsigned tokens for a fixed user; every code exchange and refresh
/// succeeds.
pub struct StaticIdentity {
    username: String,
    lifetime_secs: i64,
}

impl StaticIdentity {
    pub fn new(username: impl Into<String>, lifetime_secs: i64) -> Self {
        Self {
            username: username.into(),
            lifetime_secs,
        }
    }

    pub fn issue(&self) -> TokenSet {
        let exp = Utc::now().timestamp() + self.lifetime_secs;
        let access_token = encode_unsigned(&json!({
            "exp": exp,
            "sub": format!("local-{}", self.username),
            "preferred_username": self.username,
            "name": self.username,
            "realm_access": { "roles": ["user"] },
        }));
        #[allow(clippy::cast_sign_loss)]
        let expires_in = self.lifetime_secs.max(0) as u64;
        TokenSet {
            access_token,
            refresh_token: Some(format!("refresh-{}", self.username)),
            id_token: None,
            expires_in: Some(expires_in),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    fn authorization_url(&self, pkce: &PkceChallenge) -> Result<Url> {
        let mut url = Url::parse("http://localhost/offline-login")
            .map_err(|e| TallyError::Identity(format!("Invalid login URL: {e}")))?;
        url.query_pairs_mut().append_pair("state", &pkce.state);
        Ok(url)
    }

    async fn exchange_code(&self, _code: &str, _verifier: &str) -> Result<TokenSet> {
        Ok(self.issue())
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet> {
        Ok(self.issue())
    }

    async fn logout(&self, _refresh_token: Option<&str>) -> Result<()> {
        Ok(())
    }
}
