use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::OnceCell;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::config::KeycloakConfig;
use crate::error::{Result, TallyError};

use super::pkce::PkceChallenge;
use super::provider::IdentityProvider;
use super::token::TokenSet;

static SHARED: OnceCell<Arc<KeycloakClient>> = OnceCell::new();

/// Keycloak OpenID Connect client for a single realm and public client.
pub struct KeycloakClient {
    client: Client,
    realm_url: Url,
    client_id: String,
    redirect_uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct OidcError {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl KeycloakClient {
    pub fn new(base_url: &str, realm: &str, client_id: &str, redirect_uri: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tasktally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TallyError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };

        let realm_url = Url::parse(&base)
            .map_err(|e| TallyError::Config(format!("Invalid Keycloak URL: {e}")))?
            .join(&format!("realms/{}/", urlencoding::encode(realm)))
            .map_err(|e| TallyError::Config(format!("Invalid Keycloak realm URL: {e}")))?;

        Ok(Self {
            client,
            realm_url,
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
        })
    }

    /// Process-wide client, built from `config` on first use.
    ///
    /// Later calls return the same instance regardless of `config`.
    pub fn shared(config: &KeycloakConfig) -> Result<Arc<Self>> {
        SHARED
            .get_or_try_init(|| {
                let (url, realm, client_id) = config.endpoints().ok_or_else(|| {
                    TallyError::Config(
                        "Keycloak url, realm and client-id must all be configured".into(),
                    )
                })?;
                info!("Initializing Keycloak client for realm {realm}");
                Self::new(url, realm, client_id, &config.redirect_uri).map(Arc::new)
            })
            .cloned()
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        self.realm_url
            .join(&format!("protocol/openid-connect/{name}"))
            .map_err(|e| TallyError::Config(format!("Invalid Keycloak endpoint: {e}")))
    }

    async fn token_request(&self, form: &[(&str, &str)], context: &str) -> Result<TokenSet> {
        let response = self
            .client
            .post(self.endpoint("token")?)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: OidcError = response.json().await.unwrap_or_default();
            let reason = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| status.to_string());
            return Err(TallyError::Identity(format!("{context}: {reason}")));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for KeycloakClient {
    fn authorization_url(&self, pkce: &PkceChallenge) -> Result<Url> {
        let mut url = self.endpoint("auth")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid")
            .append_pair("state", &pkce.state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenSet> {
        debug!("Exchanging authorization code");
        self.token_request(
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
                ("code_verifier", verifier),
            ],
            "Login failed",
        )
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        debug!("Refreshing access token");
        self.token_request(
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.client_id.as_str()),
                ("refresh_token", refresh_token),
            ],
            "Token refresh failed",
        )
        .await
    }

    async fn logout(&self, refresh_token: Option<&str>) -> Result<()> {
        let Some(refresh_token) = refresh_token else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.endpoint("logout")?)
            .form(&[("client_id", self.client_id.as_str()), ("refresh_token", refresh_token)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TallyError::Identity(format!(
                "Logout failed: {}",
                response.status()
            )));
        }
        Ok(())
    }
}
