use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::broadcast::error::RecvError;

use crate::api::credentials::{CredentialService, HttpCredentialService, MockCredentialStore};
use crate::api::templates::{HttpTemplateService, MockTemplateStore, TemplateService};
use crate::api::ApiClient;
use crate::auth::{AuthEvent, AuthSession, KeycloakClient, SessionStore, StaticIdentity};
use crate::config::Config;
use crate::drafts::DraftStore;
use crate::error::{Result, TallyError};

/// Username of the offline identity.
pub const DEMO_USER: &str = "demo";

const DEMO_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Everything a command needs: the session, the resource services and the
/// draft store, wired from the configuration.
pub struct App {
    pub config: Config,
    pub session: Arc<AuthSession>,
    pub credentials: Arc<dyn CredentialService>,
    pub templates: Arc<dyn TemplateService>,
    pub drafts: DraftStore,
}

impl App {
    /// Builds the app and restores the stored session.
    pub async fn connect(config: Config) -> Result<Self> {
        let drafts = DraftStore::new(config.drafts.enabled)?;

        if config.backend.mock {
            info!("Using in-memory demo data");
            let identity = Arc::new(StaticIdentity::new(DEMO_USER, DEMO_TOKEN_LIFETIME_SECS));
            let tokens = identity.issue();
            let session = AuthSession::with_tokens(identity, SessionStore::disabled(), tokens)?;

            return Ok(Self {
                config,
                session,
                credentials: Arc::new(MockCredentialStore::new()),
                templates: Arc::new(MockTemplateStore::new()),
                drafts,
            });
        }

        config.keycloak.warn_if_incomplete();
        let provider = KeycloakClient::shared(&config.keycloak)?;
        let session = AuthSession::new(provider, SessionStore::new()?);
        watch_session(&session);
        let authenticated = session.init(config.keycloak.onload).await?;
        debug!("Session restored: {authenticated}");

        let api = Arc::new(ApiClient::new(&config.backend.base_url, Arc::clone(&session))?);

        Ok(Self {
            config,
            session,
            credentials: Arc::new(HttpCredentialService::new(Arc::clone(&api))),
            templates: Arc::new(HttpTemplateService::new(api)),
            drafts,
        })
    }

    /// Backend id of the signed-in user.
    pub async fn user_id(&self) -> Result<String> {
        match self.session.user_id().await {
            Ok(id) => Ok(id),
            Err(TallyError::NotAuthenticated) => {
                self.session.login().await?;
                Err(TallyError::NotAuthenticated)
            }
            Err(e) => Err(e),
        }
    }
}

/// Logs session lifecycle events until the session is dropped.
fn watch_session(session: &Arc<AuthSession>) {
    let mut events = session.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::AuthError(message)) => warn!("Authentication error: {message}"),
                Ok(AuthEvent::TokenExpired) => warn!("Session expired"),
                Ok(AuthEvent::LoginRequired(url)) => debug!("Login required at {url}"),
                Ok(event) => debug!("Auth event: {event:?}"),
                Err(RecvError::Lagged(skipped)) => debug!("Missed {skipped} auth events"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
