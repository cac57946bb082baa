use std::sync::{Arc, Mutex as StdMutex, Weak};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::OnLoad;
use crate::error::{Result, TallyError};

use super::pkce::PkceChallenge;
use super::provider::IdentityProvider;
use super::store::SessionStore;
use super::token::{decode_claims, refresh_delay, AuthUser, Claims, Token, TokenSet, REFRESH_MARGIN_SECS};

const EVENT_CAPACITY: usize = 16;

/// Lifecycle notifications published by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    AuthSuccess,
    AuthError(String),
    RefreshSuccess,
    TokenExpired,
    LoginRequired(Url),
    Logout,
}

#[derive(Default)]
struct SessionState {
    tokens: Option<TokenSet>,
    claims: Option<Claims>,
}

impl SessionState {
    fn from_tokens(tokens: TokenSet) -> Result<Self> {
        let claims = decode_claims(&tokens.access_token)?;
        Ok(Self {
            tokens: Some(tokens),
            claims: Some(claims),
        })
    }

    fn exp(&self) -> Option<i64> {
        self.claims.as_ref().and_then(|claims| claims.exp)
    }
}

/// Authentication state shared by every command.
///
/// Owns the token set, keeps it fresh with a single background refresh
/// timer and hands out the bearer token to the API client.
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    store: SessionStore,
    state: RwLock<SessionState>,
    pending_login: Mutex<Option<PkceChallenge>>,
    refresh_task: StdMutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: SessionStore) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            provider,
            store,
            state: RwLock::new(SessionState::default()),
            pending_login: Mutex::new(None),
            refresh_task: StdMutex::new(None),
            events,
        })
    }

    /// Session that starts out signed in with `tokens`.
    pub fn with_tokens(
        provider: Arc<dyn IdentityProvider>,
        store: SessionStore,
        tokens: TokenSet,
    ) -> Result<Arc<Self>> {
        let session = Self::new(provider, store);
        let state = SessionState::from_tokens(tokens)?;
        match session.state.try_write() {
            Ok(mut guard) => *guard = state,
            Err(_) => return Err(TallyError::Identity("Session state is locked".into())),
        }
        Ok(session)
    }

    /// Registers an event listener; dropping the receiver unregisters it.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Restores the persisted session and arms the refresh timer.
    ///
    /// Expired access tokens are refreshed silently when a refresh token is
    /// available. Returns whether the session ended up authenticated.
    pub async fn init(self: &Arc<Self>, onload: OnLoad) -> Result<bool> {
        let authenticated = match self.store.load() {
            Some(tokens) => self.restore(tokens).await,
            None => false,
        };

        info!("Session init: authenticated={authenticated}");

        if authenticated {
            self.emit(AuthEvent::AuthSuccess);
            self.start_refresh_loop();
        } else if onload == OnLoad::LoginRequired {
            self.login().await?;
        }

        Ok(authenticated)
    }

    async fn restore(&self, tokens: TokenSet) -> bool {
        let state = match SessionState::from_tokens(tokens) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding stored session: {e}");
                let _ = self.store.clear();
                return false;
            }
        };

        let expired = state
            .claims
            .as_ref()
            .is_some_and(|claims| claims.is_expired(Utc::now().timestamp()));
        *self.state.write().await = state;

        if !expired {
            return true;
        }

        self.emit(AuthEvent::TokenExpired);
        match self.update_token(REFRESH_MARGIN_SECS).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Silent refresh failed: {e}");
                self.clear_tokens().await;
                false
            }
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.tokens.is_some()
    }

    pub async fn token(&self) -> Option<Token> {
        self.state
            .read()
            .await
            .tokens
            .as_ref()
            .map(|tokens| Token::from(tokens.access_token.as_str()))
    }

    pub async fn user(&self) -> Option<AuthUser> {
        let state = self.state.read().await;
        state.tokens.as_ref()?;
        state.claims.as_ref().map(AuthUser::from)
    }

    /// Backend user id, the `preferred_username` claim.
    pub async fn user_id(&self) -> Result<String> {
        self.user()
            .await
            .and_then(|user| user.preferred_username)
            .ok_or(TallyError::NotAuthenticated)
    }

    /// Starts a PKCE login and returns the URL the user must open.
    pub async fn login(&self) -> Result<Url> {
        let pkce = PkceChallenge::generate();
        let url = self.provider.authorization_url(&pkce)?;
        *self.pending_login.lock().await = Some(pkce);

        info!("Login required: {url}");
        self.emit(AuthEvent::LoginRequired(url.clone()));
        Ok(url)
    }

    /// Finishes a login with the code, or the full redirect URL carrying it.
    pub async fn complete_login(self: &Arc<Self>, input: &str) -> Result<AuthUser> {
        let pkce = self
            .pending_login
            .lock()
            .await
            .take()
            .ok_or_else(|| TallyError::Identity("No login in progress".into()))?;

        let code = extract_code(input, &pkce.state)?;
        let tokens = match self.provider.exchange_code(&code, &pkce.verifier).await {
            Ok(tokens) => tokens,
            Err(e) => {
                self.emit(AuthEvent::AuthError(e.to_string()));
                return Err(e);
            }
        };

        self.install(tokens).await?;
        self.emit(AuthEvent::AuthSuccess);
        self.start_refresh_loop();

        self.user().await.ok_or(TallyError::NotAuthenticated)
    }

    /// Refreshes when the token expires within `min_validity` seconds.
    ///
    /// Returns `true` when a new token was obtained.
    pub async fn update_token(&self, min_validity: i64) -> Result<bool> {
        let (exp, refresh_token) = {
            let state = self.state.read().await;
            let tokens = state.tokens.as_ref().ok_or(TallyError::NotAuthenticated)?;
            (state.exp(), tokens.refresh_token.clone())
        };

        let now = Utc::now().timestamp();
        if exp.is_some_and(|exp| exp - now > min_validity) {
            return Ok(false);
        }

        let refresh_token = refresh_token.ok_or(TallyError::NotAuthenticated)?;
        let tokens = self.provider.refresh(&refresh_token).await?;
        self.install(tokens).await?;
        self.emit(AuthEvent::RefreshSuccess);
        Ok(true)
    }

    async fn install(&self, tokens: TokenSet) -> Result<()> {
        if let Err(e) = self.store.save(&tokens) {
            warn!("Failed to persist session: {e}");
        }
        *self.state.write().await = SessionState::from_tokens(tokens)?;
        Ok(())
    }

    async fn clear_tokens(&self) {
        *self.state.write().await = SessionState::default();
        if let Err(e) = self.store.clear() {
            warn!("Failed to remove stored session: {e}");
        }
    }

    /// Ends the session locally and at the identity provider.
    pub async fn logout(&self) -> Result<()> {
        self.stop_refresh_loop();

        let refresh_token = self
            .state
            .read()
            .await
            .tokens
            .as_ref()
            .and_then(|tokens| tokens.refresh_token.clone());

        let result = self.provider.logout(refresh_token.as_deref()).await;
        self.clear_tokens().await;
        self.emit(AuthEvent::Logout);
        result
    }

    /// Arms the refresh timer, replacing any timer already running.
    pub fn start_refresh_loop(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(refresh_loop(weak));

        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    pub fn stop_refresh_loop(&self) {
        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for AuthSession {
    fn drop(&mut self) {
        self.stop_refresh_loop();
    }
}

async fn refresh_loop(session: Weak<AuthSession>) {
    loop {
        let exp = {
            let Some(session) = session.upgrade() else {
                return;
            };
            let state = session.state.read().await;
            if state.tokens.is_none() {
                return;
            }
            state.exp()
        };

        let delay = refresh_delay(exp, Utc::now().timestamp());
        debug!("Next token refresh in {}s", delay.as_secs());
        tokio::time::sleep(delay).await;

        let Some(session) = session.upgrade() else {
            return;
        };

        if let Err(e) = session.update_token(REFRESH_MARGIN_SECS).await {
            warn!("Token refresh failed; forcing login: {e}");
            session.emit(AuthEvent::AuthError(e.to_string()));
            session.clear_tokens().await;
            if let Err(e) = session.login().await {
                warn!("Could not start login: {e}");
            }
            return;
        }
    }
}

fn extract_code(input: &str, expected_state: &str) -> Result<String> {
    let input = input.trim();
    let Ok(url) = Url::parse(input) else {
        if input.is_empty() {
            return Err(TallyError::Input("Authorization code is empty".into()));
        }
        return Ok(input.to_string());
    };

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(TallyError::Identity(format!("Login rejected: {value}"))),
            _ => {}
        }
    }

    if state.as_deref().is_some_and(|state| state != expected_state) {
        return Err(TallyError::Identity("Login state mismatch".into()));
    }

    code.ok_or_else(|| TallyError::Input("Redirect URL carries no authorization code".into()))
}
