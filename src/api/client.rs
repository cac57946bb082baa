use std::sync::Arc;

use log::{debug, warn};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::auth::AuthSession;
use crate::error::{ApiError, Result, TallyError};

/// Authenticated HTTP client for the Task Tally backend.
///
/// Every request goes through [`ApiClient::fetch`], which attaches the
/// bearer token and turns a missing or rejected session into a fresh
/// login.
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Arc<AuthSession>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<AuthSession>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tasktally/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TallyError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| TallyError::Config(format!("Invalid backend URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TallyError::Config(format!(
                "Backend URL cannot carry paths: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    /// Appends percent-encoded `segments` to the backend base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TallyError::Config(format!("Invalid backend URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request with the session's bearer token.
    ///
    /// Without a token the login flow is started and the call fails before
    /// touching the network. A 401 answer also restarts the login.
    pub async fn fetch<B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let Some(token) = self.session.token().await else {
            self.trigger_login().await;
            return Err(TallyError::NotAuthenticated);
        };

        debug!("{method} {url}");
        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(token.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.trigger_login().await;
            return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, "Session rejected").into());
        }

        Ok(response)
    }

    pub async fn get(&self, url: Url) -> Result<Response> {
        self.fetch::<()>(Method::GET, url, None).await
    }

    pub async fn delete(&self, url: Url) -> Result<Response> {
        self.fetch::<()>(Method::DELETE, url, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Response> {
        self.fetch(Method::POST, url, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<Response> {
        self.fetch(Method::PUT, url, Some(body)).await
    }

    async fn trigger_login(&self) {
        if let Err(e) = self.session.login().await {
            warn!("Could not start login: {e}");
        }
    }
}

/// Fails with a categorized error unless the response is a success.
pub fn expect_ok(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_status(status, context).into())
    }
}

/// Checks the status and decodes a JSON body.
pub async fn read_json<T: DeserializeOwned>(response: Response, context: &str) -> Result<T> {
    Ok(expect_ok(response, context)?.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthEvent, SessionStore, StaticIdentity};
    use crate::error::ErrorKind;

    fn signed_in_session() -> Arc<AuthSession> {
        let identity = Arc::new(StaticIdentity::new("ada", 300));
        let tokens = identity.issue();
        AuthSession::with_tokens(identity, SessionStore::disabled(), tokens).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let api = ApiClient::new("https://tally.example.com/base/", signed_in_session()).unwrap();
        let url = api
            .endpoint(&["api", "users", "ada", "ssh-keys", "my key/1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://tally.example.com/base/api/users/ada/ssh-keys/my%20key%2F1"
        );
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(ApiClient::new("not a url", signed_in_session()).is_err());
        assert!(ApiClient::new("mailto:ops@example.com", signed_in_session()).is_err());
    }

    #[tokio::test]
    async fn test_fetch_attaches_bearer_token() {
        let session = signed_in_session();
        let token = session.token().await.unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/ping")
            .match_header("authorization", format!("Bearer {}", token.as_str()).as_str())
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let api = ApiClient::new(&server.url(), session).unwrap();
        let response = api.get(api.endpoint(&["api", "ping"]).unwrap()).await.unwrap();
        assert!(response.status().is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_without_token_fails_fast_and_starts_login() {
        let identity = Arc::new(StaticIdentity::new("ada", 300));
        let session = AuthSession::new(identity, SessionStore::disabled());
        let mut events = session.subscribe();

        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("GET", "/api/ping").expect(0).create_async().await;

        let api = ApiClient::new(&server.url(), session).unwrap();
        let err = api
            .get(api.endpoint(&["api", "ping"]).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(err, TallyError::NotAuthenticated));
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::LoginRequired(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_response_starts_login() {
        let session = signed_in_session();
        let mut events = session.subscribe();

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/ping")
            .with_status(401)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url(), session).unwrap();
        let err = api
            .get(api.endpoint(&["api", "ping"]).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), Some(ErrorKind::Unauthorized));
        assert!(matches!(events.recv().await.unwrap(), AuthEvent::LoginRequired(_)));
    }

    #[tokio::test]
    async fn test_read_json_maps_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/thing")
            .with_status(404)
            .create_async()
            .await;

        let api = ApiClient::new(&server.url(), signed_in_session()).unwrap();
        let response = api.get(api.endpoint(&["api", "thing"]).unwrap()).await.unwrap();
        let err = read_json::<serde_json::Value>(response, "Failed to fetch thing")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch thing: not found");
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }
}
