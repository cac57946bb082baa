use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;

use crate::api::client::{expect_ok, read_json, ApiClient};
use crate::error::{ApiError, ErrorKind, Result, TallyError};

use super::types::{
    Credential, RepositoryValidation, RepositoryValidationRequest, SshKeyCreateRequest,
    SshKeyGenerateRequest, SshPublicKey,
};

/// Operations on a user's SSH credentials.
#[async_trait]
pub trait CredentialService: Send + Sync {
    async fn list_ssh_keys(&self, user_id: &str) -> Result<Vec<Credential>>;

    async fn create_ssh_key(&self, user_id: &str, request: &SshKeyCreateRequest) -> Result<()>;

    async fn generate_ssh_key(&self, user_id: &str, request: &SshKeyGenerateRequest)
        -> Result<()>;

    async fn get_public_key(&self, user_id: &str, name: &str) -> Result<SshPublicKey>;

    async fn delete_ssh_key(&self, user_id: &str, name: &str) -> Result<()>;

    async fn validate_repository(
        &self,
        request: &RepositoryValidationRequest,
    ) -> Result<RepositoryValidation>;
}

/// Credential service backed by the REST API.
pub struct HttpCredentialService {
    api: Arc<ApiClient>,
}

impl HttpCredentialService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CredentialService for HttpCredentialService {
    async fn list_ssh_keys(&self, user_id: &str) -> Result<Vec<Credential>> {
        let url = self.api.endpoint(&["api", "users", user_id, "ssh-keys"])?;
        let response = self.api.get(url).await?;
        read_json(response, "Failed to fetch SSH keys").await
    }

    async fn create_ssh_key(&self, user_id: &str, request: &SshKeyCreateRequest) -> Result<()> {
        let url = self.api.endpoint(&["api", "users", user_id, "ssh-keys"])?;
        let response = self.api.post(url, request).await?;
        expect_ok(response, "Failed to create SSH key")?;
        info!("Created SSH key {}", request.name);
        Ok(())
    }

    async fn generate_ssh_key(
        &self,
        user_id: &str,
        request: &SshKeyGenerateRequest,
    ) -> Result<()> {
        let url = self
            .api
            .endpoint(&["api", "users", user_id, "ssh-keys", "generate"])?;
        let response = self.api.post(url, request).await?;
        expect_ok(response, "Failed to generate SSH key")?;
        info!("Generated SSH key {}", request.name);
        Ok(())
    }

    async fn get_public_key(&self, user_id: &str, name: &str) -> Result<SshPublicKey> {
        let url = self
            .api
            .endpoint(&["api", "users", user_id, "ssh-keys", name, "public"])?;
        let response = self.api.get(url).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let kind = ErrorKind::from_status(status);
        let message = match status {
            StatusCode::NOT_FOUND => format!("SSH key \"{name}\" not found"),
            StatusCode::FORBIDDEN => "Access denied to SSH key".to_string(),
            _ => format!("Failed to fetch public key ({})", status.as_u16()),
        };
        Err(ApiError {
            kind,
            status: Some(status.as_u16()),
            message,
        }
        .into())
    }

    async fn delete_ssh_key(&self, user_id: &str, name: &str) -> Result<()> {
        let url = self
            .api
            .endpoint(&["api", "users", user_id, "ssh-keys", name])?;
        let response = self.api.delete(url).await?;
        expect_ok(response, "Failed to delete SSH key")?;
        info!("Deleted SSH key {name}");
        Ok(())
    }

    async fn validate_repository(
        &self,
        request: &RepositoryValidationRequest,
    ) -> Result<RepositoryValidation> {
        let url = self.api.endpoint(&["git", "ssh", "validate"])?;
        let response = self.api.post(url, request).await?;
        read_json(response, "Failed to validate repository").await
    }
}

/// Outcome of one item in a bulk operation.
#[derive(Debug)]
pub enum ItemStatus {
    Done,
    Failed(TallyError),
    /// Not attempted because the session was lost earlier in the batch.
    Skipped,
}

/// Per-item report of a bulk delete.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<(String, ItemStatus)>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &str> {
        self.items
            .iter()
            .filter(|(_, status)| matches!(status, ItemStatus::Done))
            .map(|(name, _)| name.as_str())
    }

    pub fn failure_count(&self) -> usize {
        self.items
            .iter()
            .filter(|(_, status)| !matches!(status, ItemStatus::Done))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.failure_count() == 0
    }
}

/// Deletes the named keys one after another.
///
/// A failing item does not stop the batch, except an authentication failure,
/// after which the remaining items are reported as skipped.
pub async fn delete_ssh_keys(
    service: &dyn CredentialService,
    user_id: &str,
    names: &[String],
) -> BatchReport {
    let mut report = BatchReport::default();
    let mut session_lost = false;

    for name in names {
        if session_lost {
            report.items.push((name.clone(), ItemStatus::Skipped));
            continue;
        }

        match service.delete_ssh_key(user_id, name).await {
            Ok(()) => report.items.push((name.clone(), ItemStatus::Done)),
            Err(e) => {
                warn!("Failed to delete SSH key {name}: {e}");
                session_lost = e.is_auth_failure();
                report.items.push((name.clone(), ItemStatus::Failed(e)));
            }
        }
    }

    debug!(
        "Bulk delete finished: {} of {} removed",
        names.len() - report.failure_count(),
        names.len()
    );
    report
}

/// Writes `<dir>/<name>.pub` holding the public key and a trailing newline.
pub async fn download_public_key(
    service: &dyn CredentialService,
    user_id: &str,
    name: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let key = service
        .get_public_key(user_id, name)
        .await
        .map_err(|e| match e {
            TallyError::Api(err) => TallyError::Api(ApiError {
                message: format!("Failed to download public key: {}", err.message),
                ..err
            }),
            other => other,
        })?;

    if name.contains(['/', '\\']) || name == ".." {
        return Err(TallyError::Input(format!("Unsafe key name: {name}")));
    }

    let path = dir.join(format!("{name}.pub"));
    let mut content = key.public_key;
    if !content.ends_with('\n') {
        content.push('\n');
    }
    fs::write(&path, content)?;
    info!("Saved public key to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::MockCredentialStore;
    use crate::api::GitProvider;
    use crate::auth::{AuthSession, SessionStore, StaticIdentity};

    fn api(url: &str) -> Arc<ApiClient> {
        let identity = Arc::new(StaticIdentity::new("ada", 300));
        let tokens = identity.issue();
        let session = AuthSession::with_tokens(identity, SessionStore::disabled(), tokens).unwrap();
        Arc::new(ApiClient::new(url, session).unwrap())
    }

    #[tokio::test]
    async fn test_list_ssh_keys() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/ada/ssh-keys")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"name":"deploy","provider":"github","scope":"user","secretRef":"s",
                    "knownHostsRef":"k","passphraseRef":"","createdAt":"2024-05-01T10:00:00Z",
                    "fingerprint":"SHA256:abc"}]"#,
            )
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let keys = service.list_ssh_keys("ada").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "deploy");
        assert_eq!(keys[0].fingerprint.as_deref(), Some("SHA256:abc"));
    }

    #[tokio::test]
    async fn test_list_failure_is_categorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/ada/ssh-keys")
            .with_status(503)
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let err = service.list_ssh_keys("ada").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ServerError));
        assert_eq!(err.to_string(), "Failed to fetch SSH keys: server error");
    }

    #[tokio::test]
    async fn test_generate_posts_to_generate_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/users/ada/ssh-keys/generate")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "name": "ci",
                "provider": "gitlab"
            })))
            .with_status(201)
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let request = SshKeyGenerateRequest {
            name: "ci".into(),
            provider: GitProvider::Gitlab,
            comment: None,
            known_hosts: None,
            passphrase: None,
            hostname: None,
        };
        service.generate_ssh_key("ada", &request).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_public_key_not_found_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/ada/ssh-keys/missing/public")
            .with_status(404)
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let err = service.get_public_key("ada", "missing").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert_eq!(err.to_string(), "SSH key \"missing\" not found");
    }

    #[tokio::test]
    async fn test_validate_repository() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/git/ssh/validate")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "sshRepoUri": "git@github.com:acme/app.git",
                "credentialName": "deploy"
            })))
            .with_status(200)
            .with_body(r#"{"valid":false,"message":"Permission denied (publickey)"}"#)
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let result = service
            .validate_repository(&RepositoryValidationRequest {
                ssh_repo_uri: "git@github.com:acme/app.git".into(),
                credential_name: "deploy".into(),
            })
            .await
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.message.as_deref(), Some("Permission denied (publickey)"));
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_each_item() {
        let store = MockCredentialStore::without_latency();
        let names = vec!["demo-key".to_string(), "ghost".to_string()];

        let report = delete_ssh_keys(&store, "ada", &names).await;

        assert_eq!(report.succeeded().collect::<Vec<_>>(), vec!["demo-key"]);
        assert_eq!(report.failure_count(), 1);
        assert!(store.list_ssh_keys("ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_delete_stops_after_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("DELETE", "/api/users/ada/ssh-keys/a")
            .with_status(403)
            .create_async()
            .await;
        let second = server
            .mock("DELETE", "/api/users/ada/ssh-keys/b")
            .with_status(401)
            .create_async()
            .await;
        let third = server
            .mock("DELETE", "/api/users/ada/ssh-keys/c")
            .expect(0)
            .create_async()
            .await;

        let service = HttpCredentialService::new(api(&server.url()));
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let report = delete_ssh_keys(&service, "ada", &names).await;

        assert_eq!(report.failure_count(), 3);
        assert!(matches!(report.items[0].1, ItemStatus::Failed(_)));
        assert!(matches!(report.items[2].1, ItemStatus::Skipped));
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_download_public_key_writes_file() {
        let store = MockCredentialStore::without_latency();
        let dir = tempfile::tempdir().unwrap();

        let path = download_public_key(&store, "ada", "demo-key", dir.path())
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "demo-key.pub");
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("ssh-ed25519 "));
        assert!(content.ends_with('\n'));
        assert!(!content.ends_with("\n\n"));
    }

    #[tokio::test]
    async fn test_download_missing_key_prefixes_message() {
        let store = MockCredentialStore::without_latency();
        let dir = tempfile::tempdir().unwrap();

        let err = download_public_key(&store, "ada", "ghost", dir.path())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to download public key: SSH key \"ghost\" not found"
        );
    }
}
