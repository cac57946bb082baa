use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::api::MOCK_LATENCY;
use crate::error::{ApiError, Result};

use super::service::CredentialService;
use super::types::{
    Credential, RepositoryValidation, RepositoryValidationRequest, SshKeyCreateRequest,
    SshKeyGenerateRequest, SshPublicKey,
};

/// In-memory credential store for offline use and tests.
pub struct MockCredentialStore {
    keys: Mutex<Vec<Credential>>,
    counter: AtomicUsize,
    latency: Duration,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::with_latency(MOCK_LATENCY)
    }

    #[cfg(test)]
    pub fn without_latency() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        let keys = seed();
        Self {
            counter: AtomicUsize::new(keys.len() + 1),
            keys: Mutex::new(keys),
            latency,
        }
    }

    /// Restores the seed data.
    #[cfg(test)]
    pub async fn reset(&self) {
        let keys = seed();
        self.counter.store(keys.len() + 1, Ordering::SeqCst);
        *self.keys.lock().await = keys;
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn next_name(&self, requested: &str) -> String {
        if requested.trim().is_empty() {
            format!("key-{}", self.counter.fetch_add(1, Ordering::SeqCst))
        } else {
            requested.trim().to_string()
        }
    }

    async fn insert(&self, name: String, provider: &str) -> Result<()> {
        let mut keys = self.keys.lock().await;
        if keys.iter().any(|key| key.name == name) {
            return Err(ApiError::validation(format!("SSH key \"{name}\" already exists")).into());
        }
        keys.push(Credential {
            fingerprint: Some(fingerprint(&name)),
            name,
            provider: provider.to_string(),
            scope: "user".into(),
            secret_ref: String::new(),
            known_hosts_ref: String::new(),
            passphrase_ref: String::new(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}

impl Default for MockCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

fn seed() -> Vec<Credential> {
    vec![Credential {
        name: "demo-key".into(),
        provider: "github".into(),
        scope: "user".into(),
        secret_ref: String::new(),
        known_hosts_ref: String::new(),
        passphrase_ref: String::new(),
        created_at: Utc::now(),
        fingerprint: Some("AA:BB".into()),
    }]
}

fn fingerprint(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    digest[..8]
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[async_trait]
impl CredentialService for MockCredentialStore {
    async fn list_ssh_keys(&self, _user_id: &str) -> Result<Vec<Credential>> {
        self.pause().await;
        Ok(self.keys.lock().await.clone())
    }

    async fn create_ssh_key(&self, _user_id: &str, request: &SshKeyCreateRequest) -> Result<()> {
        self.pause().await;
        let name = self.next_name(&request.name);
        self.insert(name, &request.provider.to_string()).await
    }

    async fn generate_ssh_key(
        &self,
        _user_id: &str,
        request: &SshKeyGenerateRequest,
    ) -> Result<()> {
        self.pause().await;
        let name = self.next_name(&request.name);
        self.insert(name, &request.provider.to_string()).await
    }

    async fn get_public_key(&self, _user_id: &str, name: &str) -> Result<SshPublicKey> {
        self.pause().await;
        let keys = self.keys.lock().await;
        let key = keys
            .iter()
            .find(|key| key.name == name)
            .ok_or_else(|| ApiError::not_found(format!("SSH key \"{name}\" not found")))?;

        Ok(SshPublicKey {
            public_key: format!("ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIMockKey {name}"),
            fingerprint_sha256: key.fingerprint.clone().unwrap_or_default(),
            name: key.name.clone(),
            provider: key.provider.clone(),
        })
    }

    async fn delete_ssh_key(&self, _user_id: &str, name: &str) -> Result<()> {
        self.pause().await;
        let mut keys = self.keys.lock().await;
        let before = keys.len();
        keys.retain(|key| key.name != name);
        if keys.len() == before {
            return Err(ApiError::not_found(format!("SSH key \"{name}\" not found")).into());
        }
        Ok(())
    }

    async fn validate_repository(
        &self,
        request: &RepositoryValidationRequest,
    ) -> Result<RepositoryValidation> {
        self.pause().await;
        let known = self
            .keys
            .lock()
            .await
            .iter()
            .any(|key| key.name == request.credential_name);

        let uri = request.ssh_repo_uri.trim();
        let ssh_uri = uri.starts_with("git@") || uri.starts_with("ssh://");

        Ok(match (known, ssh_uri) {
            (true, true) => RepositoryValidation {
                valid: true,
                message: None,
            },
            (false, _) => RepositoryValidation {
                valid: false,
                message: Some(format!("Unknown credential \"{}\"", request.credential_name)),
            },
            (true, false) => RepositoryValidation {
                valid: false,
                message: Some("Repository URI must use SSH".into()),
            },
        })
    }
}
