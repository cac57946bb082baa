use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::GitProvider;

/// A stored SSH credential. Secret material is only referenced, never returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub name: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub secret_ref: String,
    #[serde(default)]
    pub known_hosts_ref: String,
    #[serde(default)]
    pub passphrase_ref: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Imports an existing private key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyCreateRequest {
    pub name: String,
    pub provider: GitProvider,
    pub private_key_pem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Asks the backend to generate a key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyGenerateRequest {
    pub name: String,
    pub provider: GitProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    pub public_key: String,
    pub fingerprint_sha256: String,
    pub name: String,
    pub provider: String,
}

/// Checks that a credential can reach a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryValidationRequest {
    pub ssh_repo_uri: String,
    pub credential_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryValidation {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}
