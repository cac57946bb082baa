//! SSH credentials a template uses to reach its repository.

mod mock;
mod service;
mod types;

pub use mock::MockCredentialStore;
pub use service::{
    delete_ssh_keys, download_public_key, BatchReport, CredentialService, HttpCredentialService,
    ItemStatus,
};
pub use types::{
    Credential, RepositoryValidationRequest, SshKeyCreateRequest, SshKeyGenerateRequest,
    SshPublicKey,
};
