use std::fs;
use std::path::{Path, PathBuf};

use crate::api::credentials::{
    delete_ssh_keys, download_public_key, RepositoryValidationRequest, SshKeyCreateRequest,
    SshKeyGenerateRequest,
};
use crate::api::GitProvider;
use crate::app::App;
use crate::error::{Result, TallyError};
use crate::output::{
    alert, credentials_table, render_batch_report, render_public_key, with_spinner, AlertLevel,
};

use super::OutputOptions;

/// Options shared by the generate and import flows.
#[derive(Debug, Clone, Default)]
pub struct KeyOptions {
    pub known_hosts: Option<String>,
    pub passphrase: Option<String>,
    pub hostname: Option<String>,
}

pub async fn list(app: &App, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let keys = with_spinner("Loading SSH keys", app.credentials.list_ssh_keys(&user_id)).await?;
    output.emit(&keys, || credentials_table(&keys).to_string())
}

pub async fn generate(
    app: &App,
    name: String,
    provider: GitProvider,
    comment: Option<String>,
    options: KeyOptions,
    output: &OutputOptions,
) -> Result<()> {
    let user_id = app.user_id().await?;
    let request = SshKeyGenerateRequest {
        name,
        provider,
        comment,
        known_hosts: options.known_hosts,
        passphrase: options.passphrase,
        hostname: options.hostname,
    };

    with_spinner(
        "Generating SSH key",
        app.credentials.generate_ssh_key(&user_id, &request),
    )
    .await?;
    output.success("SSH key generated");
    list(app, output).await
}

pub async fn import(
    app: &App,
    name: String,
    provider: GitProvider,
    private_key: &Path,
    options: KeyOptions,
    output: &OutputOptions,
) -> Result<()> {
    let private_key_pem = fs::read_to_string(private_key).map_err(|e| {
        TallyError::Input(format!("Cannot read {}: {e}", private_key.display()))
    })?;
    if private_key_pem.trim().is_empty() {
        return Err(TallyError::Input("Private key file is empty".into()));
    }

    let user_id = app.user_id().await?;
    let request = SshKeyCreateRequest {
        name,
        provider,
        private_key_pem,
        known_hosts: options.known_hosts,
        passphrase: options.passphrase,
        hostname: options.hostname,
    };

    with_spinner(
        "Importing SSH key",
        app.credentials.create_ssh_key(&user_id, &request),
    )
    .await?;
    output.success("SSH key created");
    list(app, output).await
}

/// Deletes the selected keys one by one and lists what is left.
pub async fn delete(app: &App, names: &[String], output: &OutputOptions) -> Result<()> {
    if names.is_empty() {
        return Err(TallyError::Input("Select at least one SSH key".into()));
    }

    let user_id = app.user_id().await?;
    let report = delete_ssh_keys(app.credentials.as_ref(), &user_id, names).await;

    if !output.is_json() {
        eprint!("{}", render_batch_report(&report));
    }
    if report.is_complete() {
        output.success(&format!("Deleted {} SSH key(s)", report.succeeded().count()));
    } else {
        alert(
            AlertLevel::Warning,
            &format!(
                "{} of {} SSH key(s) could not be deleted",
                report.failure_count(),
                names.len()
            ),
        );
    }

    list(app, output).await
}

pub async fn public_key(
    app: &App,
    name: &str,
    save_to: Option<PathBuf>,
    output: &OutputOptions,
) -> Result<()> {
    let user_id = app.user_id().await?;

    if let Some(dir) = save_to {
        let path = download_public_key(app.credentials.as_ref(), &user_id, name, &dir).await?;
        output.success(&format!("Saved {}", path.display()));
        return Ok(());
    }

    let key = app.credentials.get_public_key(&user_id, name).await?;
    output.emit(&key, || render_public_key(&key))
}

pub async fn validate(
    app: &App,
    ssh_repo_uri: String,
    credential_name: String,
    output: &OutputOptions,
) -> Result<()> {
    let request = RepositoryValidationRequest {
        ssh_repo_uri,
        credential_name,
    };
    let result = with_spinner(
        "Checking repository access",
        app.credentials.validate_repository(&request),
    )
    .await?;

    if output.is_json() {
        return output.emit(&result, String::new);
    }

    if result.valid {
        alert(AlertLevel::Success, "Repository is reachable");
    } else {
        let reason = result.message.as_deref().unwrap_or("no reason given");
        alert(
            AlertLevel::Danger,
            &format!("Repository is not reachable: {reason}"),
        );
    }
    Ok(())
}
