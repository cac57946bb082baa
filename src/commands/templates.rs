use indexmap::IndexMap;
use log::{debug, warn};

use crate::api::credentials::RepositoryValidationRequest;
use crate::api::templates::{Template, TemplateRequest};
use crate::api::GitProvider;
use crate::app::App;
use crate::drafts::NEW_TEMPLATE;
use crate::editor::ItemKind;
use crate::error::{Result, TallyError};
use crate::estimate::{summarize, EstimateSummary};
use crate::format::format_date;
use crate::output::{
    alert, estimate_table, magenta_bold, render_template, templates_table, with_spinner, AlertLevel,
};

use super::items::{apply_to_files, ItemAction};
use super::OutputOptions;

/// Core fields of a new template.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub description: Option<String>,
    pub provider: GitProvider,
    pub ssh_repo_uri: String,
    pub default_branch: String,
    pub credential_name: String,
    pub template_name: Option<String>,
    pub technologies: Vec<String>,
    /// Check repository access with the credential before creating.
    pub validate: bool,
}

/// Core field changes; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct TemplateEdits {
    pub name: Option<String>,
    pub description: Option<String>,
    pub provider: Option<GitProvider>,
    pub ssh_repo_uri: Option<String>,
    pub default_branch: Option<String>,
    pub credential_name: Option<String>,
    pub template_name: Option<String>,
    pub technologies: Option<Vec<String>>,
}

impl TemplateEdits {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.provider.is_none()
            && self.ssh_repo_uri.is_none()
            && self.default_branch.is_none()
            && self.credential_name.is_none()
            && self.template_name.is_none()
            && self.technologies.is_none()
    }

    pub fn apply(self, request: &mut TemplateRequest) {
        if let Some(name) = self.name {
            request.name = name;
        }
        if let Some(description) = self.description {
            request.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(provider) = self.provider {
            request.provider = provider;
        }
        if let Some(uri) = self.ssh_repo_uri {
            request.ssh_repo_uri = uri;
        }
        if let Some(branch) = self.default_branch {
            request.default_branch = branch;
        }
        if let Some(credential) = self.credential_name {
            request.credential_name = credential;
        }
        if let Some(template_name) = self.template_name {
            request.files.template.name = template_name;
        }
        if let Some(technologies) = self.technologies {
            request.files.template.technologies = technologies;
        }
    }
}

/// Rejects requests with blank required core fields.
pub fn validate_request(request: &TemplateRequest) -> Result<()> {
    let missing: Vec<&str> = [
        ("name", request.name.as_str()),
        ("sshRepoUri", request.ssh_repo_uri.as_str()),
        ("defaultBranch", request.default_branch.as_str()),
        ("credentialName", request.credential_name.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TallyError::Input(format!(
            "Template is missing required fields: {}",
            missing.join(", ")
        )))
    }
}

/// A template opened for editing, from a stored draft or the server.
struct Editing {
    request: TemplateRequest,
    base_version: Option<u32>,
}

async fn open_for_edit(app: &App, user_id: &str, id: &str) -> Result<Editing> {
    if let Some(draft) = app.drafts.for_user(user_id).load(id) {
        alert(
            AlertLevel::Info,
            &format!(
                "Resuming unsaved changes from {}",
                format_date(&draft.saved_at)
            ),
        );
        return Ok(Editing {
            request: draft.request,
            base_version: draft.base_version,
        });
    }

    let template = with_spinner("Loading template", app.templates.get_template(user_id, id)).await?;
    Ok(Editing {
        request: template.to_request(),
        base_version: Some(template.version),
    })
}

/// Saves `editing` over template `id`. The edits stay in the draft store
/// until the backend accepts them.
async fn save_with_draft(app: &App, user_id: &str, id: &str, editing: &Editing) -> Result<Template> {
    let drafts = app.drafts.for_user(user_id);
    if let Err(e) = drafts.save(id, &editing.request, editing.base_version) {
        warn!("Could not store draft for template {id}: {e}");
    }

    let result = with_spinner(
        "Saving template",
        app.templates.update_template(user_id, id, &editing.request),
    )
    .await;

    match result {
        Ok(template) => {
            if editing
                .base_version
                .is_some_and(|base| template.version > base + 1)
            {
                alert(
                    AlertLevel::Warning,
                    "The template changed on the server while you edited it; your version replaced it",
                );
            }
            if let Err(e) = drafts.clear(id) {
                warn!("Could not clear draft for template {id}: {e}");
            }
            Ok(template)
        }
        Err(e) => {
            if drafts.is_enabled() {
                alert(
                    AlertLevel::Warning,
                    &format!(
                        "Changes kept as a draft; run `tasktally templates save-draft {id}` to retry"
                    ),
                );
            }
            Err(e)
        }
    }
}

pub async fn list(app: &App, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let templates =
        with_spinner("Loading templates", app.templates.list_templates(&user_id)).await?;
    output.emit(&templates, || templates_table(&templates).to_string())
}

pub async fn show(app: &App, id: &str, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let template = with_spinner("Loading template", app.templates.get_template(&user_id, id)).await?;
    if app.drafts.for_user(&user_id).load(id).is_some() {
        alert(AlertLevel::Info, "This template has unsaved changes in a draft");
    }
    output.emit(&template, || render_template(&template))
}

/// Summarizes hours and risk exposure for each template, fetched in parallel.
pub async fn estimate(app: &App, ids: &[String], output: &OutputOptions) -> Result<()> {
    if ids.is_empty() {
        return Err(TallyError::Input("Select at least one template".into()));
    }

    let user_id = app.user_id().await?;
    let fetches: Vec<_> = ids
        .iter()
        .map(|id| app.templates.get_template(&user_id, id))
        .collect();
    let templates = with_spinner("Loading templates", async {
        futures::future::join_all(fetches)
            .await
            .into_iter()
            .collect::<Result<Vec<Template>>>()
    })
    .await?;

    let summaries: IndexMap<String, EstimateSummary> = templates
        .iter()
        .map(|template| (template.id.clone(), summarize(&template.files)))
        .collect();

    output.emit(&summaries, || {
        templates
            .iter()
            .zip(summaries.values())
            .map(|(template, summary)| {
                format!(
                    "{}\n{}",
                    magenta_bold(&template.name),
                    estimate_table(summary)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    })
}

pub async fn create(app: &App, new: NewTemplate, output: &OutputOptions) -> Result<()> {
    let mut request = TemplateRequest {
        name: new.name,
        description: new.description.filter(|d| !d.trim().is_empty()),
        provider: new.provider,
        ssh_repo_uri: new.ssh_repo_uri,
        default_branch: new.default_branch,
        credential_name: new.credential_name,
        ..TemplateRequest::default()
    };
    request.files.template.name = new.template_name.unwrap_or_else(|| request.name.clone());
    request.files.template.technologies = new.technologies;
    validate_request(&request)?;

    let user_id = app.user_id().await?;

    if new.validate {
        let check = with_spinner(
            "Checking repository access",
            app.credentials.validate_repository(&RepositoryValidationRequest {
                ssh_repo_uri: request.ssh_repo_uri.clone(),
                credential_name: request.credential_name.clone(),
            }),
        )
        .await?;
        if !check.valid {
            return Err(TallyError::Input(format!(
                "Repository is not reachable: {}",
                check.message.as_deref().unwrap_or("no reason given")
            )));
        }
    }

    let drafts = app.drafts.for_user(&user_id);
    if let Err(e) = drafts.save(NEW_TEMPLATE, &request, None) {
        warn!("Could not store draft for new template: {e}");
    }
    let template = with_spinner(
        "Creating template",
        app.templates.create_template(&user_id, &request),
    )
    .await?;
    if let Err(e) = drafts.clear(NEW_TEMPLATE) {
        warn!("Could not clear draft for new template: {e}");
    }

    output.success(&format!("Template \"{}\" created", template.name));
    output.emit(&template, || render_template(&template))
}

pub async fn edit(app: &App, id: &str, edits: TemplateEdits, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let mut editing = open_for_edit(app, &user_id, id).await?;
    edits.apply(&mut editing.request);
    validate_request(&editing.request)?;

    let template = save_with_draft(app, &user_id, id, &editing).await?;
    output.success(&format!("Template \"{}\" saved", template.name));
    output.emit(&template, || render_template(&template))
}

/// Deletes the selected templates one after another.
pub async fn delete(app: &App, ids: &[String], output: &OutputOptions) -> Result<()> {
    if ids.is_empty() {
        return Err(TallyError::Input("Select at least one template".into()));
    }

    let user_id = app.user_id().await?;
    let mut failed = 0;
    for id in ids {
        match app.templates.delete_template(&user_id, id).await {
            Ok(()) => {
                if let Err(e) = app.drafts.for_user(&user_id).clear(id) {
                    warn!("Could not clear draft for template {id}: {e}");
                }
                output.success(&format!("Template {id} deleted"));
            }
            Err(e) if e.is_auth_failure() => return Err(e),
            Err(e) => {
                failed += 1;
                alert(AlertLevel::Danger, &e.to_string());
            }
        }
    }

    if failed > 0 {
        alert(
            AlertLevel::Warning,
            &format!("{failed} of {} template(s) could not be deleted", ids.len()),
        );
    }
    list(app, output).await
}

/// Retries saving a stored draft.
pub async fn save_draft(app: &App, id: &str, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let drafts = app.drafts.for_user(&user_id);
    let draft = drafts
        .load(id)
        .ok_or_else(|| TallyError::Input(format!("No draft stored for template {id}")))?;

    if id == NEW_TEMPLATE {
        validate_request(&draft.request)?;
        let template = with_spinner(
            "Creating template",
            app.templates.create_template(&user_id, &draft.request),
        )
        .await?;
        if let Err(e) = drafts.clear(NEW_TEMPLATE) {
            warn!("Could not clear draft for new template: {e}");
        }
        output.success(&format!("Template \"{}\" created", template.name));
        return output.emit(&template, || render_template(&template));
    }

    let editing = Editing {
        request: draft.request,
        base_version: draft.base_version,
    };
    let template = save_with_draft(app, &user_id, id, &editing).await?;
    output.success(&format!("Template \"{}\" saved", template.name));
    output.emit(&template, || render_template(&template))
}

pub async fn discard_draft(app: &App, id: &str) -> Result<()> {
    let drafts = app.drafts.for_user(&app.user_id().await?);
    if drafts.load(id).is_none() {
        alert(AlertLevel::Info, &format!("No draft stored for template {id}"));
        return Ok(());
    }
    drafts.clear(id)?;
    alert(AlertLevel::Success, "Draft discarded");
    Ok(())
}

/// Runs an item action on one tab of a template and saves changes.
pub async fn items(
    app: &App,
    id: &str,
    kind: ItemKind,
    action: ItemAction,
    output: &OutputOptions,
) -> Result<()> {
    let user_id = app.user_id().await?;
    let mut editing = open_for_edit(app, &user_id, id).await?;
    let outcome = apply_to_files(&mut editing.request.files, kind, &action)?;

    if action.changes_template() {
        debug!("Saving {} change on template {id}", kind.label());
        save_with_draft(app, &user_id, id, &editing).await?;
        if let Some(message) = &outcome.message {
            output.success(message);
        }
    }

    output.emit(&outcome.json, || outcome.text.clone())
}
