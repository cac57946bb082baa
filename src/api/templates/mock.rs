use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{GitProvider, MOCK_LATENCY};
use crate::error::{ApiError, Result};

use super::service::TemplateService;
use super::types::{FilesPayload, Outcome, Template, TemplateFile, TemplateRequest};

const FIRST_FREE_ID: u64 = 3;

/// In-memory template store for offline use and tests.
pub struct MockTemplateStore {
    templates: Mutex<Vec<Template>>,
    counter: AtomicU64,
    latency: Duration,
}

impl MockTemplateStore {
    pub fn new() -> Self {
        Self::with_latency(MOCK_LATENCY)
    }

    #[cfg(test)]
    pub fn without_latency() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            templates: Mutex::new(seed()),
            counter: AtomicU64::new(FIRST_FREE_ID),
            latency,
        }
    }

    #[cfg(test)]
    pub async fn reset(&self) {
        *self.templates.lock().await = seed();
        self.counter.store(FIRST_FREE_ID, Ordering::SeqCst);
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockTemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_template(
    id: &str,
    name: &str,
    description: &str,
    provider: GitProvider,
    ssh_repo_uri: &str,
    credential_name: &str,
    file_name: &str,
) -> Template {
    Template {
        id: id.into(),
        name: name.into(),
        description: Some(description.into()),
        provider,
        ssh_repo_uri: ssh_repo_uri.into(),
        default_branch: "main".into(),
        credential_name: credential_name.into(),
        updated_at: Utc::now(),
        version: 1,
        files: FilesPayload {
            template: TemplateFile {
                name: file_name.into(),
                ..TemplateFile::default()
            },
            ..FilesPayload::default()
        },
    }
}

fn seed() -> Vec<Template> {
    vec![
        seed_template(
            "1",
            "Starter Template",
            "Seed repository",
            GitProvider::Github,
            "git@github.com:example/starter.git",
            "github-creds",
            "Starter",
        ),
        seed_template(
            "2",
            "Backend Template",
            "Quarkus backend",
            GitProvider::Gitlab,
            "git@gitlab.com:example/backend.git",
            "gitlab-creds",
            "Backend",
        ),
    ]
}

fn template_not_found() -> ApiError {
    ApiError::not_found("Template not found")
}

fn apply(template: &mut Template, request: &TemplateRequest) {
    template.name = request.name.clone();
    template.description = request.description.clone();
    template.provider = request.provider;
    template.ssh_repo_uri = request.ssh_repo_uri.clone();
    template.default_branch = request.default_branch.clone();
    template.credential_name = request.credential_name.clone();
    template.files = request.files.clone();
    template.updated_at = Utc::now();
}

#[async_trait]
impl TemplateService for MockTemplateStore {
    async fn list_templates(&self, _user_id: &str) -> Result<Vec<Template>> {
        self.pause().await;
        Ok(self.templates.lock().await.clone())
    }

    async fn get_template(&self, _user_id: &str, id: &str) -> Result<Template> {
        self.pause().await;
        self.templates
            .lock()
            .await
            .iter()
            .find(|template| template.id == id)
            .cloned()
            .ok_or_else(|| template_not_found().into())
    }

    async fn create_template(
        &self,
        _user_id: &str,
        request: &TemplateRequest,
    ) -> Result<Template> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        if templates
            .iter()
            .any(|template| template.ssh_repo_uri == request.ssh_repo_uri)
        {
            return Err(ApiError::validation("Template for repository already exists").into());
        }

        let id = self.counter.fetch_add(1, Ordering::SeqCst).to_string();
        let mut template = Template {
            id,
            name: String::new(),
            description: None,
            provider: request.provider,
            ssh_repo_uri: String::new(),
            default_branch: String::new(),
            credential_name: String::new(),
            updated_at: Utc::now(),
            version: 1,
            files: FilesPayload::default(),
        };
        apply(&mut template, request);
        templates.push(template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        _user_id: &str,
        id: &str,
        request: &TemplateRequest,
    ) -> Result<Template> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        let template = templates
            .iter_mut()
            .find(|template| template.id == id)
            .ok_or_else(template_not_found)?;
        apply(template, request);
        Ok(template.clone())
    }

    async fn delete_template(&self, _user_id: &str, id: &str) -> Result<()> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        let before = templates.len();
        templates.retain(|template| template.id != id);
        if templates.len() == before {
            return Err(template_not_found().into());
        }
        Ok(())
    }

    async fn list_outcomes(&self, user_id: &str, template_id: &str) -> Result<Vec<Outcome>> {
        Ok(self.get_template(user_id, template_id).await?.files.outcomes)
    }

    async fn create_outcome(
        &self,
        _user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        let template = templates
            .iter_mut()
            .find(|template| template.id == template_id)
            .ok_or_else(template_not_found)?;

        let mut created = outcome.clone();
        if template.files.outcomes.iter().any(|o| o.id == created.id) {
            created.id = Uuid::new_v4();
        }
        template.files.outcomes.push(created.clone());
        template.updated_at = Utc::now();
        Ok(created)
    }

    async fn update_outcome(
        &self,
        _user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        let template = templates
            .iter_mut()
            .find(|template| template.id == template_id)
            .ok_or_else(template_not_found)?;

        let slot = template
            .files
            .outcomes
            .iter_mut()
            .find(|o| o.id == outcome.id)
            .ok_or_else(|| ApiError::not_found("Outcome not found"))?;
        *slot = outcome.clone();
        template.updated_at = Utc::now();
        Ok(outcome.clone())
    }

    async fn delete_outcome(
        &self,
        _user_id: &str,
        template_id: &str,
        outcome_id: Uuid,
    ) -> Result<()> {
        self.pause().await;
        let mut templates = self.templates.lock().await;
        let template = templates
            .iter_mut()
            .find(|template| template.id == template_id)
            .ok_or_else(template_not_found)?;

        let before = template.files.outcomes.len();
        template.files.outcomes.retain(|o| o.id != outcome_id);
        if template.files.outcomes.len() == before {
            return Err(ApiError::not_found("Outcome not found").into());
        }
        template.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio_test::assert_ok;

    fn request(name: &str, uri: &str) -> TemplateRequest {
        TemplateRequest {
            name: name.into(),
            description: None,
            provider: GitProvider::Github,
            ssh_repo_uri: uri.into(),
            default_branch: "main".into(),
            credential_name: "demo-key".into(),
            files: FilesPayload::default(),
        }
    }

    async fn names(store: &MockTemplateStore) -> Vec<String> {
        store
            .list_templates("ada")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect()
    }

    #[tokio::test]
    async fn test_seeded_templates_are_listed() {
        let store = MockTemplateStore::without_latency();
        assert_eq!(names(&store).await, vec!["Starter Template", "Backend Template"]);
    }

    #[tokio::test]
    async fn test_created_template_appears_in_list() {
        let store = MockTemplateStore::without_latency();
        let created = assert_ok!(
            store
                .create_template("ada", &request("Data platform", "git@github.com:acme/data.git"))
                .await
        );

        assert_eq!(created.id, "3");
        assert_eq!(created.version, 1);
        assert!(names(&store).await.contains(&"Data platform".to_string()));
    }

    #[tokio::test]
    async fn test_duplicate_repository_is_rejected() {
        let store = MockTemplateStore::without_latency();
        let err = store
            .create_template(
                "ada",
                &request("Copy", "git@github.com:example/starter.git"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Template for repository already exists");
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert_eq!(names(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_does_not_duplicate() {
        let store = MockTemplateStore::without_latency();
        let mut edit = store.get_template("ada", "1").await.unwrap().to_request();
        edit.name = "Starter v2".into();

        let updated = store.update_template("ada", "1", &edit).await.unwrap();
        assert_eq!(updated.id, "1");
        assert_eq!(names(&store).await, vec!["Starter v2", "Backend Template"]);
    }

    #[tokio::test]
    async fn test_missing_template() {
        let store = MockTemplateStore::without_latency();
        let err = store.get_template("ada", "42").await.unwrap_err();
        assert_eq!(err.to_string(), "Template not found");

        let err = store
            .update_template("ada", "42", &request("x", "git@x:y.git"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_delete_removes_template() {
        let store = MockTemplateStore::without_latency();
        store.delete_template("ada", "2").await.unwrap();
        assert_eq!(names(&store).await, vec!["Starter Template"]);

        store.reset().await;
        assert_eq!(names(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_outcome_lifecycle() {
        let store = MockTemplateStore::without_latency();
        let outcome = Outcome {
            outcome_text: "CI pipeline live".into(),
            ..Outcome::default()
        };

        let created = store.create_outcome("ada", "1", &outcome).await.unwrap();
        let mut edited = created.clone();
        edited.scoping_notes = "GitHub Actions".into();
        store.update_outcome("ada", "1", &edited).await.unwrap();

        let outcomes = store.list_outcomes("ada", "1").await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].scoping_notes, "GitHub Actions");

        store.delete_outcome("ada", "1", created.id).await.unwrap();
        assert!(store.list_outcomes("ada", "1").await.unwrap().is_empty());

        let err = store
            .delete_outcome("ada", "1", created.id)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Outcome not found");
    }
}
