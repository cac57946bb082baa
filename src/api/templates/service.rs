use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use uuid::Uuid;

use crate::api::client::{expect_ok, read_json, ApiClient};
use crate::error::Result;

use super::types::{ListResponse, Outcome, Template, TemplateRequest};

/// Template CRUD plus the outcomes sub-resource.
#[async_trait]
pub trait TemplateService: Send + Sync {
    async fn list_templates(&self, user_id: &str) -> Result<Vec<Template>>;

    async fn get_template(&self, user_id: &str, id: &str) -> Result<Template>;

    async fn create_template(&self, user_id: &str, request: &TemplateRequest)
        -> Result<Template>;

    async fn update_template(
        &self,
        user_id: &str,
        id: &str,
        request: &TemplateRequest,
    ) -> Result<Template>;

    async fn delete_template(&self, user_id: &str, id: &str) -> Result<()>;

    async fn list_outcomes(&self, user_id: &str, template_id: &str) -> Result<Vec<Outcome>>;

    async fn create_outcome(
        &self,
        user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome>;

    async fn update_outcome(
        &self,
        user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome>;

    async fn delete_outcome(&self, user_id: &str, template_id: &str, outcome_id: Uuid)
        -> Result<()>;
}

/// Template service backed by the REST API.
pub struct HttpTemplateService {
    api: Arc<ApiClient>,
}

impl HttpTemplateService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn templates_url(&self, user_id: &str, rest: &[&str]) -> Result<url::Url> {
        let mut segments = vec!["api", "users", user_id, "templates"];
        segments.extend_from_slice(rest);
        self.api.endpoint(&segments)
    }
}

#[async_trait]
impl TemplateService for HttpTemplateService {
    async fn list_templates(&self, user_id: &str) -> Result<Vec<Template>> {
        let response = self.api.get(self.templates_url(user_id, &[])?).await?;
        let list: ListResponse = read_json(response, "Failed to fetch templates").await?;
        Ok(list.into_items())
    }

    async fn get_template(&self, user_id: &str, id: &str) -> Result<Template> {
        let response = self.api.get(self.templates_url(user_id, &[id])?).await?;
        read_json(response, "Failed to fetch template").await
    }

    async fn create_template(
        &self,
        user_id: &str,
        request: &TemplateRequest,
    ) -> Result<Template> {
        let url = self.templates_url(user_id, &[])?;
        let response = self.api.post(url, request).await?;
        let template: Template = read_json(response, "Failed to create template").await?;
        info!("Created template {} ({})", template.name, template.id);
        Ok(template)
    }

    async fn update_template(
        &self,
        user_id: &str,
        id: &str,
        request: &TemplateRequest,
    ) -> Result<Template> {
        let url = self.templates_url(user_id, &[id])?;
        let response = self.api.put(url, request).await?;
        let template: Template = read_json(response, "Failed to update template").await?;
        info!("Updated template {} to version {}", template.id, template.version);
        Ok(template)
    }

    async fn delete_template(&self, user_id: &str, id: &str) -> Result<()> {
        let response = self.api.delete(self.templates_url(user_id, &[id])?).await?;
        expect_ok(response, "Failed to delete template")?;
        info!("Deleted template {id}");
        Ok(())
    }

    async fn list_outcomes(&self, user_id: &str, template_id: &str) -> Result<Vec<Outcome>> {
        let url = self.templates_url(user_id, &[template_id, "outcomes"])?;
        let response = self.api.get(url).await?;
        read_json(response, "Failed to fetch outcomes").await
    }

    async fn create_outcome(
        &self,
        user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome> {
        let url = self.templates_url(user_id, &[template_id, "outcomes"])?;
        let response = self.api.post(url, outcome).await?;
        read_json(response, "Failed to create outcome").await
    }

    async fn update_outcome(
        &self,
        user_id: &str,
        template_id: &str,
        outcome: &Outcome,
    ) -> Result<Outcome> {
        let outcome_id = outcome.id.to_string();
        let url = self.templates_url(user_id, &[template_id, "outcomes", &outcome_id])?;
        let response = self.api.put(url, outcome).await?;
        read_json(response, "Failed to update outcome").await
    }

    async fn delete_outcome(
        &self,
        user_id: &str,
        template_id: &str,
        outcome_id: Uuid,
    ) -> Result<()> {
        let outcome_id = outcome_id.to_string();
        let url = self.templates_url(user_id, &[template_id, "outcomes", &outcome_id])?;
        let response = self.api.delete(url).await?;
        expect_ok(response, "Failed to delete outcome")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::GitProvider;
    use crate::auth::{AuthSession, SessionStore, StaticIdentity};
    use crate::error::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    fn service(url: &str) -> HttpTemplateService {
        let identity = Arc::new(StaticIdentity::new("ada", 300));
        let tokens = identity.issue();
        let session = AuthSession::with_tokens(identity, SessionStore::disabled(), tokens).unwrap();
        HttpTemplateService::new(Arc::new(ApiClient::new(url, session).unwrap()))
    }

    fn template_json(id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "provider": "gitlab",
            "sshRepoUri": "git@gitlab.com:acme/app.git",
            "defaultBranch": "main",
            "credentialName": "deploy",
            "updatedAt": "2024-03-01T12:00:00Z",
            "version": 2,
            "files": { "template": { "name": name } }
        })
    }

    #[tokio::test]
    async fn test_list_accepts_wrapped_items() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/ada/templates")
            .with_status(200)
            .with_body(json!({ "items": [template_json("7", "Data platform")] }).to_string())
            .create_async()
            .await;

        let templates = service(&server.url()).list_templates("ada").await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].provider, GitProvider::Gitlab);
    }

    #[tokio::test]
    async fn test_get_missing_template() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/users/ada/templates/99")
            .with_status(404)
            .create_async()
            .await;

        let err = service(&server.url())
            .get_template("ada", "99")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
        assert_eq!(err.to_string(), "Failed to fetch template: not found");
    }

    #[tokio::test]
    async fn test_update_puts_whole_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/users/ada/templates/7")
            .match_body(Matcher::PartialJson(json!({
                "name": "Renamed",
                "sshRepoUri": "git@gitlab.com:acme/app.git",
                "files": { "template": { "name": "Renamed" } }
            })))
            .with_status(200)
            .with_body(template_json("7", "Renamed").to_string())
            .create_async()
            .await;

        let mut request = TemplateRequest {
            name: "Renamed".into(),
            provider: GitProvider::Gitlab,
            ssh_repo_uri: "git@gitlab.com:acme/app.git".into(),
            default_branch: "main".into(),
            credential_name: "deploy".into(),
            ..TemplateRequest::default()
        };
        request.files.template.name = "Renamed".into();

        let updated = service(&server.url())
            .update_template("ada", "7", &request)
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_delete() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/users/ada/templates/7")
            .with_status(403)
            .create_async()
            .await;

        let err = service(&server.url())
            .delete_template("ada", "7")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Forbidden));
        assert_eq!(err.to_string(), "Failed to delete template: permission denied");
    }

    #[tokio::test]
    async fn test_outcome_sub_resource_paths() {
        let outcome = Outcome {
            outcome_text: "Automated deployment".into(),
            ..Outcome::default()
        };
        let path = format!("/api/users/ada/templates/7/outcomes/{}", outcome.id);

        let mut server = mockito::Server::new_async().await;
        let put = server
            .mock("PUT", path.as_str())
            .with_status(200)
            .with_body(serde_json::to_string(&outcome).unwrap())
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", path.as_str())
            .with_status(204)
            .create_async()
            .await;

        let service = service(&server.url());
        let saved = service.update_outcome("ada", "7", &outcome).await.unwrap();
        assert_eq!(saved.id, outcome.id);
        service.delete_outcome("ada", "7", outcome.id).await.unwrap();

        put.assert_async().await;
        delete.assert_async().await;
    }
}
