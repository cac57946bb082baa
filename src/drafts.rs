use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::api::templates::TemplateRequest;
use crate::error::{Result, TallyError};

/// Draft key of a template that has not been created yet.
pub const NEW_TEMPLATE: &str = "new";

fn slug(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// Unsaved edits of one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDraft {
    pub template_id: String,
    pub saved_at: DateTime<Utc>,
    /// Server version the edits started from.
    pub base_version: Option<u32>,
    pub request: TemplateRequest,
}

/// On-disk shadow of unsaved template edits.
///
/// Drafts survive between invocations, e.g. when a save fails because the
/// session expired, and are removed once the template is saved. One file per
/// template under `<cache dir>/tasktally/drafts/`.
pub struct DraftStore {
    dir: Option<PathBuf>,
}

impl DraftStore {
    pub fn new(enabled: bool) -> Result<Self> {
        if !enabled {
            debug!("Template drafts disabled");
            return Ok(Self::disabled());
        }

        let dir = dirs::cache_dir()
            .ok_or_else(|| TallyError::Config("No cache directory found".into()))?
            .join("tasktally")
            .join("drafts");
        Ok(Self::at(dir))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// The drafts of one user.
    pub fn for_user(&self, user_id: &str) -> Self {
        Self {
            dir: self.dir.as_ref().map(|dir| dir.join(slug(user_id))),
        }
    }

    fn file_for(dir: &Path, template_id: &str) -> PathBuf {
        dir.join(format!("{}.json", slug(template_id)))
    }

    pub fn load(&self, template_id: &str) -> Option<TemplateDraft> {
        let dir = self.dir.as_ref()?;
        let path = Self::file_for(dir, template_id);
        if !path.exists() {
            return None;
        }

        fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<TemplateDraft>(&content).ok())
            .filter(|draft| draft.template_id == template_id)
            .inspect(|_| debug!("Loaded draft from: {}", path.display()))
            .or_else(|| {
                warn!("Ignoring unreadable draft {}", path.display());
                None
            })
    }

    pub fn save(
        &self,
        template_id: &str,
        request: &TemplateRequest,
        base_version: Option<u32>,
    ) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        fs::create_dir_all(dir)?;
        let draft = TemplateDraft {
            template_id: template_id.to_string(),
            saved_at: Utc::now(),
            base_version,
            request: request.clone(),
        };
        let path = Self::file_for(dir, template_id);
        fs::write(&path, serde_json::to_string_pretty(&draft)?)?;
        debug!("Saved draft to: {}", path.display());
        Ok(())
    }

    pub fn clear(&self, template_id: &str) -> Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let path = Self::file_for(dir, template_id);
        if path.exists() {
            fs::remove_file(&path)?;
            info!("Draft cleared: {}", path.display());
        }
        Ok(())
    }
}
