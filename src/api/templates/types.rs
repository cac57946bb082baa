use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::GitProvider;

/// Backend identifier of a template.
pub type TemplateId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provider: GitProvider,
    pub ssh_repo_uri: String,
    pub default_branch: String,
    #[serde(default)]
    pub credential_name: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub files: FilesPayload,
}

impl Template {
    /// The editable part of the template, as sent on create and update.
    pub fn to_request(&self) -> TemplateRequest {
        TemplateRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            provider: self.provider,
            ssh_repo_uri: self.ssh_repo_uri.clone(),
            default_branch: self.default_branch.clone(),
            credential_name: self.credential_name.clone(),
            files: self.files.clone(),
        }
    }
}

/// Body of both the create and the update call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub provider: GitProvider,
    pub ssh_repo_uri: String,
    pub default_branch: String,
    pub credential_name: String,
    #[serde(default)]
    pub files: FilesPayload,
}

/// Template list as returned by the backend, either bare or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse {
    Items { items: Vec<Template> },
    Bare(Vec<Template>),
}

impl ListResponse {
    pub fn into_items(self) -> Vec<Template> {
        match self {
            Self::Items { items } | Self::Bare(items) => items,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesPayload {
    pub template: TemplateFile,
    pub outcomes: Vec<Outcome>,
    pub tasks: Vec<Task>,
    pub risks: Vec<Risk>,
    pub out_of_scope: Vec<OutOfScope>,
    pub prereqs: Vec<Prerequisite>,
    pub training: Vec<Training>,
    pub team_roles: Vec<TeamRole>,
    pub team_modeling: Vec<TeamModeling>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateFile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub technologies: Vec<String>,
}

/// Where an item sits in the delivery plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Classification {
    pub phase: String,
    pub track: String,
    pub product: String,
    pub environment: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Outcome {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub outcome_text: String,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Task {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub task_description: String,
    pub hours_best_case: u32,
    pub hours_worst_case: u32,
    pub hours_most_likely: u32,
    pub delivery_guidance: String,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Risk {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub risk: String,
    /// Percentage, 0 to 100.
    pub chance_of_occurring: u32,
    pub impact_hours_best_case: u32,
    pub impact_hours_worst_case: u32,
    pub impact_hours_most_likely: u32,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutOfScope {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub task_description: String,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prerequisite {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub assumption: String,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Training {
    pub id: Uuid,
    #[serde(flatten)]
    pub classification: Classification,
    pub client_role: String,
    pub course_name: String,
    pub course_description: String,
    pub scoping_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamRole {
    pub id: Uuid,
    pub role: String,
    pub minimum_title: String,
    pub labor_category: String,
    pub allow_partial_weeks: bool,
    pub billable_percentage: u32,
    pub subcontractor_permitted: bool,
    pub primary_skill: String,
    pub primary_skill_level: String,
    pub optional_skill1: String,
    pub optional_skill1_level: String,
    pub optional_skill2: String,
    pub optional_skill2_level: String,
    pub optional_skill3: String,
    pub optional_skill3_level: String,
    pub optional_skill4: String,
    pub optional_skill4_level: String,
    pub work_location: String,
    pub client_system_keyboard_access_type: String,
    pub clearance_requirements: String,
    pub other_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamModeling {
    pub id: Uuid,
    pub role: String,
    pub phase: String,
    pub track: String,
    pub percentage: u32,
}

/// Accepted values of the skill level fields.
pub const SKILL_LEVELS: [&str; 4] = ["Beginner", "Intermediate", "Advanced", "Expert"];

// Missing ids get a fresh one, so records loaded from older payloads stay
// addressable.
impl Default for Outcome {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            outcome_text: String::new(),
            scoping_notes: String::new(),
        }
    }
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            task_description: String::new(),
            hours_best_case: 0,
            hours_worst_case: 0,
            hours_most_likely: 0,
            delivery_guidance: String::new(),
            scoping_notes: String::new(),
        }
    }
}

impl Default for Risk {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            risk: String::new(),
            chance_of_occurring: 0,
            impact_hours_best_case: 0,
            impact_hours_worst_case: 0,
            impact_hours_most_likely: 0,
            scoping_notes: String::new(),
        }
    }
}

impl Default for OutOfScope {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            task_description: String::new(),
            scoping_notes: String::new(),
        }
    }
}

impl Default for Prerequisite {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            assumption: String::new(),
            scoping_notes: String::new(),
        }
    }
}

impl Default for Training {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            classification: Classification::default(),
            client_role: String::new(),
            course_name: String::new(),
            course_description: String::new(),
            scoping_notes: String::new(),
        }
    }
}

impl Default for TeamRole {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: String::new(),
            minimum_title: String::new(),
            labor_category: String::new(),
            allow_partial_weeks: false,
            billable_percentage: 100,
            subcontractor_permitted: false,
            primary_skill: String::new(),
            primary_skill_level: String::new(),
            optional_skill1: String::new(),
            optional_skill1_level: String::new(),
            optional_skill2: String::new(),
            optional_skill2_level: String::new(),
            optional_skill3: String::new(),
            optional_skill3_level: String::new(),
            optional_skill4: String::new(),
            optional_skill4_level: String::new(),
            work_location: String::new(),
            client_system_keyboard_access_type: String::new(),
            clearance_requirements: String::new(),
            other_notes: String::new(),
        }
    }
}

impl Default for TeamModeling {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: String::new(),
            phase: String::new(),
            track: String::new(),
            percentage: 0,
        }
    }
}
