//! Estimation templates and their outcomes sub-resource.

mod mock;
mod service;
mod types;

pub use mock::MockTemplateStore;
pub use service::{HttpTemplateService, TemplateService};
pub use types::{
    Classification, FilesPayload, OutOfScope, Outcome, Prerequisite, Risk, Task, TeamModeling,
    TeamRole, Template, TemplateRequest, Training, SKILL_LEVELS,
};
