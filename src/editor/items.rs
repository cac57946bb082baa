use indexmap::IndexMap;
use uuid::Uuid;

use crate::api::templates::{
    Classification, OutOfScope, Outcome, Prerequisite, Risk, Task, TeamModeling, TeamRole,
    Training, SKILL_LEVELS,
};
use crate::error::{Result, TallyError};
use crate::format::{or_not_specified, yes_no};

use super::fields::NumberField;
use super::list::ListItem;

/// The sub-entity lists of a template, one per editor tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ItemKind {
    Outcomes,
    Tasks,
    Risks,
    OutOfScope,
    Prereqs,
    Training,
    TeamRoles,
    TeamModeling,
}

impl ItemKind {
    pub const ALL: [ItemKind; 8] = [
        Self::Outcomes,
        Self::Tasks,
        Self::Risks,
        Self::OutOfScope,
        Self::Prereqs,
        Self::Training,
        Self::TeamRoles,
        Self::TeamModeling,
    ];

    /// Tab label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Outcomes => "Outcomes",
            Self::Tasks => "Tasks",
            Self::Risks => "Risks",
            Self::OutOfScope => "Out of Scope",
            Self::Prereqs => "Prerequisites",
            Self::Training => "Training",
            Self::TeamRoles => "Team Roles",
            Self::TeamModeling => "Team Modeling",
        }
    }
}

fn classification_rows(c: &Classification) -> Vec<(&'static str, String)> {
    vec![
        ("Phase", or_not_specified(&c.phase)),
        ("Track", or_not_specified(&c.track)),
        ("Product", or_not_specified(&c.product)),
        ("Environment", or_not_specified(&c.environment)),
        ("Prefix", or_not_specified(&c.prefix)),
    ]
}

fn push_optional(rows: &mut Vec<(&'static str, String)>, label: &'static str, value: &str) {
    if !value.trim().is_empty() {
        rows.push((label, value.to_string()));
    }
}

impl ListItem for Outcome {
    const TITLE: &'static str = "Outcome";
    const REQUIRED_FIELDS: &'static [&'static str] = &["outcomeText"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.outcome_text.as_str(),
        ]
    }

    fn summary(&self) -> String {
        self.outcome_text.clone()
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Outcome", self.outcome_text.clone()));
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl ListItem for Task {
    const TITLE: &'static str = "Task";
    const REQUIRED_FIELDS: &'static [&'static str] = &["taskDescription"];
    const NUMBER_FIELDS: &'static [NumberField] = &[
        NumberField::hours("hoursBestCase"),
        NumberField::hours("hoursWorstCase"),
        NumberField::hours("hoursMostLikely"),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.task_description.as_str(),
        ]
    }

    fn summary(&self) -> String {
        self.task_description.clone()
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Task", self.task_description.clone()));
        rows.push((
            "Hours",
            format!(
                "best {} / most likely {} / worst {}",
                self.hours_best_case, self.hours_most_likely, self.hours_worst_case
            ),
        ));
        push_optional(&mut rows, "Delivery Guidance", &self.delivery_guidance);
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl ListItem for Risk {
    const TITLE: &'static str = "Risk";
    const REQUIRED_FIELDS: &'static [&'static str] = &["risk"];
    const NUMBER_FIELDS: &'static [NumberField] = &[
        NumberField::percent("chanceOfOccurring"),
        NumberField::hours("impactHoursBestCase"),
        NumberField::hours("impactHoursWorstCase"),
        NumberField::hours("impactHoursMostLikely"),
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.risk.as_str(),
        ]
    }

    fn summary(&self) -> String {
        format!("{} ({}%)", self.risk, self.chance_of_occurring)
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Risk", self.risk.clone()));
        rows.push(("Chance", format!("{}%", self.chance_of_occurring)));
        rows.push((
            "Impact Hours",
            format!(
                "best {} / most likely {} / worst {}",
                self.impact_hours_best_case,
                self.impact_hours_most_likely,
                self.impact_hours_worst_case
            ),
        ));
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl ListItem for OutOfScope {
    const TITLE: &'static str = "Out-of-scope item";
    const REQUIRED_FIELDS: &'static [&'static str] = &["taskDescription"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.task_description.as_str(),
        ]
    }

    fn summary(&self) -> String {
        self.task_description.clone()
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Task", self.task_description.clone()));
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl ListItem for Prerequisite {
    const TITLE: &'static str = "Prerequisite";
    const REQUIRED_FIELDS: &'static [&'static str] = &["assumption"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.assumption.as_str(),
        ]
    }

    fn summary(&self) -> String {
        self.assumption.clone()
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Assumption", self.assumption.clone()));
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl ListItem for Training {
    const TITLE: &'static str = "Training";
    const REQUIRED_FIELDS: &'static [&'static str] =
        &["clientRole", "courseName", "courseDescription"];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![
            self.classification.phase.as_str(),
            self.classification.track.as_str(),
            self.course_name.as_str(),
        ]
    }

    fn summary(&self) -> String {
        format!("{} ({})", self.course_name, self.client_role)
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = classification_rows(&self.classification);
        rows.push(("Client Role", self.client_role.clone()));
        rows.push(("Course", self.course_name.clone()));
        rows.push(("Description", self.course_description.clone()));
        push_optional(&mut rows, "Scoping Notes", &self.scoping_notes);
        rows
    }
}

impl TeamRole {
    /// Named optional skills with their levels.
    pub fn optional_skills(&self) -> Vec<(&str, &str)> {
        [
            (&self.optional_skill1, &self.optional_skill1_level),
            (&self.optional_skill2, &self.optional_skill2_level),
            (&self.optional_skill3, &self.optional_skill3_level),
            (&self.optional_skill4, &self.optional_skill4_level),
        ]
        .into_iter()
        .filter(|(skill, _)| !skill.trim().is_empty())
        .map(|(skill, level)| (skill.as_str(), level.as_str()))
        .collect()
    }
}

fn check_level(field: &str, level: &str, required: bool) -> Result<()> {
    if (level.is_empty() && !required) || SKILL_LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(TallyError::Input(format!(
            "{field} must be one of {}",
            SKILL_LEVELS.join(", ")
        )))
    }
}

impl ListItem for TeamRole {
    const TITLE: &'static str = "Team role";
    const REQUIRED_FIELDS: &'static [&'static str] = &[
        "role",
        "minimumTitle",
        "laborCategory",
        "primarySkill",
        "primarySkillLevel",
        "workLocation",
        "clientSystemKeyboardAccessType",
    ];
    const NUMBER_FIELDS: &'static [NumberField] = &[NumberField::percent("billablePercentage")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![self.role.as_str(), self.labor_category.as_str()]
    }

    fn summary(&self) -> String {
        format!("{} ({})", self.role, self.minimum_title)
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("Role", self.role.clone()),
            ("Minimum Title", self.minimum_title.clone()),
            ("Labor Category", self.labor_category.clone()),
            ("Billable", format!("{}%", self.billable_percentage)),
            ("Partial Weeks", yes_no(self.allow_partial_weeks).to_string()),
            (
                "Subcontractor",
                yes_no(self.subcontractor_permitted).to_string(),
            ),
            (
                "Primary Skill",
                format!("{} ({})", self.primary_skill, self.primary_skill_level),
            ),
        ];
        let optional = self
            .optional_skills()
            .into_iter()
            .map(|(skill, level)| {
                if level.is_empty() {
                    skill.to_string()
                } else {
                    format!("{skill} ({level})")
                }
            })
            .collect::<Vec<_>>();
        if !optional.is_empty() {
            rows.push(("Optional Skills", optional.join(", ")));
        }
        rows.push(("Work Location", self.work_location.clone()));
        rows.push((
            "Keyboard Access",
            self.client_system_keyboard_access_type.clone(),
        ));
        push_optional(&mut rows, "Clearance", &self.clearance_requirements);
        push_optional(&mut rows, "Notes", &self.other_notes);
        rows
    }

    fn validate(&self) -> Result<()> {
        let missing = super::fields::missing_required(self)?;
        if !missing.is_empty() {
            return Err(TallyError::Input(format!(
                "{} is missing required fields: {}",
                Self::TITLE,
                missing.join(", ")
            )));
        }

        check_level("primarySkillLevel", &self.primary_skill_level, true)?;
        check_level("optionalSkill1Level", &self.optional_skill1_level, false)?;
        check_level("optionalSkill2Level", &self.optional_skill2_level, false)?;
        check_level("optionalSkill3Level", &self.optional_skill3_level, false)?;
        check_level("optionalSkill4Level", &self.optional_skill4_level, false)
    }
}

impl ListItem for TeamModeling {
    const TITLE: &'static str = "Team allocation";
    const REQUIRED_FIELDS: &'static [&'static str] = &["role"];
    const NUMBER_FIELDS: &'static [NumberField] = &[NumberField::percent("percentage")];

    fn id(&self) -> Uuid {
        self.id
    }

    fn key_parts(&self) -> Vec<&str> {
        vec![self.role.as_str(), self.phase.as_str(), self.track.as_str()]
    }

    fn summary(&self) -> String {
        format!("{} {}% in {}", self.role, self.percentage, self.phase)
    }

    fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Role", self.role.clone()),
            ("Phase", or_not_specified(&self.phase)),
            ("Track", or_not_specified(&self.track)),
            ("Percentage", format!("{}%", self.percentage)),
        ]
    }
}

/// Allocations grouped by role, roles in first-seen order.
pub fn group_by_role(items: &[TeamModeling]) -> IndexMap<&str, Vec<&TeamModeling>> {
    let mut groups: IndexMap<&str, Vec<&TeamModeling>> = IndexMap::new();
    for item in items {
        groups.entry(item.role.as_str()).or_default().push(item);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::list::item_key;

    fn allocation(role: &str, phase: &str, percentage: u32) -> TeamModeling {
        TeamModeling {
            role: role.into(),
            phase: phase.into(),
            percentage,
            ..TeamModeling::default()
        }
    }

    #[test]
    fn test_grouping_keeps_first_seen_order() {
        let items = vec![
            allocation("Developer", "Build", 50),
            allocation("Architect", "Design", 100),
            allocation("Developer", "Test", 25),
        ];

        let groups = group_by_role(&items);
        let roles: Vec<_> = groups.keys().copied().collect();
        assert_eq!(roles, vec!["Developer", "Architect"]);
        assert_eq!(groups["Developer"].len(), 2);
    }

    #[test]
    fn test_unspecified_classification() {
        let outcome = Outcome {
            outcome_text: "Go-live".into(),
            ..Outcome::default()
        };
        let rows = outcome.describe();
        assert_eq!(rows[0], ("Phase", "Not specified".to_string()));
        assert!(rows.iter().all(|(label, _)| *label != "Scoping Notes"));
    }

    #[test]
    fn test_composite_key_format() {
        let mut task = Task {
            task_description: "Deploy".into(),
            ..Task::default()
        };
        task.classification.phase = "Build".into();
        task.classification.track = "Ops".into();
        assert_eq!(item_key(&task, 3), "Build-Ops-Deploy-3");
    }

    #[test]
    fn test_team_role_levels_are_checked() {
        let mut role = TeamRole {
            role: "Developer".into(),
            minimum_title: "Consultant".into(),
            labor_category: "Engineering".into(),
            primary_skill: "Rust".into(),
            primary_skill_level: "Expert".into(),
            work_location: "Remote".into(),
            client_system_keyboard_access_type: "None".into(),
            ..TeamRole::default()
        };
        assert!(role.validate().is_ok());

        role.optional_skill1 = "Go".into();
        role.optional_skill1_level = "Guru".into();
        assert!(role.validate().is_err());

        role.optional_skill1_level = "Beginner".into();
        assert!(role.validate().is_ok());
        assert_eq!(role.optional_skills(), vec![("Go", "Beginner")]);

        role.primary_skill_level.clear();
        assert!(role.validate().is_err());
    }

    #[test]
    fn test_training_requires_all_course_fields() {
        let training = Training {
            course_name: "Rust 101".into(),
            ..Training::default()
        };
        let err = training.validate().unwrap_err().to_string();
        assert!(err.contains("clientRole"));
        assert!(err.contains("courseDescription"));
        assert!(!err.contains("courseName"));
    }
}
