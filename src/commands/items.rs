use serde_json::Value;

use crate::api::templates::FilesPayload;
use crate::editor::{decrement, increment, set_field, EditableList, ItemKind, ListItem};
use crate::error::{Result, TallyError};
use crate::output::{items_table, render_item, team_modeling_table};

/// One operation on a template tab.
#[derive(Debug, Clone)]
pub enum ItemAction {
    List,
    Show(String),
    Add(Vec<(String, String)>),
    Edit(String, Vec<(String, String)>),
    Delete(String),
    Increment(String, String),
    Decrement(String, String),
}

impl ItemAction {
    pub fn changes_template(&self) -> bool {
        !matches!(self, Self::List | Self::Show(_))
    }
}

/// What an action printed, its JSON form and the alert to show.
#[derive(Debug)]
pub struct ItemOutcome {
    pub text: String,
    pub json: Value,
    pub message: Option<String>,
}

fn fill<T: ListItem>(draft: &mut T, assignments: &[(String, String)]) -> Result<()> {
    for (field, value) in assignments {
        *draft = set_field(&*draft, field, value)?;
    }
    Ok(())
}

fn discard_on_error<T: ListItem, V>(list: &mut EditableList<T>, result: Result<V>) -> Result<V> {
    if result.is_err() {
        list.cancel();
    }
    result
}

/// Applies `action` to the records of one tab.
pub fn apply<T: ListItem>(items: &mut Vec<T>, action: &ItemAction) -> Result<ItemOutcome> {
    let mut list = EditableList::new(std::mem::take(items));
    let result = run(&mut list, action);
    *items = list.into_items();
    result.map(|(text, message, item)| ItemOutcome {
        json: match item {
            Some(value) => value,
            None => serde_json::to_value(&*items).unwrap_or(Value::Null),
        },
        text,
        message,
    })
}

type RunResult = (String, Option<String>, Option<Value>);

fn run<T: ListItem>(list: &mut EditableList<T>, action: &ItemAction) -> Result<RunResult> {
    match action {
        ItemAction::List => Ok((items_table(list.items()).to_string(), None, None)),
        ItemAction::Show(reference) => {
            let id = list.resolve(reference)?;
            let item = list
                .get(id)
                .ok_or_else(|| TallyError::Input(format!("No {} with id {id}", T::TITLE)))?;
            Ok((render_item(item), None, Some(serde_json::to_value(item)?)))
        }
        ItemAction::Add(assignments) => {
            let draft = list.begin_add();
            let id = fill(draft, assignments).and_then(|()| list.save());
            let id = discard_on_error(list, id)?;
            let text = list.get(id).map(render_item).unwrap_or_default();
            Ok((text, Some(format!("{} added", T::TITLE)), None))
        }
        ItemAction::Edit(reference, assignments) => {
            let id = list.resolve(reference)?;
            let draft = list.begin_edit(id)?;
            let saved = fill(draft, assignments).and_then(|()| list.save());
            discard_on_error(list, saved)?;
            let text = list.get(id).map(render_item).unwrap_or_default();
            Ok((text, Some(format!("{} updated", T::TITLE)), None))
        }
        ItemAction::Delete(reference) => {
            let id = list.resolve(reference)?;
            let removed = list.remove(id)?;
            Ok((
                items_table(list.items()).to_string(),
                Some(format!("{} \"{}\" deleted", T::TITLE, removed.summary())),
                None,
            ))
        }
        ItemAction::Increment(reference, field) | ItemAction::Decrement(reference, field) => {
            let id = list.resolve(reference)?;
            let up = matches!(action, ItemAction::Increment(..));
            let draft = list.begin_edit(id)?;
            *draft = if up {
                increment(&*draft, field)?
            } else {
                decrement(&*draft, field)?
            };
            list.save()?;
            let text = list.get(id).map(render_item).unwrap_or_default();
            Ok((text, None, None))
        }
    }
}

/// Applies `action` to the tab `kind` of a template's files.
pub fn apply_to_files(
    files: &mut FilesPayload,
    kind: ItemKind,
    action: &ItemAction,
) -> Result<ItemOutcome> {
    match kind {
        ItemKind::Outcomes => apply(&mut files.outcomes, action),
        ItemKind::Tasks => apply(&mut files.tasks, action),
        ItemKind::Risks => apply(&mut files.risks, action),
        ItemKind::OutOfScope => apply(&mut files.out_of_scope, action),
        ItemKind::Prereqs => apply(&mut files.prereqs, action),
        ItemKind::Training => apply(&mut files.training, action),
        ItemKind::TeamRoles => apply(&mut files.team_roles, action),
        ItemKind::TeamModeling => {
            let mut outcome = apply(&mut files.team_modeling, action)?;
            if matches!(action, ItemAction::List) {
                outcome.text = team_modeling_table(&files.team_modeling).to_string();
            }
            Ok(outcome)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::templates::Task;

    fn assign(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(f, v)| ((*f).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_add_then_edit_task() {
        let mut files = FilesPayload::default();

        let added = apply_to_files(
            &mut files,
            ItemKind::Tasks,
            &ItemAction::Add(assign(&[
                ("taskDescription", "Set up CI"),
                ("hoursMostLikely", "8"),
            ])),
        )
        .unwrap();
        assert_eq!(added.message.as_deref(), Some("Task added"));
        assert_eq!(files.tasks.len(), 1);

        let id = files.tasks[0].id.to_string();
        apply_to_files(
            &mut files,
            ItemKind::Tasks,
            &ItemAction::Edit(id.clone(), assign(&[("taskDescription", "Set up CD")])),
        )
        .unwrap();
        assert_eq!(files.tasks.len(), 1);
        assert_eq!(files.tasks[0].task_description, "Set up CD");
        assert_eq!(files.tasks[0].hours_most_likely, 8);

        apply_to_files(
            &mut files,
            ItemKind::Tasks,
            &ItemAction::Increment(id[..6].to_string(), "hoursMostLikely".into()),
        )
        .unwrap();
        assert_eq!(files.tasks[0].hours_most_likely, 9);
    }

    #[test]
    fn test_invalid_add_leaves_list_untouched() {
        let mut files = FilesPayload {
            tasks: vec![Task {
                task_description: "Existing".into(),
                ..Task::default()
            }],
            ..FilesPayload::default()
        };

        let err = apply_to_files(
            &mut files,
            ItemKind::Tasks,
            &ItemAction::Add(assign(&[("hoursBestCase", "2")])),
        )
        .unwrap_err();
        assert!(err.to_string().contains("taskDescription"));
        assert_eq!(files.tasks.len(), 1);
    }

    #[test]
    fn test_delete_by_id() {
        let mut files = FilesPayload::default();
        for text in ["one", "two"] {
            apply_to_files(
                &mut files,
                ItemKind::Prereqs,
                &ItemAction::Add(assign(&[("assumption", text)])),
            )
            .unwrap();
        }

        let id = files.prereqs[0].id.to_string();
        let outcome =
            apply_to_files(&mut files, ItemKind::Prereqs, &ItemAction::Delete(id)).unwrap();
        assert_eq!(files.prereqs.len(), 1);
        assert_eq!(files.prereqs[0].assumption, "two");
        assert!(outcome.message.unwrap().contains("one"));
    }

    #[test]
    fn test_delete_by_row_number() {
        let mut files = FilesPayload::default();
        for text in ["one", "two", "three"] {
            apply_to_files(
                &mut files,
                ItemKind::Outcomes,
                &ItemAction::Add(assign(&[("outcomeText", text)])),
            )
            .unwrap();
        }

        apply_to_files(&mut files, ItemKind::Outcomes, &ItemAction::Delete("#2".into())).unwrap();
        let texts: Vec<_> = files.outcomes.iter().map(|o| o.outcome_text.as_str()).collect();
        assert_eq!(texts, vec!["one", "three"]);

        assert!(apply_to_files(&mut files, ItemKind::Outcomes, &ItemAction::Delete("#9".into())).is_err());
        assert!(apply_to_files(&mut files, ItemKind::Outcomes, &ItemAction::Delete("#0".into())).is_err());
    }

    #[test]
    fn test_row_references_in_every_action() {
        let mut files = FilesPayload::default();
        for text in ["first", "second"] {
            apply_to_files(
                &mut files,
                ItemKind::Risks,
                &ItemAction::Add(assign(&[("risk", text)])),
            )
            .unwrap();
        }

        let shown =
            apply_to_files(&mut files, ItemKind::Risks, &ItemAction::Show("#2".into())).unwrap();
        assert_eq!(shown.json["risk"], "second");

        apply_to_files(
            &mut files,
            ItemKind::Risks,
            &ItemAction::Edit("#1".into(), assign(&[("risk", "first, edited")])),
        )
        .unwrap();
        assert_eq!(files.risks[0].risk, "first, edited");
        assert_eq!(files.risks[1].risk, "second");

        apply_to_files(
            &mut files,
            ItemKind::Risks,
            &ItemAction::Increment("#1".into(), "chanceOfOccurring".into()),
        )
        .unwrap();
        assert_eq!(files.risks[0].chance_of_occurring, 5);
        apply_to_files(
            &mut files,
            ItemKind::Risks,
            &ItemAction::Decrement("#1".into(), "chanceOfOccurring".into()),
        )
        .unwrap();
        assert_eq!(files.risks[0].chance_of_occurring, 0);
    }

    #[test]
    fn test_team_modeling_rows_follow_storage_order() {
        let mut files = FilesPayload::default();
        for role in ["Developer", "QA", "Developer"] {
            apply_to_files(
                &mut files,
                ItemKind::TeamModeling,
                &ItemAction::Add(assign(&[("role", role)])),
            )
            .unwrap();
        }

        let listed =
            apply_to_files(&mut files, ItemKind::TeamModeling, &ItemAction::List).unwrap();
        let text = console::strip_ansi_codes(&listed.text).to_string();
        let qa = text.find("QA").unwrap();
        assert!(text.find("Developer").unwrap() < qa);
        assert!(text[..qa].contains('3'));

        apply_to_files(
            &mut files,
            ItemKind::TeamModeling,
            &ItemAction::Edit("#2".into(), assign(&[("phase", "Test")])),
        )
        .unwrap();
        assert_eq!(files.team_modeling[1].role, "QA");
        assert_eq!(files.team_modeling[1].phase, "Test");
    }

    #[test]
    fn test_list_is_read_only() {
        assert!(!ItemAction::List.changes_template());
        assert!(ItemAction::Delete("x".into()).changes_template());

        let mut files = FilesPayload::default();
        let outcome = apply_to_files(&mut files, ItemKind::TeamModeling, &ItemAction::List).unwrap();
        assert!(outcome.text.contains("No team allocations"));
        assert_eq!(outcome.json, Value::Array(vec![]));
    }
}
