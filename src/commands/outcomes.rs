use crate::api::templates::Outcome;
use crate::app::App;
use crate::editor::{set_field, EditableList, ListItem};
use crate::error::Result;
use crate::output::{items_table, render_item, with_spinner};

use super::OutputOptions;

async fn load(app: &App, user_id: &str, template_id: &str) -> Result<EditableList<Outcome>> {
    let outcomes = with_spinner(
        "Loading outcomes",
        app.templates.list_outcomes(user_id, template_id),
    )
    .await?;
    Ok(EditableList::new(outcomes))
}

fn fill(mut outcome: Outcome, assignments: &[(String, String)]) -> Result<Outcome> {
    for (field, value) in assignments {
        outcome = set_field(&outcome, field, value)?;
    }
    outcome.validate()?;
    Ok(outcome)
}

pub async fn list(app: &App, template_id: &str, output: &OutputOptions) -> Result<()> {
    let user_id = app.user_id().await?;
    let outcomes = load(app, &user_id, template_id).await?;
    output.emit(outcomes.items(), || items_table(outcomes.items()).to_string())
}

pub async fn add(
    app: &App,
    template_id: &str,
    assignments: &[(String, String)],
    output: &OutputOptions,
) -> Result<()> {
    let outcome = fill(Outcome::default(), assignments)?;
    let user_id = app.user_id().await?;

    let created = with_spinner(
        "Creating outcome",
        app.templates.create_outcome(&user_id, template_id, &outcome),
    )
    .await?;
    output.success("Outcome added");
    output.emit(&created, || render_item(&created))
}

pub async fn edit(
    app: &App,
    template_id: &str,
    reference: &str,
    assignments: &[(String, String)],
    output: &OutputOptions,
) -> Result<()> {
    let user_id = app.user_id().await?;
    let mut outcomes = load(app, &user_id, template_id).await?;
    let id = outcomes.resolve(reference)?;
    let current = outcomes.begin_edit(id)?.clone();
    let outcome = fill(current, assignments)?;

    let saved = with_spinner(
        "Saving outcome",
        app.templates.update_outcome(&user_id, template_id, &outcome),
    )
    .await?;
    output.success("Outcome updated");
    output.emit(&saved, || render_item(&saved))
}

pub async fn delete(
    app: &App,
    template_id: &str,
    reference: &str,
    output: &OutputOptions,
) -> Result<()> {
    let user_id = app.user_id().await?;
    let outcomes = load(app, &user_id, template_id).await?;
    let id = outcomes.resolve(reference)?;

    app.templates
        .delete_outcome(&user_id, template_id, id)
        .await?;
    output.success("Outcome deleted");
    list(app, template_id, output).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, OutputFormat};

    async fn app() -> App {
        let mut config = Config::default();
        config.backend.mock = true;
        config.drafts.enabled = false;
        App::connect(config).await.unwrap()
    }

    fn quiet() -> OutputOptions {
        OutputOptions {
            format: OutputFormat::Json,
            pretty: false,
        }
    }

    #[tokio::test]
    async fn test_outcome_commands() {
        let app = app().await;
        let output = quiet();

        add(
            &app,
            "2",
            &[("outcomeText".into(), "API in production".into())],
            &output,
        )
        .await
        .unwrap();
        let outcomes = app.templates.list_outcomes("demo", "2").await.unwrap();
        assert_eq!(outcomes.len(), 1);

        let reference = outcomes[0].id.to_string();
        edit(
            &app,
            "2",
            &reference,
            &[("phase".into(), "Launch".into())],
            &output,
        )
        .await
        .unwrap();
        let outcomes = app.templates.list_outcomes("demo", "2").await.unwrap();
        assert_eq!(outcomes[0].classification.phase, "Launch");
        assert_eq!(outcomes[0].outcome_text, "API in production");

        delete(&app, "2", &reference[..8], &output).await.unwrap();
        assert!(app.templates.list_outcomes("demo", "2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_by_row() {
        let app = app().await;
        let output = quiet();
        for text in ["Discovery done", "Pilot live"] {
            add(&app, "2", &[("outcomeText".into(), text.into())], &output)
                .await
                .unwrap();
        }

        edit(&app, "2", "#2", &[("track".into(), "Ops".into())], &output)
            .await
            .unwrap();
        let outcomes = app.templates.list_outcomes("demo", "2").await.unwrap();
        assert_eq!(outcomes[1].classification.track, "Ops");
        assert_eq!(outcomes[1].outcome_text, "Pilot live");

        delete(&app, "2", "#1", &output).await.unwrap();
        let outcomes = app.templates.list_outcomes("demo", "2").await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].outcome_text, "Pilot live");
        assert!(delete(&app, "2", "#5", &output).await.is_err());
    }

    #[tokio::test]
    async fn test_add_requires_text() {
        let app = app().await;
        let err = add(&app, "2", &[], &quiet()).await.unwrap_err();
        assert!(err.to_string().contains("outcomeText"));
    }
}
