use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::api::credentials::Credential;
use crate::api::templates::{TeamModeling, Template};
use crate::editor::{group_by_role, item_key, ListItem};
use crate::estimate::EstimateSummary;
use crate::format::{format_date, truncate_default};

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn provider_cell(provider: &str) -> Cell {
    match provider {
        "github" => Cell::new("GitHub").fg(TableColor::Magenta),
        "gitlab" => Cell::new("GitLab").fg(TableColor::Yellow),
        other => Cell::new(other),
    }
}

fn empty_row(message: &str, columns: usize) -> Vec<Cell> {
    let mut row = vec![Cell::new(message).fg(TableColor::DarkGrey)];
    row.extend(vec![Cell::new(""); columns.saturating_sub(1)]);
    row
}

pub fn credentials_table(credentials: &[Credential]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Name",
        "Provider",
        "Fingerprint",
        "Created",
    ]));

    if credentials.is_empty() {
        table.add_row(empty_row("No SSH keys found", 4));
    }

    for credential in credentials {
        table.add_row(vec![
            Cell::new(&credential.name),
            provider_cell(&credential.provider),
            Cell::new(credential.fingerprint.as_deref().unwrap_or("-")),
            Cell::new(format_date(&credential.created_at)),
        ]);
    }
    table
}

pub fn templates_table(templates: &[Template]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "ID",
        "Name",
        "Provider",
        "Repository",
        "Branch",
        "Version",
        "Updated",
    ]));

    if templates.is_empty() {
        table.add_row(empty_row("No templates found", 7));
    }

    for template in templates {
        table.add_row(vec![
            Cell::new(&template.id),
            Cell::new(truncate_default(&template.name)),
            provider_cell(&template.provider.to_string()),
            Cell::new(&template.ssh_repo_uri),
            Cell::new(&template.default_branch),
            Cell::new(template.version),
            Cell::new(format_date(&template.updated_at)),
        ]);
    }
    table
}

/// Rows of one editor tab with short ids to address them.
pub fn items_table<T: ListItem>(items: &[T]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["#", "ID", "Key", T::TITLE]));

    if items.is_empty() {
        table.add_row(empty_row(&format!("No {} entries", T::TITLE), 4));
    }

    for (index, item) in items.iter().enumerate() {
        let id = item.id().to_string();
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&id[..8]).fg(TableColor::DarkGrey),
            Cell::new(truncate_default(&item_key(item, index))),
            Cell::new(truncate_default(&item.summary())),
        ]);
    }
    table
}

/// Label/value view of a single record.
pub fn details_table(rows: &[(&str, String)]) -> Table {
    let mut table = create_table();
    for (label, value) in rows {
        table.add_row(vec![Cell::new(*label).fg(TableColor::Cyan), Cell::new(value)]);
    }
    table
}

/// Allocations grouped by role; `#` is the storage row used by `#row` references.
pub fn team_modeling_table(items: &[TeamModeling]) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["#", "Role", "Phase", "Track", "Percentage"]));

    if items.is_empty() {
        table.add_row(empty_row("No team allocations", 5));
    }

    for (role, allocations) in group_by_role(items) {
        for (position, allocation) in allocations.iter().enumerate() {
            let row = items
                .iter()
                .position(|item| item.id == allocation.id)
                .map_or(0, |index| index + 1);
            let role_cell = if position == 0 {
                Cell::new(role).fg(TableColor::Cyan)
            } else {
                Cell::new("")
            };
            table.add_row(vec![
                Cell::new(row).fg(TableColor::DarkGrey),
                role_cell,
                Cell::new(&allocation.phase),
                Cell::new(&allocation.track),
                Cell::new(format!("{}%", allocation.percentage)),
            ]);
        }
    }
    table
}

pub fn estimate_table(summary: &EstimateSummary) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["Measure", "Hours"]));
    table.add_row(vec![
        Cell::new(format!("Tasks ({})", summary.task_count)),
        Cell::new(format!(
            "{} / {} / {}",
            summary.best_case_hours, summary.most_likely_hours, summary.worst_case_hours
        )),
    ]);
    table.add_row(vec![
        Cell::new("Expected (PERT)"),
        Cell::new(format!("{:.1}", summary.expected_hours)),
    ]);
    table.add_row(vec![
        Cell::new(format!("Risk exposure ({})", summary.risk_count)),
        Cell::new(format!("{:.1}", summary.risk_exposure_hours)),
    ]);
    table.add_row(vec![
        Cell::new("Total").fg(TableColor::Green),
        Cell::new(format!("{:.1}", summary.total_hours)).fg(TableColor::Green),
    ]);
    for (role, percentage) in &summary.allocation_by_role {
        table.add_row(vec![
            Cell::new(format!("Allocation: {role}")).fg(TableColor::DarkGrey),
            Cell::new(format!("{percentage}%")),
        ]);
    }
    table
}
