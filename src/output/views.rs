use std::fmt::Write;

use crate::api::credentials::{BatchReport, ItemStatus, SshPublicKey};
use crate::api::templates::Template;
use crate::auth::AuthUser;
use crate::editor::{ItemKind, ListItem};
use crate::estimate::summarize;
use crate::format::{format_date, or_not_specified};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{details_table, estimate_table, team_modeling_table};

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

/// Detail page of a template: core fields, tab sizes and the estimate.
pub fn render_template(template: &Template) -> String {
    let mut output = String::new();
    let files = &template.files;

    add_section_header(&mut output, "📄", &template.name);
    let _ = writeln!(
        output,
        "{}\n",
        details_table(&[
            ("ID", template.id.clone()),
            (
                "Description",
                or_not_specified(template.description.as_deref().unwrap_or_default()),
            ),
            ("Provider", template.provider.to_string()),
            ("Repository", template.ssh_repo_uri.clone()),
            ("Branch", template.default_branch.clone()),
            ("Credential", or_not_specified(&template.credential_name)),
            ("Version", template.version.to_string()),
            ("Updated", format_date(&template.updated_at)),
            ("Template File", or_not_specified(&files.template.name)),
            ("Technologies", or_not_specified(&files.template.technologies.join(", "))),
        ])
    );

    add_section_header(&mut output, "🗂", "Contents");
    let counts = [
        files.outcomes.len(),
        files.tasks.len(),
        files.risks.len(),
        files.out_of_scope.len(),
        files.prereqs.len(),
        files.training.len(),
        files.team_roles.len(),
        files.team_modeling.len(),
    ];
    for (kind, count) in ItemKind::ALL.iter().zip(counts) {
        let _ = writeln!(output, "  {} {}", dim(format!("{}:", kind.label())), cyan(count));
    }
    output.push('\n');

    if !files.team_modeling.is_empty() {
        add_section_header(&mut output, "👥", "Team Modeling");
        let _ = writeln!(output, "{}\n", team_modeling_table(&files.team_modeling));
    }

    add_section_header(&mut output, "⏱", "Estimate");
    let _ = writeln!(output, "{}", estimate_table(&summarize(files)));
    output
}

pub fn render_item<T: ListItem>(item: &T) -> String {
    let mut output = String::new();
    add_section_header(&mut output, "•", &format!("{} {}", T::TITLE, item.id()));
    let _ = write!(output, "{}", details_table(&item.describe()));
    output
}

pub fn render_user(user: &AuthUser) -> String {
    let mut output = String::new();
    let name = user
        .name
        .as_deref()
        .or(user.preferred_username.as_deref())
        .unwrap_or("Unknown user");
    let _ = writeln!(output, "  {} {}", dim("Signed in as:"), cyan(name));
    if let Some(username) = &user.preferred_username {
        let _ = writeln!(output, "  {} {}", dim("Username:"), username);
    }
    if let Some(email) = &user.email {
        let _ = writeln!(output, "  {} {}", dim("Email:"), email);
    }
    let roles = if user.roles.is_empty() {
        "none".to_string()
    } else {
        user.roles.join(", ")
    };
    let _ = writeln!(output, "  {} {}", dim("Roles:"), roles);
    output
}

pub fn render_public_key(key: &SshPublicKey) -> String {
    format!(
        "{}\n  {} {}\n",
        key.public_key.trim_end(),
        dim("Fingerprint:"),
        bright_yellow(&key.fingerprint_sha256)
    )
}

pub fn render_batch_report(report: &BatchReport) -> String {
    let mut output = String::new();
    for (name, status) in &report.items {
        let line = match status {
            ItemStatus::Done => format!("{} {name}", bright_green("✓")),
            ItemStatus::Failed(e) => format!("{} {name}: {}", bright_red("✗"), bright_red(e)),
            ItemStatus::Skipped => format!("{} {name}: {}", dim("-"), dim("skipped")),
        };
        let _ = writeln!(output, "  {line}");
    }
    output
}
