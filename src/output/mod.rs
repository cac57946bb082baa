mod progress;
mod styling;
mod tables;
mod views;

use serde::Serialize;

use crate::error::Result;

pub use progress::with_spinner;
pub use styling::{alert, dim, magenta_bold, AlertLevel};
pub use tables::{
    credentials_table, details_table, estimate_table, items_table, team_modeling_table,
    templates_table,
};
pub use views::{render_batch_report, render_item, render_public_key, render_template, render_user};

/// Prints the Task Tally banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("📋 Task Tally"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Consulting estimation templates")
    );
}

/// Writes `value` as JSON to stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
