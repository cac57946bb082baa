use console::style;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Severity of an inline alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Info,
    Warning,
    Danger,
}

pub fn render_alert(level: AlertLevel, message: &str) -> String {
    match level {
        AlertLevel::Success => format!("{} {}", bright_green("✓"), bright_green(message)),
        AlertLevel::Info => format!("{} {}", cyan("ℹ"), message),
        AlertLevel::Warning => format!("{} {}", bright_yellow("!"), bright_yellow(message)),
        AlertLevel::Danger => format!("{} {}", bright_red("✗"), bright_red(message)),
    }
}

/// Prints a one-line alert to stderr, keeping stdout for data.
pub fn alert(level: AlertLevel, message: &str) {
    eprintln!("{}", render_alert(level, message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_keeps_message() {
        let rendered = console::strip_ansi_codes(&render_alert(AlertLevel::Danger, "Failed"))
            .to_string();
        assert_eq!(rendered, "✗ Failed");

        let rendered = console::strip_ansi_codes(&render_alert(AlertLevel::Success, "Saved"))
            .to_string();
        assert_eq!(rendered, "✓ Saved");
    }
}
