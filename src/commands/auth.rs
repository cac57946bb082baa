use std::io::{self, BufRead, Write};

use log::info;

use crate::app::App;
use crate::error::{Result, TallyError};
use crate::output::{alert, render_user, AlertLevel};

use super::OutputOptions;

/// Runs the PKCE login, reading the redirect URL (or bare code) from stdin.
pub async fn login(app: &App, output: &OutputOptions) -> Result<()> {
    if app.config.backend.mock {
        alert(AlertLevel::Info, "Demo mode is always signed in");
        return whoami(app, output).await;
    }

    let url = app.session.login().await?;
    eprintln!("Open this URL in a browser to sign in:\n\n  {url}\n");

    eprint!("Paste the redirect URL or code: ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        return Err(TallyError::Input("No authorization code given".into()));
    }

    let user = app.session.complete_login(input).await?;
    info!("Signed in as {:?}", user.preferred_username);
    output.success("Signed in");
    output.emit(&user, || render_user(&user))
}

pub async fn logout(app: &App, output: &OutputOptions) -> Result<()> {
    if !app.session.is_authenticated().await {
        alert(AlertLevel::Info, "Not signed in");
        return Ok(());
    }

    app.session.logout().await?;
    output.success("Signed out");
    Ok(())
}

pub async fn whoami(app: &App, output: &OutputOptions) -> Result<()> {
    let user = app.session.user().await.ok_or(TallyError::NotAuthenticated)?;
    output.emit(&user, || render_user(&user))
}
