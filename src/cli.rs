use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use crate::api::GitProvider;
use crate::app::App;
use crate::commands::items::ItemAction;
use crate::commands::templates::{NewTemplate, TemplateEdits};
use crate::commands::{auth, credentials, outcomes, parse_assignments, templates, OutputOptions};
use crate::config::{Config, OnLoad, OutputFormat};
use crate::editor::ItemKind;

#[derive(Parser)]
#[command(name = "tasktally")]
#[command(author, version, about = "Consulting estimation templates and SSH credentials", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./tasktally.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the Task Tally backend
    #[arg(long, global = true, env = "TASK_TALLY_BACKEND")]
    backend: Option<String>,

    /// Serve every call from in-memory demo data
    #[arg(long, global = true, env = "TASK_TALLY_MOCK")]
    mock: bool,

    #[arg(long, global = true, env = "KEYCLOAK_URL")]
    keycloak_url: Option<String>,

    #[arg(long, global = true, env = "KEYCLOAK_REALM")]
    realm: Option<String>,

    #[arg(long, global = true, env = "KEYCLOAK_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, global = true, value_enum, env = "KEYCLOAK_ONLOAD")]
    onload: Option<OnLoad>,

    #[arg(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Do not keep unsaved template edits on disk
    #[arg(long, global = true, default_value_t = false)]
    no_drafts: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in through Keycloak
    Login,
    /// End the session and forget stored tokens
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage SSH keys
    #[command(subcommand)]
    #[command(alias = "keys")]
    Credentials(CredentialCommands),
    /// Manage estimation templates
    #[command(subcommand)]
    Templates(TemplateCommands),
    /// Inspect or write the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct KeyArgs {
    /// known_hosts entries for the git host
    #[arg(long)]
    known_hosts: Option<String>,

    #[arg(long)]
    passphrase: Option<String>,

    /// Git host name, e.g. github.com
    #[arg(long)]
    hostname: Option<String>,
}

impl From<KeyArgs> for credentials::KeyOptions {
    fn from(args: KeyArgs) -> Self {
        Self {
            known_hosts: args.known_hosts,
            passphrase: args.passphrase,
            hostname: args.hostname,
        }
    }
}

#[derive(Subcommand)]
enum CredentialCommands {
    List,
    /// Generate a new key pair on the server
    Generate {
        name: String,
        #[arg(long, value_enum, default_value_t = GitProvider::Github)]
        provider: GitProvider,
        #[arg(long)]
        comment: Option<String>,
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Upload an existing private key
    Import {
        name: String,
        /// Path to the PEM-encoded private key
        #[arg(long)]
        private_key: PathBuf,
        #[arg(long, value_enum, default_value_t = GitProvider::Github)]
        provider: GitProvider,
        #[command(flatten)]
        key: KeyArgs,
    },
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print or download the public half of a key
    PublicKey {
        name: String,
        /// Write `<name>.pub` into this directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Check that a key can reach a repository
    Validate {
        ssh_repo_uri: String,
        #[arg(long)]
        credential: String,
    },
}

#[derive(Args)]
struct TemplateFields {
    #[arg(long)]
    description: Option<String>,

    /// Name stored in the template file (defaults to the template name)
    #[arg(long)]
    template_name: Option<String>,

    /// Comma-separated technologies
    #[arg(long, value_delimiter = ',')]
    technologies: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum TemplateCommands {
    List,
    Show {
        id: String,
    },
    /// Summarize estimated hours and risk exposure
    Estimate {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = GitProvider::Github)]
        provider: GitProvider,
        #[arg(long)]
        ssh_repo_uri: String,
        #[arg(long, default_value = "main")]
        default_branch: String,
        #[arg(long)]
        credential: String,
        /// Check repository access before creating
        #[arg(long, default_value_t = false)]
        validate: bool,
        #[command(flatten)]
        fields: TemplateFields,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        provider: Option<GitProvider>,
        #[arg(long)]
        ssh_repo_uri: Option<String>,
        #[arg(long)]
        default_branch: Option<String>,
        #[arg(long)]
        credential: Option<String>,
        #[command(flatten)]
        fields: TemplateFields,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Retry saving a stored draft ("new" for an unsaved template)
    SaveDraft {
        id: String,
    },
    DiscardDraft {
        id: String,
    },
    /// Edit the records of one template tab
    Items {
        id: String,
        #[arg(value_enum)]
        kind: ItemKind,
        #[command(subcommand)]
        action: ItemCommands,
    },
    /// Manage outcomes through their own endpoints
    Outcomes {
        id: String,
        #[command(subcommand)]
        action: OutcomeCommands,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    List,
    Show {
        item: String,
    },
    Add {
        /// field=value, repeatable
        #[arg(long = "set")]
        set: Vec<String>,
    },
    Edit {
        item: String,
        #[arg(long = "set")]
        set: Vec<String>,
    },
    Delete {
        item: String,
    },
    /// Raise a number field by its step
    Inc {
        item: String,
        field: String,
    },
    /// Lower a number field by its step
    Dec {
        item: String,
        field: String,
    },
}

impl ItemCommands {
    fn into_action(self) -> crate::error::Result<ItemAction> {
        Ok(match self {
            Self::List => ItemAction::List,
            Self::Show { item } => ItemAction::Show(item),
            Self::Add { set } => ItemAction::Add(parse_assignments(&set)?),
            Self::Edit { item, set } => ItemAction::Edit(item, parse_assignments(&set)?),
            Self::Delete { item } => ItemAction::Delete(item),
            Self::Inc { item, field } => ItemAction::Increment(item, field),
            Self::Dec { item, field } => ItemAction::Decrement(item, field),
        })
    }
}

#[derive(Subcommand)]
enum OutcomeCommands {
    List,
    Add {
        #[arg(long = "set")]
        set: Vec<String>,
    },
    Edit {
        item: String,
        #[arg(long = "set")]
        set: Vec<String>,
    },
    Delete {
        item: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to a file
    Init {
        #[arg(default_value = "tasktally.toml")]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(backend) = &self.backend {
            config.backend.base_url = backend.clone();
        }
        if self.mock {
            config.backend.mock = true;
        }
        if let Some(url) = &self.keycloak_url {
            config.keycloak.url = Some(url.clone());
        }
        if let Some(realm) = &self.realm {
            config.keycloak.realm = Some(realm.clone());
        }
        if let Some(client_id) = &self.client_id {
            config.keycloak.client_id = Some(client_id.clone());
        }
        if let Some(onload) = self.onload {
            config.keycloak.onload = onload;
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if self.no_drafts {
            config.drafts.enabled = false;
        }

        Ok(config)
    }

    fn execute_config(&self, config: &Config, command: &ConfigCommands) -> Result<()> {
        match command {
            ConfigCommands::Show => {
                print!("{}", toml::to_string_pretty(config)?);
                Ok(())
            }
            ConfigCommands::Init { path, force } => {
                if path.exists() && !force {
                    bail!("{} already exists, pass --force to overwrite", path.display());
                }
                config.save(path)?;
                info!("Configuration written to: {}", path.display());
                Ok(())
            }
        }
    }

    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;
        let output = OutputOptions {
            format: config.output.format,
            pretty: config.output.pretty,
        };

        if let Commands::Config(command) = &self.command {
            return self.execute_config(&config, command);
        }

        let app = App::connect(config)
            .await
            .context("Failed to start the session")?;

        match self.command {
            Commands::Login => auth::login(&app, &output).await?,
            Commands::Logout => auth::logout(&app, &output).await?,
            Commands::Whoami => auth::whoami(&app, &output).await?,
            Commands::Credentials(command) => execute_credentials(&app, command, &output).await?,
            Commands::Templates(command) => execute_templates(&app, command, &output).await?,
            Commands::Config(_) => {}
        }

        Ok(())
    }
}

async fn execute_credentials(
    app: &App,
    command: CredentialCommands,
    output: &OutputOptions,
) -> crate::error::Result<()> {
    match command {
        CredentialCommands::List => credentials::list(app, output).await,
        CredentialCommands::Generate {
            name,
            provider,
            comment,
            key,
        } => credentials::generate(app, name, provider, comment, key.into(), output).await,
        CredentialCommands::Import {
            name,
            private_key,
            provider,
            key,
        } => credentials::import(app, name, provider, &private_key, key.into(), output).await,
        CredentialCommands::Delete { names } => credentials::delete(app, &names, output).await,
        CredentialCommands::PublicKey { name, save } => {
            credentials::public_key(app, &name, save, output).await
        }
        CredentialCommands::Validate {
            ssh_repo_uri,
            credential,
        } => credentials::validate(app, ssh_repo_uri, credential, output).await,
    }
}

async fn execute_templates(
    app: &App,
    command: TemplateCommands,
    output: &OutputOptions,
) -> crate::error::Result<()> {
    match command {
        TemplateCommands::List => templates::list(app, output).await,
        TemplateCommands::Show { id } => templates::show(app, &id, output).await,
        TemplateCommands::Estimate { ids } => templates::estimate(app, &ids, output).await,
        TemplateCommands::Create {
            name,
            provider,
            ssh_repo_uri,
            default_branch,
            credential,
            validate,
            fields,
        } => {
            let new = NewTemplate {
                name,
                description: fields.description,
                provider,
                ssh_repo_uri,
                default_branch,
                credential_name: credential,
                template_name: fields.template_name,
                technologies: fields.technologies.unwrap_or_default(),
                validate,
            };
            templates::create(app, new, output).await
        }
        TemplateCommands::Edit {
            id,
            name,
            provider,
            ssh_repo_uri,
            default_branch,
            credential,
            fields,
        } => {
            let edits = TemplateEdits {
                name,
                description: fields.description,
                provider,
                ssh_repo_uri,
                default_branch,
                credential_name: credential,
                template_name: fields.template_name,
                technologies: fields.technologies,
            };
            if edits.is_empty() {
                return Err(crate::error::TallyError::Input(
                    "Nothing to change; pass at least one field".into(),
                ));
            }
            templates::edit(app, &id, edits, output).await
        }
        TemplateCommands::Delete { ids } => templates::delete(app, &ids, output).await,
        TemplateCommands::SaveDraft { id } => templates::save_draft(app, &id, output).await,
        TemplateCommands::DiscardDraft { id } => templates::discard_draft(app, &id).await,
        TemplateCommands::Items { id, kind, action } => {
            templates::items(app, &id, kind, action.into_action()?, output).await
        }
        TemplateCommands::Outcomes { id, action } => match action {
            OutcomeCommands::List => outcomes::list(app, &id, output).await,
            OutcomeCommands::Add { set } => {
                outcomes::add(app, &id, &parse_assignments(&set)?, output).await
            }
            OutcomeCommands::Edit { item, set } => {
                outcomes::edit(app, &id, &item, &parse_assignments(&set)?, output).await
            }
            OutcomeCommands::Delete { item } => outcomes::delete(app, &id, &item, output).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_item_commands_parse() {
        let cli = Cli::try_parse_from([
            "tasktally",
            "--mock",
            "templates",
            "items",
            "2",
            "tasks",
            "add",
            "--set",
            "taskDescription=Set up CI",
            "--set",
            "hoursMostLikely=8",
        ])
        .unwrap();

        let Commands::Templates(TemplateCommands::Items { id, kind, action }) = cli.command else {
            panic!("expected templates items");
        };
        assert_eq!(id, "2");
        assert_eq!(kind, ItemKind::Tasks);
        let ItemAction::Add(pairs) = action.into_action().unwrap() else {
            panic!("expected add");
        };
        assert_eq!(pairs[1], ("hoursMostLikely".into(), "8".into()));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "tasktally",
            "--config",
            "does-not-exist.toml",
            "--backend",
            "https://tally.example.com",
            "--realm",
            "task-tally",
            "--output",
            "json",
            "--no-drafts",
            "whoami",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.backend.base_url, "https://tally.example.com");
        assert_eq!(config.keycloak.realm.as_deref(), Some("task-tally"));
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(!config.drafts.enabled);
    }

    #[test]
    fn test_config_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasktally.toml");
        let cli = Cli::try_parse_from(["tasktally", "config", "init"]).unwrap();
        let config = Config::default();

        let init = |force| ConfigCommands::Init {
            path: path.clone(),
            force,
        };
        cli.execute_config(&config, &init(false)).unwrap();
        assert!(cli.execute_config(&config, &init(false)).is_err());
        cli.execute_config(&config, &init(true)).unwrap();
    }
}
