use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file structure for Task Tally.
///
/// Holds the backend location, identity provider settings and output
/// preferences. Configuration files are loaded from the current directory
/// or an explicit path; command-line flags and environment variables
/// override individual values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Backend REST API settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Keycloak identity provider settings
    #[serde(default)]
    pub keycloak: KeycloakConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,

    /// Local draft storage
    #[serde(default)]
    pub drafts: DraftsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackendConfig {
    /// Base URL of the Task Tally backend
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Serve every call from the in-memory demo stores
    #[serde(default)]
    pub mock: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeycloakConfig {
    /// Keycloak server URL (e.g. http://localhost:8080)
    pub url: Option<String>,

    /// Realm name
    pub realm: Option<String>,

    /// Public client id
    pub client_id: Option<String>,

    /// Redirect URI registered for the client
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Behaviour when the session is restored at startup
    #[serde(default)]
    pub onload: OnLoad,
}

/// What to do when no valid session exists at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OnLoad {
    /// Restore or silently refresh an existing session only
    #[default]
    CheckSso,
    /// Start a login when no session can be restored
    LoginRequired,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DraftsConfig {
    /// Keep unsaved template edits on disk until they are saved
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            mock: false,
        }
    }
}

impl Default for KeycloakConfig {
    fn default() -> Self {
        Self {
            url: None,
            realm: None,
            client_id: None,
            redirect_uri: default_redirect_uri(),
            onload: OnLoad::default(),
        }
    }
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_redirect_uri() -> String {
    "http://localhost:9000/callback".to_string()
}

fn default_true() -> bool {
    true
}

impl KeycloakConfig {
    /// Returns `(url, realm, client_id)` once all three are set.
    pub fn endpoints(&self) -> Option<(&str, &str, &str)> {
        match (&self.url, &self.realm, &self.client_id) {
            (Some(url), Some(realm), Some(client_id)) => {
                Some((url.as_str(), realm.as_str(), client_id.as_str()))
            }
            _ => None,
        }
    }

    pub fn warn_if_incomplete(&self) {
        if self.endpoints().is_none() {
            warn!("Missing Keycloak settings. Set KEYCLOAK_URL, KEYCLOAK_REALM and KEYCLOAK_CLIENT_ID");
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./tasktally.toml
    /// 3. ./tasktally.json
    /// 4. ./tasktally.yaml
    /// 5. ./tasktally.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let candidates = [
            "tasktally.toml",
            "tasktally.json",
            "tasktally.yaml",
            "tasktally.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
