//! Configuration loading
//!
//! Connection parameters come from, highest precedence first: command-line
//! flags, the TOML config file, `DB_*` environment variables (a local `.env`
//! is loaded first when present) and built-in defaults.
//!
//! # Configuration Format
//!
//! ```toml
//! host = "gateway01.us-west-2.prod.aws.tidbcloud.com"
//! port = 4000            # integer or string
//! user = "root"
//! password = ""
//! database = "test"
//!
//! [ui]
//! format = "table"       # json, table, plain, csv
//! color = true
//!
//! [ask]
//! endpoint = "https://tidb.ai/api/v1/chats"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ask::DEFAULT_ASK_ENDPOINT;
use crate::connection::ConnectionInfo;
use crate::error::{CLIError, Result};
use crate::formatter::OutputFormat;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_USER: &str = "root";
/// Database selected when none is given and none was used before
pub const DEFAULT_DATABASE: &str = "test";

/// Port as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn resolve(&self) -> Result<u16> {
        match self {
            PortValue::Number(port) => Ok(*port),
            PortValue::Text(text) => parse_port(text),
        }
    }
}

fn parse_port(text: &str) -> Result<u16> {
    text.trim()
        .parse()
        .map_err(|_| CLIError::ConfigurationError(format!("invalid port: {}", text)))
}

/// Contents of `~/.tip/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CLIConfiguration {
    pub host: Option<String>,
    pub port: Option<PortValue>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// UI preferences
    pub ui: Option<UIConfig>,

    /// `.ask` settings
    pub ask: Option<AskConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIConfig {
    /// Output format: json, table, plain, csv
    pub format: Option<String>,

    /// Enable colored output
    pub color: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AskConfig {
    pub endpoint: Option<String>,
}

/// Connection values read from the environment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSettings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl EnvSettings {
    /// Read `DB_*` variables, loading `.env` from the working directory first
    pub fn from_env() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("Ignoring .env: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());
        Self {
            host: get("DB_HOST"),
            port: get("DB_PORT"),
            user: get("DB_USERNAME"),
            password: get("DB_PASSWORD"),
            database: get("DB_DATABASE"),
        }
    }
}

/// Connection values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

pub fn expand_config_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|p| p.strip_prefix("~/")) {
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(rest);
        }
    }
    path.to_path_buf()
}

pub fn default_config_path() -> PathBuf {
    expand_config_path(Path::new("~/.tip/config.toml"))
}

impl CLIConfiguration {
    /// Load the configuration.
    ///
    /// Without an explicit path the default location is used when it exists
    /// and an empty configuration otherwise. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (expand_config_path(path), true),
            None => (default_config_path(), false),
        };

        if !path.exists() {
            if explicit {
                return Err(CLIError::ConfigurationError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            CLIError::ConfigurationError(format!("Failed to read config file: {}", e))
        })?;
        let config: CLIConfiguration = toml::from_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Merge flags, this file and the environment into connection parameters
    pub fn resolve_connection(
        &self,
        flags: &ConnectionOverrides,
        env: &EnvSettings,
    ) -> Result<ConnectionInfo> {
        fn pick(values: [Option<&String>; 3], default: &str) -> String {
            values
                .into_iter()
                .flatten()
                .find(|value| !value.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        }

        let port = match (flags.port, &self.port, &env.port) {
            (Some(port), _, _) => port,
            (None, Some(port), _) => port.resolve()?,
            (None, None, Some(port)) => parse_port(port)?,
            (None, None, None) => DEFAULT_PORT,
        };

        // an explicitly empty password on the command line wins
        let password = match &flags.password {
            Some(password) => password.clone(),
            None => pick([self.password.as_ref(), env.password.as_ref(), None], ""),
        };

        Ok(ConnectionInfo {
            host: pick(
                [flags.host.as_ref(), self.host.as_ref(), env.host.as_ref()],
                DEFAULT_HOST,
            ),
            port,
            user: pick(
                [flags.user.as_ref(), self.user.as_ref(), env.user.as_ref()],
                DEFAULT_USER,
            ),
            password,
            database: pick(
                [flags.database.as_ref(), self.database.as_ref(), env.database.as_ref()],
                "",
            ),
        })
    }

    /// Output format from `[ui]`, if set
    pub fn format(&self) -> Result<Option<OutputFormat>> {
        self.ui
            .as_ref()
            .and_then(|ui| ui.format.as_deref())
            .map(|format| {
                format
                    .parse()
                    .map_err(|_| CLIError::ConfigurationError(format!("invalid format: {}", format)))
            })
            .transpose()
    }

    pub fn color(&self) -> bool {
        self.ui.as_ref().and_then(|ui| ui.color).unwrap_or(true)
    }

    pub fn ask_endpoint(&self) -> String {
        self.ask
            .as_ref()
            .and_then(|ask| ask.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ASK_ENDPOINT.to_string())
    }
}
