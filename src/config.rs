use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::Principal;
use crate::error::ConfigError;

pub const DEFAULT_VACATION_DAYS_PER_YEAR: u32 = 22;
pub const DEFAULT_TEMPORARY_ATTACHMENT_TTL_HOURS: i64 = 24;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    pub enabled: bool,
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        MailConfig {
            enabled: false,
            from: "binnacle@localhost".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// User the CLI acts as
    pub user_id: Option<i64>,
    pub roles: Vec<String>,
    /// Overrides the default data file location
    pub data_file: Option<PathBuf>,
    pub vacation_days_per_year: u32,
    /// mime type -> file extension
    pub supported_mime_types: BTreeMap<String, String>,
    pub temporary_attachment_ttl_hours: i64,
    pub mail: MailConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            user_id: None,
            roles: Vec::new(),
            data_file: None,
            vacation_days_per_year: DEFAULT_VACATION_DAYS_PER_YEAR,
            supported_mime_types: default_mime_types(),
            temporary_attachment_ttl_hours: DEFAULT_TEMPORARY_ATTACHMENT_TTL_HOURS,
            mail: MailConfig::default(),
        }
    }
}

pub fn default_mime_types() -> BTreeMap<String, String> {
    [
        ("application/pdf", "pdf"),
        ("image/jpg", "jpg"),
        ("image/jpeg", "jpeg"),
        ("image/png", "png"),
        ("image/gif", "gif"),
    ]
    .into_iter()
    .map(|(mime, extension)| (mime.to_string(), extension.to_string()))
    .collect()
}

impl Config {
    pub fn get_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "binnacle", "binnacle")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.json"))
    }

    /// Loads the config file, falling back to defaults when none exists yet
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            Self::get_config_path().ok_or(ConfigError::DirectoryUnavailable("config"))?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let config_data = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&config_data)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path =
            Self::get_config_path().ok_or(ConfigError::DirectoryUnavailable("config"))?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let config_data = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        fs::write(path, config_data)
            .map_err(|e| ConfigError::SaveFailed(format!("{}: {}", path.display(), e)))
    }

    /// Data file in use: the configured one or the platform default
    pub fn data_file_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => crate::store::JsonStore::get_default_path()
                .ok_or(ConfigError::DirectoryUnavailable("data")),
        }
    }

    pub fn principal(&self) -> Result<Principal, ConfigError> {
        self.user_id
            .map(|user_id| Principal::new(user_id, self.roles.clone()))
            .ok_or(ConfigError::UserNotConfigured)
    }

    pub fn extension_for(&self, mime_type: &str) -> Option<&str> {
        self.supported_mime_types.get(mime_type).map(String::as_str)
    }

    pub fn mime_type_for_extension(&self, extension: &str) -> Option<&str> {
        let extension = extension.to_lowercase();
        self.supported_mime_types
            .iter()
            .find(|(_, ext)| **ext == extension)
            .map(|(mime, _)| mime.as_str())
    }

    pub fn prompt_for_user_id() -> Result<i64, ConfigError> {
        println!("Please enter the id of the user binnacle should act as:");
        print!("> ");
        io::stdout()
            .flush()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        input
            .trim()
            .parse()
            .map_err(|_| ConfigError::LoadFailed(format!("Invalid user id: {}", input.trim())))
    }
}
