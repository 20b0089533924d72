use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = ".gatorconfig.json";
const CONFIG_PATH_ENV: &str = "GATOR_CONFIG";

/// Contents of `~/.gatorconfig.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database connection string, e.g. `sqlite:/home/me/.local/share/gator/gator.db`
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Name of the user selected by `register` or `login`
    #[serde(default)]
    pub current_user_name: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_url: default_db_url(),
            current_user_name: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gator")
}

fn default_db_url() -> String {
    format!("sqlite:{}", default_data_dir().join("gator.db").display())
}

impl Config {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// a configuration error.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            crate::Error::Config(format!("{}: {}", path.display(), e))
        })
    }

    /// Save configuration to the default location
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Select a user and persist the change
    pub fn set_user(&mut self, user_name: &str) -> crate::Result<()> {
        self.current_user_name = Some(user_name.to_string());
        self.save()
    }

    /// Get the configuration file path.
    /// `GATOR_CONFIG` wins over `~/.gatorconfig.json`.
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return PathBuf::from(path);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }
}
