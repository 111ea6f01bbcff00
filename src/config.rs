use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "TASKPLANNER_CONFIG";
pub const DATA_DIR_ENV: &str = "TASKPLANNER_DATA_DIR";
pub const PORT_ENV: &str = "PORT";
pub const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("taskplanner")
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("taskplanner").join("config.toml"))
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prebuilt frontend to serve; unknown paths fall back to its index.html.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3001,
            static_dir: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    /// Free-form location handed to the model as context.
    pub location: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            max_output_tokens: 700,
            location: String::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct GmailConfig {
    pub base_url: String,
    pub max_results: u32,
    /// How many of the newest unprocessed messages go to the extractor per scan.
    pub scan_batch: usize,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gmail.googleapis.com".into(),
            max_results: 10,
            scan_batch: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct ImapAccount {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_imap_folder")]
    pub folder: String,
    /// Tasks from this mailbox are filed under this user.
    pub user_id: String,
}

fn default_imap_folder() -> String {
    "INBOX".into()
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub data_dir: PathBuf,
    pub debug_logging: bool,
    pub server: ServerConfig,
    pub gemini: GeminiConfig,
    pub gmail: GmailConfig,
    pub imap: Option<ImapAccount>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            debug_logging: false,
            server: ServerConfig::default(),
            gemini: GeminiConfig::default(),
            gmail: GmailConfig::default(),
            imap: None,
        }
    }
}

impl PlannerConfig {
    /// Load from an explicit path, `$TASKPLANNER_CONFIG`, or the user config
    /// directory, then apply environment overrides. A missing default file is
    /// not an error; a missing explicit file is.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup(PORT_ENV).and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(key) = lookup(GEMINI_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.gemini.api_key = Some(key.trim().to_string());
        }
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn notifications_path(&self) -> PathBuf {
        self.data_dir.join("notifications.json")
    }

    pub fn scans_path(&self) -> PathBuf {
        self.data_dir.join("scans.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("server-log.txt")
    }

    /// Ensure the data directory and every collection file exist.
    pub fn ensure_files(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;

        for path in [
            self.tasks_path(),
            self.users_path(),
            self.notifications_path(),
            self.scans_path(),
        ] {
            if !path.exists() {
                log::info!("Creating {}", path.display());
                std::fs::write(&path, "[]")?;
            }
        }

        Ok(())
    }
}
