use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, time::Duration};

/// Environment variable holding the WeatherAPI.com key.
pub const API_KEY_ENV: &str = "WEATHERAPI_KEY";
/// Environment variable overriding the WeatherAPI.com base URL.
pub const BASE_URL_ENV: &str = "WEATHERAPI_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Credentials and endpoint for WeatherAPI.com.
#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherApiConfig {
    /// Absent key is allowed; lookups then answer with an apology.
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self { api_key: None, base_url: default_base_url(), timeout_secs: default_timeout_secs() }
    }
}

impl fmt::Debug for WeatherApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherApiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl WeatherApiConfig {
    /// Returns the key only when it is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Provider identifiers and prompts handed to the hosted voice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub stt: String,
    pub llm: String,
    pub tts: String,
    pub vad: String,
    pub turn_detection: String,
    pub instructions: String,
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            stt: "assemblyai/universal-streaming:en".to_string(),
            llm: "google/gemini-2.5-flash".to_string(),
            tts: "cartesia/sonic-3:9626c31c-bec5-4cca-baa8-f8ba9e84c8bc".to_string(),
            vad: "silero".to_string(),
            turn_detection: "multilingual".to_string(),
            instructions: "You are a helpful voice AI assistant. \
                You eagerly assist users with their questions by providing information \
                from your extensive knowledge. \
                Your responses are concise, to the point, and without any complex formatting \
                or punctuation including emojis, asterisks, or other symbols. \
                You are curious, friendly, and have a sense of humor."
                .to_string(),
            greeting: "Greet the user and offer your assistance.".to_string(),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [weatherapi]
/// api_key = "..."
///
/// [session]
/// llm = "google/gemini-2.5-flash"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub weatherapi: WeatherApiConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from disk, then apply overrides from the process environment.
    pub fn load_with_env() -> Result<Self> {
        let mut cfg = Self::load()?;
        cfg.apply_env(|name| std::env::var(name).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid configuration TOML")
    }

    /// Override file values with environment values. `lookup` is the
    /// environment accessor, normally `std::env::var`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.weatherapi.api_key = Some(key);
        }
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.weatherapi.base_url = url;
        }
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-voice", "weather-agent")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.weatherapi.api_key = Some(api_key);
    }

    pub fn is_weatherapi_configured(&self) -> bool {
        self.weatherapi.api_key().is_some()
    }
}
