use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_VERSION: u32 = 1;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("home directory not found; set HOME")]
    HomeMissing,
    #[error("config io error: {0}")]
    Io(#[from] io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
}

impl ConfigPaths {
    pub fn from_home() -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::HomeMissing)?;
        Ok(Self::from_base(PathBuf::from(home).join(".lektio")))
    }

    pub fn from_base(base_dir: PathBuf) -> Self {
        let config_path = base_dir.join("config.toml");
        Self {
            base_dir,
            config_path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    pub auth: AuthConfig,
    pub transcribe: TranscribeConfig,
    pub generate: GenerateConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            auth: AuthConfig::default(),
            transcribe: TranscribeConfig::default(),
            generate: GenerateConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Groq API key; the GROQ_API_KEY environment variable wins when set.
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeConfig {
    pub model: String,
    /// "auto" lets the provider detect the spoken language.
    pub language: String,
    pub window_secs: u64,
}

impl Default for TranscribeConfig {
    fn default() -> Self {
        Self {
            model: "whisper-large-v3-turbo".to_string(),
            language: "auto".to_string(),
            window_secs: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub summary_words_min: usize,
    pub summary_words_max: usize,
    pub questions: usize,
    pub flashcards: usize,
    pub glossary: usize,
    pub chunk_chars: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.2,
            max_tokens: 4000,
            summary_words_min: 1700,
            summary_words_max: 2200,
            questions: 16,
            flashcards: 30,
            glossary: 20,
            chunk_chars: 6000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Base directory for run artifacts; empty means the current directory.
    pub dir: String,
}

impl Config {
    pub fn load_or_create(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        if paths.config_path.exists() {
            let config = Self::load(paths)?;
            return Ok(config);
        }

        let config = Self::default();
        Self::write(paths, &config)?;
        Ok(config)
    }

    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        ensure_dirs(paths)?;
        let content = fs::read_to_string(&paths.config_path)?;
        let raw: toml::Value = toml::from_str(&content)?;
        let file_version = raw
            .get("version")
            .and_then(|value| value.as_integer())
            .unwrap_or(0) as u32;

        let mut config: Config = toml::from_str(&content)?;
        let mut migrated = false;

        if file_version < CONFIG_VERSION {
            config.version = CONFIG_VERSION;
            migrated = true;
        } else if file_version > CONFIG_VERSION {
            eprintln!(
                "config version {file_version} is newer than supported {CONFIG_VERSION}; proceeding"
            );
        }

        warn_if_loose_permissions(&paths.config_path)?;

        if migrated {
            Self::write(paths, &config)?;
        }

        Ok(config)
    }

    pub fn write(paths: &ConfigPaths, config: &Config) -> Result<(), ConfigError> {
        ensure_dirs(paths)?;
        let content = toml::to_string_pretty(config)?;
        write_atomic(&paths.config_path, content.as_bytes())?;
        Ok(())
    }

    pub fn redacted(&self) -> Self {
        let mut redacted = self.clone();
        if !redacted.auth.api_key.trim().is_empty() {
            redacted.auth.api_key = "<redacted>".to_string();
        }
        redacted
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transcribe.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "transcribe.model must not be empty".into(),
            ));
        }
        if self.transcribe.language.trim().is_empty() {
            return Err(ConfigError::Validation(
                "transcribe.language must not be empty (use auto)".into(),
            ));
        }
        if self.transcribe.window_secs == 0 {
            return Err(ConfigError::Validation(
                "transcribe.window_secs must be greater than 0".into(),
            ));
        }
        if self.generate.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generate.model must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.generate.temperature) {
            return Err(ConfigError::Validation(
                "generate.temperature must be between 0 and 2".into(),
            ));
        }
        if self.generate.max_tokens == 0 {
            return Err(ConfigError::Validation(
                "generate.max_tokens must be greater than 0".into(),
            ));
        }
        if self.generate.summary_words_min == 0 {
            return Err(ConfigError::Validation(
                "generate.summary_words_min must be greater than 0".into(),
            ));
        }
        if self.generate.summary_words_max < self.generate.summary_words_min {
            return Err(ConfigError::Validation(
                "generate.summary_words_max must be >= summary_words_min".into(),
            ));
        }
        if self.generate.chunk_chars < 100 {
            return Err(ConfigError::Validation(
                "generate.chunk_chars must be at least 100".into(),
            ));
        }
        Ok(())
    }
}

fn ensure_dirs(paths: &ConfigPaths) -> Result<(), ConfigError> {
    fs::create_dir_all(&paths.base_dir)?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("config path missing parent directory"))?;
    let tmp_path = parent.join("config.toml.tmp");
    fs::write(&tmp_path, contents)?;
    set_strict_permissions(&tmp_path)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn set_strict_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perm)?;
    }
    Ok(())
}

fn warn_if_loose_permissions(path: &Path) -> Result<(), ConfigError> {
    #[cfg(unix)]
    {
        let metadata = fs::metadata(path)?;
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            eprintln!(
                "config file {} is group/world readable; set permissions to 0600",
                path.display()
            );
        }
    }
    Ok(())
}
