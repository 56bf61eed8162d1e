//! Application configuration for dailyvocab.
//!
//! User config lives at `~/.dailyvocab/dailyvocab.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VocabError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dailyvocab.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dailyvocab";

// ---------------------------------------------------------------------------
// Config structs (matching dailyvocab.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-run generation settings.
    #[serde(default)]
    pub run: RunSection,

    /// Language pair and level band.
    #[serde(default)]
    pub language: LanguageConfig,

    /// Tabular store location.
    #[serde(default)]
    pub store: StoreConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Number of new words to generate per run.
    #[serde(default = "default_target_count")]
    pub target_count: usize,

    /// Generation attempts before giving up on the target count.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How many known words to list in the exclusion hint.
    #[serde(default = "default_exclusion_sample")]
    pub exclusion_sample: usize,

    /// Where the pending batch is checkpointed before the store append.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,

    /// Continue with an empty known-word set when the store read fails.
    #[serde(default)]
    pub lenient_existing_load: bool,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_attempts: default_max_attempts(),
            exclusion_sample: default_exclusion_sample(),
            checkpoint_path: default_checkpoint_path(),
            lenient_existing_load: false,
        }
    }
}

fn default_target_count() -> usize {
    10
}
fn default_max_attempts() -> u32 {
    5
}
fn default_exclusion_sample() -> usize {
    20
}
fn default_checkpoint_path() -> String {
    "backup_vocab.json".into()
}

/// `[language]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Language being learned.
    #[serde(default = "default_source_language")]
    pub source: String,

    /// Learner's language, used for translations.
    #[serde(default = "default_target_language")]
    pub target: String,

    /// Allowed difficulty levels, lowest first.
    #[serde(default = "default_levels")]
    pub levels: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: default_source_language(),
            target: default_target_language(),
            levels: default_levels(),
        }
    }
}

fn default_source_language() -> String {
    "Finnish".into()
}
fn default_target_language() -> String {
    "English".into()
}
fn default_levels() -> Vec<String> {
    vec!["A1".into(), "A2".into(), "B1".into()]
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the libSQL database file. `~` expands to the home directory.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Name of the sheet inside the store.
    #[serde(default = "default_sheet")]
    pub sheet: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            sheet: default_sheet(),
        }
    }
}

fn default_store_path() -> String {
    "~/.dailyvocab/vocabulary.db".into()
}
fn default_sheet() -> String {
    "Daily Vocabulary".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for generation and enrichment.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "google/gemini-2.5-flash".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_timeout_secs() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Number of new words wanted.
    pub target_count: usize,
    /// Generation attempt budget.
    pub max_attempts: u32,
    /// Size of the exclusion-hint sample.
    pub exclusion_sample: usize,
    /// Checkpoint file location.
    pub checkpoint_path: PathBuf,
    /// Tolerate a failed read of existing words.
    pub lenient_existing_load: bool,
    /// Language being learned.
    pub source_language: String,
    /// Learner's language.
    pub target_language: String,
    /// Allowed levels, lowest first.
    pub levels: Vec<String>,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            target_count: config.run.target_count,
            max_attempts: config.run.max_attempts,
            exclusion_sample: config.run.exclusion_sample,
            checkpoint_path: PathBuf::from(&config.run.checkpoint_path),
            lenient_existing_load: config.run.lenient_existing_load,
            source_language: config.language.source.clone(),
            target_language: config.language.target.clone(),
            levels: config.language.levels.clone(),
        }
    }
}

impl RunConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(VocabError::config("target_count must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(VocabError::config("max_attempts must be at least 1"));
        }
        if self.exclusion_sample == 0 {
            return Err(VocabError::config("exclusion_sample must be at least 1"));
        }
        if self.levels.is_empty() {
            return Err(VocabError::config("language.levels must not be empty"));
        }
        Ok(())
    }

    /// Human-readable level band, e.g. `A1 to B1`.
    pub fn level_band(&self) -> String {
        match (self.levels.first(), self.levels.last()) {
            (Some(first), Some(last)) if first != last => format!("{first} to {last}"),
            (Some(only), _) => only.clone(),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dailyvocab/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| VocabError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dailyvocab/dailyvocab.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| VocabError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| VocabError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| VocabError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| VocabError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| VocabError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the OpenRouter API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(VocabError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable \
             (a .env file in the working directory is also read).\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| VocabError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
