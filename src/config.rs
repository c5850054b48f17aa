use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capability::types::{DetectorOptions, SummarizerOptions};
use crate::errors::{TextLensError, TextLensResult};
use crate::tasks::state::{DownloadPolicy, TaskSettings};

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Key of the provider to use; `mock` is always registered.
    #[serde(default = "default_active")]
    pub active: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderEntry>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            active: default_active(),
            providers: HashMap::new(),
        }
    }
}

fn default_active() -> String {
    "mock".into()
}

/// An OpenAI-compatible endpoint serving all three capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    /// Base URL up to and including the version, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var TEXTLENS_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Read replies as SSE streams.
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f64 {
    0.1
}

/// Deadlines for the suspension points of every task. Absent means no limit.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TasksConfig {
    #[serde(default)]
    pub download_timeout_ms: Option<u64>,
    #[serde(default)]
    pub invocation_timeout_ms: Option<u64>,
}

impl TasksConfig {
    pub fn settings(&self, download_policy: DownloadPolicy) -> TaskSettings {
        TaskSettings {
            download_policy,
            download_timeout: self.download_timeout_ms.map(Duration::from_millis),
            invocation_timeout: self.invocation_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Locale language names are displayed in.
    #[serde(default = "default_display_locale")]
    pub display_locale: String,
    /// Hint passed to the detector; empty means any language.
    #[serde(default)]
    pub expected_input_languages: Vec<String>,
    #[serde(default = "default_await")]
    pub download_policy: DownloadPolicy,
}

impl DetectorConfig {
    pub fn options(&self) -> DetectorOptions {
        DetectorOptions {
            expected_input_languages: self.expected_input_languages.clone(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            display_locale: default_display_locale(),
            expected_input_languages: Vec::new(),
            download_policy: default_await(),
        }
    }
}

fn default_display_locale() -> String {
    "en".into()
}

fn default_await() -> DownloadPolicy {
    DownloadPolicy::Await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_source_language")]
    pub source_language: String,
    /// Target used when `/translate` is given no language.
    #[serde(default = "default_target")]
    pub default_target: String,
    #[serde(default = "default_await")]
    pub download_policy: DownloadPolicy,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            default_target: default_target(),
            download_policy: default_await(),
        }
    }
}

fn default_source_language() -> String {
    "en".into()
}

fn default_target() -> String {
    "es".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(flatten)]
    pub options: SummarizerOptions,
    #[serde(default = "default_return_early")]
    pub download_policy: DownloadPolicy,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            options: SummarizerOptions::default(),
            download_policy: default_return_early(),
        }
    }
}

fn default_return_early() -> DownloadPolicy {
    DownloadPolicy::ReturnEarly
}

fn resolve_config_path() -> TextLensResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("textlens").join(CONFIG_FILE);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config directory");
            return Ok(candidate);
        }
    }

    Err(TextLensError::Config(
        "config.toml not found next to executable, in working directory or user config directory"
            .into(),
    ))
}

pub fn parse_config(content: &str) -> TextLensResult<AppConfig> {
    Ok(toml::from_str(content)?)
}

pub fn load_config_from(path: &Path) -> TextLensResult<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), backend = %config.backend.active, "config loaded");
    Ok(config)
}

pub fn load_config() -> TextLensResult<AppConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

/// Writes over the config file in use, or creates one in the working directory.
pub fn save_config(config: &AppConfig) -> TextLensResult<PathBuf> {
    let path = match resolve_config_path() {
        Ok(p) => p,
        Err(_) => std::env::current_dir()?.join(CONFIG_FILE),
    };
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> TextLensResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
