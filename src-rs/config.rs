use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Provider configuration
///
/// One entry per backend under `[providers.<name>]`. Only `api_key` is
/// required at configure time; everything else falls back to the brand's
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend brand (e.g., "openai", "claude"). Defaults to the entry name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    /// API key for authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(
        default,
        alias = "model_id",
        alias = "model_name",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,

    /// Base URL for the API
    #[serde(default, alias = "base_url", skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Backend-specific extras (`max_tokens`, `system_prompt`, ...).
    /// Keys no backend recognizes are kept here and ignored.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn brand_or<'a>(&'a self, entry_name: &'a str) -> &'a str {
        self.brand.as_deref().unwrap_or(entry_name)
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    pub fn extra_u32(&self, key: &str) -> Option<u32> {
        self.extra
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }

    /// Field-wise override: values present in `patch` win.
    pub fn merge_from(&mut self, patch: ProviderConfig) {
        if patch.brand.is_some() {
            self.brand = patch.brand;
        }
        if patch.api_key.is_some() {
            self.api_key = patch.api_key;
        }
        if patch.model.is_some() {
            self.model = patch.model;
        }
        if patch.endpoint.is_some() {
            self.endpoint = patch.endpoint;
        }
        if patch.temperature.is_some() {
            self.temperature = patch.temperature;
        }
        self.extra.extend(patch.extra);
    }
}

/// Execution channel configuration from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Shell program. Defaults to `sh` (unix) or `cmd` (Windows).
    #[serde(default)]
    pub shell: Option<String>,

    /// Arguments placed before the command text. Defaults to `-c` / `/C`.
    #[serde(default)]
    pub shell_args: Option<Vec<String>>,

    /// How long a cancelled run may keep flushing output before its readers are dropped
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

fn default_cancel_grace_ms() -> u64 {
    500
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            shell: None,
            shell_args: None,
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

impl ExecutionConfig {
    pub fn shell_program(&self) -> String {
        match &self.shell {
            Some(s) if !s.trim().is_empty() => s.clone(),
            _ if cfg!(windows) => "cmd".to_string(),
            _ => "sh".to_string(),
        }
    }

    pub fn shell_arguments(&self) -> Vec<String> {
        match &self.shell_args {
            Some(args) => args.clone(),
            None if cfg!(windows) => vec!["/C".to_string()],
            None => vec!["-c".to_string()],
        }
    }
}

/// Project scanner configuration from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directory names never descended into (hidden entries are always skipped)
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_skip_dirs() -> Vec<String> {
    vec![
        "__pycache__".to_string(),
        "venv".to_string(),
        "node_modules".to_string(),
        "target".to_string(),
        "dist".to_string(),
        "build".to_string(),
    ]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_dirs: default_skip_dirs(),
        }
    }
}

/// File runner configuration from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Extension (with leading dot) to interpreter program
    #[serde(default = "default_interpreters")]
    pub interpreters: BTreeMap<String, String>,
}

fn default_interpreters() -> BTreeMap<String, String> {
    [
        (".py", "python3"),
        (".js", "node"),
        (".lua", "lua"),
        (".sh", "sh"),
        (".rb", "ruby"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreters: default_interpreters(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

fn default_metadata_file() -> String {
    ".ai_assistant.json".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            metadata_file: default_metadata_file(),
        }
    }
}

/// User override configuration (restricted fields)
#[derive(Deserialize)]
pub struct UserOverrideConfig {
    pub providers: Option<HashMap<String, ProviderConfig>>,
    pub active_provider: Option<String>,
    pub execution: Option<ExecutionConfig>,
    pub skip_dirs: Option<Vec<String>>,
    pub interpreters: Option<HashMap<String, String>>,
}

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider entries keyed by name
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,

    /// Provider activated when the registry is built from this config
    #[serde(default)]
    pub active_provider: Option<String>,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub project: ProjectConfig,
}

impl AppConfig {
    /// Load configuration with layered strategy:
    /// 1. Defaults (Embedded Config.toml)
    /// 2. User Config (~/.aiassist/config.json)
    /// 3. Project Config (./.aiassist/config.json)
    pub fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".aiassist").join("config.json");
            Self::apply_patch(&mut config, user_path);
        }

        let project_path = Path::new(".aiassist").join("config.json");
        Self::apply_patch(&mut config, project_path);

        Ok(config)
    }

    /// The embedded Config.toml alone.
    pub fn defaults() -> Result<Self> {
        let default_str = include_str!("../Config.toml");
        toml::from_str(default_str).context("Failed to parse embedded Config.toml")
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.get(name)
    }

    pub(crate) fn apply_patch<P: AsRef<Path>>(config: &mut AppConfig, path: P) {
        let path = path.as_ref();
        if !path.exists() {
            return;
        }
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read config patch at {}: {}", path.display(), e);
                return;
            }
        };
        match serde_json::from_str::<UserOverrideConfig>(&content) {
            Ok(patch) => {
                log::debug!("Applying config patch from {}", path.display());
                if let Some(providers) = patch.providers {
                    for (name, p) in providers {
                        if name.trim().is_empty() {
                            continue;
                        }
                        config.providers.entry(name).or_default().merge_from(p);
                    }
                }
                if let Some(active) = patch.active_provider {
                    config.active_provider = Some(active);
                }
                if let Some(execution) = patch.execution {
                    config.execution = execution;
                }
                if let Some(skip_dirs) = patch.skip_dirs {
                    config.scanner.skip_dirs = skip_dirs;
                }
                if let Some(interpreters) = patch.interpreters {
                    config.runner.interpreters.extend(interpreters);
                }
            }
            Err(e) => {
                log::warn!("Failed to parse config patch at {}: {}", path.display(), e);
            }
        }
    }
}
