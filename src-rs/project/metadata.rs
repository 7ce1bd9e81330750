use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::llm::models::provider_base::Message;

/// Per-project record kept next to the sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub ai_providers: Vec<String>,
    #[serde(default)]
    pub chat_history: Vec<Message>,
    #[serde(default)]
    pub generated_files: Vec<String>,
    #[serde(default)]
    pub analysis: Map<String, Value>,
}

impl ProjectMetadata {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    /// Reads `root/file_name`, or writes a fresh record named after the
    /// directory when none exists yet.
    pub fn load_or_create(root: &Path, file_name: &str) -> Result<Self> {
        let path = root.join(file_name);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let metadata: ProjectMetadata = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            return Ok(metadata);
        }

        let name = root
            .canonicalize()
            .ok()
            .as_deref()
            .unwrap_or(root)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = Self::new(name);
        metadata.save(root, file_name)?;
        log::info!("Created project metadata at {}", path.display());
        Ok(metadata)
    }

    /// Rewrites the whole file.
    pub fn save(&self, root: &Path, file_name: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize metadata")?;
        atomic_write(&root.join(file_name), &json)
    }

    pub fn record_exchange(&mut self, user: &str, reply: &str) {
        self.chat_history.push(Message::user(user));
        self.chat_history.push(Message::assistant(reply));
    }

    pub fn record_generated_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.generated_files.contains(&path) {
            self.generated_files.push(path);
        }
    }

    pub fn set_analysis(&mut self, key: impl Into<String>, value: Value) {
        self.analysis.insert(key.into(), value);
    }

    pub fn note_provider(&mut self, name: &str) {
        if !self.ai_providers.iter().any(|p| p == name) {
            self.ai_providers.push(name.to_string());
        }
    }
}

fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .context("missing parent directory for atomic write")?;
    if !parent.exists() {
        fs::create_dir_all(parent).context("failed to create project directory")?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("metadata");
    let tmp_path = parent.join(format!("{file_name}.tmp.{}", std::process::id()));

    fs::write(&tmp_path, content).context("failed to write tmp file")?;
    fs::rename(&tmp_path, path).context("failed to rename tmp file")?;
    Ok(())
}
