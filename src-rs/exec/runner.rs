use std::collections::BTreeMap;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::RunnerConfig;
use crate::error::{CoreError, CoreResult};

use super::channel::ExecutionChannel;
use super::handle::ExecutionHandle;
use super::request::ExecutionRequest;

/// Runs a source file with the interpreter registered for its extension.
#[derive(Debug, Clone)]
pub struct FileRunner {
    interpreters: BTreeMap<String, String>,
}

impl Default for FileRunner {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

impl FileRunner {
    pub fn from_config(config: &RunnerConfig) -> Self {
        let interpreters = config
            .interpreters
            .iter()
            .map(|(ext, program)| (normalize_extension(ext), program.clone()))
            .collect();
        Self { interpreters }
    }

    pub fn interpreter_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?;
        self.interpreters
            .get(&normalize_extension(ext))
            .map(String::as_str)
    }

    /// Shell command line that runs `path`.
    pub fn command_for(&self, path: &Path) -> CoreResult<String> {
        let interpreter = self.interpreter_for(path).ok_or_else(|| {
            CoreError::InvalidRequest(format!("no interpreter for file: {}", path.display()))
        })?;
        if find_on_path(interpreter).is_none() {
            return Err(CoreError::InvalidRequest(format!(
                "interpreter '{}' not found on PATH",
                interpreter
            )));
        }
        Ok(format!("{} {}", interpreter, shell_quote(&path.to_string_lossy())))
    }

    pub fn run_path(
        &self,
        channel: &ExecutionChannel,
        path: &Path,
        working_directory: &Path,
    ) -> CoreResult<ExecutionHandle> {
        let command = self.command_for(path)?;
        log::info!("Running {} with `{}`", path.display(), command);
        channel.launch(ExecutionRequest::new(command, working_directory))
    }

    /// Writes `content` to a temporary file named like `file_name` and runs it.
    /// The file is removed once the run has finished.
    pub fn run_source(
        &self,
        channel: &ExecutionChannel,
        file_name: &str,
        content: &str,
        working_directory: &Path,
    ) -> CoreResult<ExecutionHandle> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .ok_or_else(|| {
                CoreError::InvalidRequest(format!("no interpreter for file: {}", file_name))
            })?;

        let mut file = tempfile::Builder::new()
            .prefix("aiassist-run-")
            .suffix(&suffix)
            .tempfile()
            .map_err(|e| CoreError::Io(format!("failed to create temp file: {}", e)))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| CoreError::Io(format!("failed to write temp file: {}", e)))?;

        let scratch = file.into_temp_path();
        let command = self.command_for(&scratch)?;
        log::debug!("Running source '{}' from {}", file_name, scratch.display());
        channel.launch_with_scratch(
            ExecutionRequest::new(command, working_directory),
            Some(scratch),
        )
    }
}

/// Quotes `arg` so the host shell passes it through as one literal word.
#[cfg(not(windows))]
pub(crate) fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

#[cfg(windows)]
pub(crate) fn shell_quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', "\"\""))
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Absolute paths are accepted as-is when they exist.
fn find_on_path(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).find_map(|dir| {
        let full = dir.join(program);
        if full.is_file() {
            return Some(full);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
