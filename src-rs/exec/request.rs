use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};

/// One command to run, as it would be typed into the host shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub command: String,
    pub working_directory: PathBuf,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_directory: working_directory.into(),
        }
    }

    /// Checks done before anything is spawned.
    pub fn validate(&self) -> CoreResult<()> {
        if self.command.trim().is_empty() {
            return Err(CoreError::InvalidRequest("command is empty".to_string()));
        }
        if self.command.contains('\0') {
            return Err(CoreError::InvalidRequest(
                "command contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }
}
