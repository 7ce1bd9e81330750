use std::path::Path;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::error::{CoreError, CoreResult};
use crate::exec::{ExecutionChannel, ExecutionHandle, ExecutionRequest, FileRunner};
use crate::llm::dispatch::{ChatDispatcher, ChatEvent, ChatRequest};
use crate::project::{ProjectMetadata, ProjectScanner, ProjectStructure};

use super::registry::ProviderRegistry;

/// Everything a front end needs, built once from an [`AppConfig`].
///
/// Replies to `ask`, `analyze` and `generate` arrive on the receiver returned
/// by [`AssistantSession::from_config`], tagged with the request id these
/// methods return.
#[derive(Debug)]
pub struct AssistantSession {
    pub registry: ProviderRegistry,
    dispatcher: ChatDispatcher,
    channel: ExecutionChannel,
    scanner: ProjectScanner,
    runner: FileRunner,
    metadata_file: String,
}

impl AssistantSession {
    pub fn from_config(config: &AppConfig) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        Self::with_registry(ProviderRegistry::from_config(config), config)
    }

    pub fn with_registry(
        registry: ProviderRegistry,
        config: &AppConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (dispatcher, events) = ChatDispatcher::new();
        let session = Self {
            registry,
            dispatcher,
            channel: ExecutionChannel::from_config(&config.execution),
            scanner: ProjectScanner::from_config(&config.scanner),
            runner: FileRunner::from_config(&config.runner),
            metadata_file: config.project.metadata_file.clone(),
        };
        (session, events)
    }

    fn submit(&self, request: ChatRequest) -> CoreResult<String> {
        let provider = self
            .registry
            .current()
            .ok_or_else(|| CoreError::NotFound("no active provider".to_string()))?;
        let name = self.registry.active_name().unwrap_or_default().to_string();
        let (request_id, _task) = self.dispatcher.dispatch(&name, provider, request)?;
        Ok(request_id)
    }

    /// Sends `message` to the active provider, with a scan of `project` as
    /// context when given.
    pub fn ask(&self, message: &str, project: Option<&Path>) -> CoreResult<String> {
        let context = match project {
            Some(root) => vec![self.scan(root)?.to_context()],
            None => Vec::new(),
        };
        self.submit(ChatRequest::Send {
            message: message.to_string(),
            context,
        })
    }

    pub fn analyze(&self, code: &str, language: Option<&str>) -> CoreResult<String> {
        self.submit(ChatRequest::AnalyzeCode {
            code: code.to_string(),
            language: language.map(str::to_string),
        })
    }

    pub fn generate(&self, prompt: &str, language: Option<&str>) -> CoreResult<String> {
        self.submit(ChatRequest::GenerateCode {
            prompt: prompt.to_string(),
            language: language.map(str::to_string),
        })
    }

    pub fn scan(&self, root: &Path) -> CoreResult<ProjectStructure> {
        self.scanner.scan(root)
    }

    /// Loads the metadata file under `root`, creating it on first use.
    pub fn project_metadata(&self, root: &Path) -> anyhow::Result<ProjectMetadata> {
        ProjectMetadata::load_or_create(root, &self.metadata_file)
    }

    pub fn save_metadata(&self, root: &Path, metadata: &ProjectMetadata) -> anyhow::Result<()> {
        metadata.save(root, &self.metadata_file)
    }

    pub fn run_command(&self, command: &str, working_directory: &Path) -> CoreResult<ExecutionHandle> {
        self.channel
            .launch(ExecutionRequest::new(command, working_directory))
    }

    pub fn run_file(&self, path: &Path, working_directory: &Path) -> CoreResult<ExecutionHandle> {
        self.runner.run_path(&self.channel, path, working_directory)
    }

    pub fn run_source(
        &self,
        file_name: &str,
        content: &str,
        working_directory: &Path,
    ) -> CoreResult<ExecutionHandle> {
        self.runner
            .run_source(&self.channel, file_name, content, working_directory)
    }
}
