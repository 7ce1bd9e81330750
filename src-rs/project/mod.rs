pub mod metadata;
pub mod scanner;

pub use metadata::ProjectMetadata;
pub use scanner::{FileStatus, ProjectFile, ProjectScanner, ProjectStructure, SkippedEntry};
