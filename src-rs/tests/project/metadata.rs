use serde_json::json;
use std::fs;

use crate::llm::models::provider_base::Message;
use crate::project::ProjectMetadata;

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = ".ai_assistant.json";

    #[test]
    fn load_or_create_writes_defaults_named_after_directory() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("my-project");
        fs::create_dir(&root).unwrap();

        let metadata = ProjectMetadata::load_or_create(&root, FILE).unwrap();
        assert_eq!(metadata.project_name, "my-project");
        assert!(metadata.chat_history.is_empty());
        assert!(root.join(FILE).exists());

        let on_disk: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(root.join(FILE)).unwrap()).unwrap();
        assert_eq!(on_disk["project_name"], "my-project");
        assert_eq!(on_disk["ai_providers"], json!([]));
    }

    #[test]
    fn save_rewrites_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut metadata = ProjectMetadata::load_or_create(dir.path(), FILE).unwrap();
        metadata.note_provider("openai");
        metadata.note_provider("openai");
        metadata.record_exchange("hi", "hello");
        metadata.record_generated_file("gen/fizz.py");
        metadata.set_analysis("main.py", json!({"issues": 2}));
        metadata.save(dir.path(), FILE).unwrap();

        let reloaded = ProjectMetadata::load_or_create(dir.path(), FILE).unwrap();
        assert_eq!(reloaded, metadata);
        assert_eq!(reloaded.ai_providers, vec!["openai".to_string()]);
        assert_eq!(
            reloaded.chat_history,
            vec![Message::user("hi"), Message::assistant("hello")]
        );
        assert_eq!(reloaded.analysis["main.py"]["issues"], 2);

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE), r#"{"project_name":"legacy"}"#).unwrap();
        let metadata = ProjectMetadata::load_or_create(dir.path(), FILE).unwrap();
        assert_eq!(metadata.project_name, "legacy");
        assert!(metadata.generated_files.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FILE), "{not json").unwrap();
        assert!(ProjectMetadata::load_or_create(dir.path(), FILE).is_err());
    }
}
