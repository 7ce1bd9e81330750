use std::fs;
use std::path::Path;

use crate::config::ScannerConfig;
use crate::error::CoreError;
use crate::llm::models::provider_base::Role;
use crate::project::{FileStatus, ProjectScanner};

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_lists_files_directories_and_languages() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let ten_lines: String = (0..10).map(|i| format!("x{} = {}\n", i, i)).collect();
        write(root, "a.py", ten_lines.as_bytes());
        write(root, "b/.hidden", b"secret\n");
        write(root, ".cache/c.py", b"z=3\n");

        let structure = ProjectScanner::default().scan(root).unwrap();

        assert_eq!(structure.files.len(), 1);
        assert_eq!(structure.files[0].path, "a.py");
        assert_eq!(structure.files[0].line_count, 10);
        assert_eq!(structure.files[0].extension, ".py");
        assert_eq!(structure.files[0].status, FileStatus::Counted);
        assert_eq!(structure.directories.iter().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(structure.languages.iter().collect::<Vec<_>>(), vec![".py"]);
        assert_eq!(structure.total_lines, 10);
        assert!(structure.skipped.is_empty());
    }

    #[test]
    fn nested_paths_are_slash_separated_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/zeta.rs", b"fn z() {}\n");
        write(root, "src/alpha.rs", b"fn a() {}\nfn b() {}");
        write(root, "README", b"hello\n");

        let structure = ProjectScanner::default().scan(root).unwrap();
        let paths: Vec<&str> = structure.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README", "src/alpha.rs", "src/zeta.rs"]);
        assert_eq!(structure.total_lines, 4);
        assert_eq!(
            structure.total_lines,
            structure.files.iter().map(|f| f.line_count).sum::<usize>()
        );
        // Files without an extension are listed but add no language.
        assert_eq!(structure.files[0].extension, "");
        assert_eq!(structure.languages.iter().collect::<Vec<_>>(), vec![".rs"]);
    }

    #[test]
    fn undecodable_file_counts_zero_lines_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "blob.bin", &[0xff, 0xfe, 0x00, 0x80, b'\n']);
        write(root, "ok.txt", b"one\ntwo\n");

        let structure = ProjectScanner::default().scan(root).unwrap();
        let blob = structure.files.iter().find(|f| f.path == "blob.bin").unwrap();
        assert_eq!(blob.status, FileStatus::Undecodable);
        assert_eq!(blob.line_count, 0);
        assert_eq!(structure.total_lines, 2);
    }

    #[test]
    fn transient_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "node_modules/pkg/index.js", b"x\n");
        write(root, "__pycache__/a.pyc", b"x\n");
        write(root, "app/main.js", b"x\n");

        let structure = ProjectScanner::default().scan(root).unwrap();
        let paths: Vec<&str> = structure.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["app/main.js"]);
        assert!(!structure.directories.contains("node_modules"));

        let custom = ProjectScanner::from_config(&ScannerConfig {
            skip_dirs: vec!["app".to_string()],
        });
        let structure = custom.scan(root).unwrap();
        assert!(structure.files.iter().all(|f| !f.path.starts_with("app/")));
        assert!(structure.files.iter().any(|f| f.path == "node_modules/pkg/index.js"));
    }

    #[test]
    fn rescanning_unchanged_tree_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.py", b"1\n2\n3\n");
        write(root, "lib/b.lua", b"print(1)\n");

        let scanner = ProjectScanner::default();
        assert_eq!(scanner.scan(root).unwrap(), scanner.scan(root).unwrap());
    }

    #[test]
    fn empty_directory_yields_empty_structure() {
        let dir = tempfile::tempdir().unwrap();
        let structure = ProjectScanner::default().scan(dir.path()).unwrap();
        assert!(structure.files.is_empty());
        assert!(structure.directories.is_empty());
        assert_eq!(structure.total_lines, 0);
    }

    #[test]
    fn non_directory_root_is_invalid_request() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        let scanner = ProjectScanner::default();
        assert!(matches!(scanner.scan(&file), Err(CoreError::InvalidRequest(_))));
        assert!(matches!(
            scanner.scan(&dir.path().join("missing")),
            Err(CoreError::InvalidRequest(_))
        ));
    }

    #[test]
    fn summary_becomes_system_context_message() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.py", b"print('hi')\n");

        let structure = ProjectScanner::default().scan(dir.path()).unwrap();
        let summary = structure.summary();
        assert!(summary.contains("1 files"));
        assert!(summary.contains("main.py (1 lines)"));

        let message = structure.to_context();
        assert_eq!(message.role, Role::System);
        assert_eq!(message.content, summary);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_recorded_as_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "locked/secret.txt", b"x\n");
        write(root, "open.txt", b"x\n");
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything; nothing to observe in that case.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let structure = ProjectScanner::default().scan(root).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(structure.skipped.iter().any(|s| s.path == "locked"));
        assert!(structure.files.iter().any(|f| f.path == "open.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_listed_and_directories_are_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.py", b"1\n2\n3\n");
        write(root, "pkg/mod.rs", b"fn m() {}\n");
        symlink(root.join("a.py"), root.join("link.py")).unwrap();
        symlink(root.join("pkg"), root.join("pkg_link")).unwrap();
        symlink(root.join("missing.txt"), root.join("dangling.txt")).unwrap();

        let structure = ProjectScanner::default().scan(root).unwrap();
        let paths: Vec<&str> = structure.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.py", "dangling.txt", "link.py", "pkg/mod.rs"]);

        let link = structure.files.iter().find(|f| f.path == "link.py").unwrap();
        assert_eq!(link.status, FileStatus::Counted);
        assert_eq!(link.line_count, 3);
        let dangling = structure.files.iter().find(|f| f.path == "dangling.txt").unwrap();
        assert_eq!(dangling.status, FileStatus::Unreadable);
        assert_eq!(dangling.line_count, 0);
        assert_eq!(structure.total_lines, 7);

        assert!(!structure.directories.contains("pkg_link"));
        assert!(structure
            .skipped
            .iter()
            .any(|s| s.path == "pkg_link" && s.reason.contains("symlinked directory")));
    }
}
