use crate::error::Result;
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// File scanner for traversing project directories.
///
/// The `FileScanner` recursively walks a project directory collecting files with one
/// extension (`rs` by default). It skips the `target` directory and hidden directories.
///
/// # Example
///
/// ```no_run
/// use apidoc_from_source::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let samples = FileScanner::new(PathBuf::from("./samples")).with_extension("json");
/// let result = samples.scan().unwrap();
/// println!("Found {} samples", result.files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
    extension: String,
}

/// Result of directory scanning operation.
pub struct ScanResult {
    /// Matching files, in directory walk order
    pub files: Vec<PathBuf>,
    /// Warning messages for entries that could not be accessed
    pub warnings: Vec<String>,
}

impl FileScanner {
    /// Creates a scanner collecting `.rs` files under `root_path`.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            extension: "rs".to_string(),
        }
    }

    /// Collects files with `extension` (without the dot) instead.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Scans the directory tree.
    ///
    /// Inaccessible entries are logged and recorded as warnings; scanning continues.
    pub fn scan(&self) -> Result<ScanResult> {
        debug!(
            "Scanning {} for .{} files",
            self.root_path.display(),
            self.extension
        );
        let mut files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.path() == self.root_path {
                    return true;
                }

                let file_name = e.file_name().to_string_lossy();
                !file_name.starts_with('.') && file_name != "target"
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    let matches = path.extension().and_then(|s| s.to_str())
                        == Some(self.extension.as_str());
                    if path.is_file() && matches {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        Ok(ScanResult { files, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(result: &ScanResult) -> Vec<String> {
        result
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_scan_nested_sources() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/handlers")).unwrap();
        fs::write(root.join("src/lib.rs"), "pub mod handlers;").unwrap();
        fs::write(root.join("src/handlers/users.rs"), "pub fn list() {}").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(result.files.len(), 2);
        assert!(result.warnings.is_empty());
        assert!(names(&result).contains(&"users.rs".to_string()));
    }

    #[test]
    fn test_scan_skips_target_and_hidden() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir(root.join("target")).unwrap();
        fs::create_dir(root.join(".git")).unwrap();
        fs::write(root.join("target/build.rs"), "fn main() {}").unwrap();
        fs::write(root.join(".git/hook.rs"), "fn main() {}").unwrap();
        fs::write(root.join("main.rs"), "fn main() {}").unwrap();

        let result = FileScanner::new(root.to_path_buf()).scan().unwrap();

        assert_eq!(names(&result), vec!["main.rs".to_string()]);
    }

    #[test]
    fn test_scan_other_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("User.json"), "{}").unwrap();
        fs::write(root.join("Order.json"), "{}").unwrap();
        fs::write(root.join("lib.rs"), "").unwrap();

        let result = FileScanner::new(root.to_path_buf())
            .with_extension(".json")
            .scan()
            .unwrap();

        assert_eq!(names(&result), vec!["Order.json".to_string(), "User.json".to_string()]);
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new(temp_dir.path().to_path_buf()).scan().unwrap();

        assert!(result.files.is_empty());
        assert!(result.warnings.is_empty());
    }
}
