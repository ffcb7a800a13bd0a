//! Per-view memoization of extraction results on disk.

use crate::error::Result;
use crate::extractor::{retain_version, Entry, Extractor};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tempfile::NamedTempFile;

/// Entries of one extraction, plus the non-fatal problems met while producing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub entries: Vec<Entry>,
    pub warnings: Vec<String>,
}

/// Stored form of one view's extraction.
#[derive(Debug, Serialize, Deserialize)]
struct Artifact {
    stamps: Vec<Stamp>,
    entries: Vec<Entry>,
}

/// Modification time of a resource when the artifact was written.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Stamp {
    path: PathBuf,
    modified: Option<u64>,
}

/// Wraps an [`Extractor`] and stores each view's entries in `<cache_file>.<view>`.
///
/// An existing artifact is always reused, unless `debug` is set: then every resource recorded in
/// it must still carry the same modification time.
pub struct CachingExtractor {
    inner: Extractor,
    cache_file: PathBuf,
    debug: bool,
}

impl CachingExtractor {
    pub fn new(inner: Extractor, cache_file: PathBuf, debug: bool) -> Self {
        Self {
            inner,
            cache_file,
            debug,
        }
    }

    pub fn inner(&self) -> &Extractor {
        &self.inner
    }

    pub fn artifact_path(&self, view: &str) -> PathBuf {
        let mut name = self.cache_file.clone().into_os_string();
        name.push(".");
        name.push(view);
        PathBuf::from(name)
    }

    pub fn all(&self, view: &str) -> Result<Extraction> {
        let path = self.artifact_path(view);
        if let Some(entries) = self.read_fresh(&path) {
            info!("Using cached entries from {}", path.display());
            return Ok(Extraction {
                entries,
                warnings: Vec::new(),
            });
        }

        let stamps = self.inner.resources()?.into_iter().map(stamp).collect();
        let entries = self.inner.all(view)?;
        let artifact = Artifact { stamps, entries };

        let mut warnings = Vec::new();
        if let Err(e) = write_artifact(&path, &artifact) {
            let warning = format!("Failed to write cache {}: {}", path.display(), e);
            warn!("{}", warning);
            warnings.push(warning);
        }

        Ok(Extraction {
            entries: artifact.entries,
            warnings,
        })
    }

    pub fn all_for_version(&self, api_version: &str, view: &str) -> Result<Extraction> {
        let mut extraction = self.all(view)?;
        retain_version(&mut extraction.entries, api_version);
        Ok(extraction)
    }

    /// The cached entries, when the artifact is readable and fresh.
    fn read_fresh(&self, path: &Path) -> Option<Vec<Entry>> {
        let content = fs::read(path).ok()?;
        let artifact: Artifact = match serde_json::from_slice(&content) {
            Ok(artifact) => artifact,
            Err(e) => {
                debug!("Ignoring unreadable cache {}: {}", path.display(), e);
                return None;
            }
        };

        if self.debug {
            let stale = artifact
                .stamps
                .iter()
                .find(|recorded| modified_millis(&recorded.path) != recorded.modified);
            if let Some(stale) = stale {
                debug!("Cache {} is stale: {} changed", path.display(), stale.path.display());
                return None;
            }
        }
        Some(artifact.entries)
    }
}

fn stamp(path: PathBuf) -> Stamp {
    let modified = modified_millis(&path);
    Stamp { path, modified }
}

fn modified_millis(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since_epoch.as_millis()).ok()
}

/// Writes through a temporary file in the target directory, renamed into place.
fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let bytes = serde_json::to_vec(artifact)?;
    let mut file = NamedTempFile::new_in(&dir)?;
    file.write_all(&bytes)?;
    file.persist(path).map_err(|e| e.error)?;

    debug!("Wrote cache {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParsedFile, SourceIndex};
    use crate::route::{RouteRecord, RouteSource};
    use crate::shape::structure::StructParser;
    use crate::shape::ShapeParsers;
    use indexmap::IndexMap;
    use std::cell::Cell;
    use std::fs::File;
    use std::rc::Rc;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const SOURCE: &str = r#"
        pub struct User { pub id: u64 }

        #[api_doc(resource, output = "User")]
        pub fn show() {}
    "#;

    struct CountingRoutes {
        calls: Rc<Cell<usize>>,
        table: PathBuf,
    }

    impl RouteSource for CountingRoutes {
        fn name(&self) -> &str {
            "counting"
        }

        fn routes(&self) -> Result<Vec<RouteRecord>> {
            self.calls.set(self.calls.get() + 1);
            let mut defaults = IndexMap::new();
            defaults.insert("_version".to_string(), "2".to_string());
            Ok(vec![RouteRecord {
                name: "user_show".to_string(),
                path: "/users/{id}".to_string(),
                methods: vec!["GET".to_string()],
                host: None,
                handler: "users::show".to_string(),
                defaults,
                requirements: IndexMap::new(),
            }])
        }

        fn resources(&self) -> Vec<PathBuf> {
            vec![self.table.clone()]
        }
    }

    fn setup(temp_dir: &TempDir, debug: bool) -> (CachingExtractor, Rc<Cell<usize>>) {
        let source_path = temp_dir.path().join("users.rs");
        fs::write(&source_path, SOURCE).unwrap();
        let table = temp_dir.path().join("routes.yaml");
        fs::write(&table, "{}").unwrap();

        let parsed = ParsedFile {
            path: source_path,
            module_path: vec!["users".to_string()],
            syntax_tree: syn::parse_file(SOURCE).unwrap(),
        };
        let index = Rc::new(SourceIndex::new(&[parsed]));
        let mut parsers = ShapeParsers::new();
        parsers.register(Box::new(StructParser::new(index.clone())));

        let calls = Rc::new(Cell::new(0));
        let extractor = Extractor::new(index, parsers).with_source(Box::new(CountingRoutes {
            calls: calls.clone(),
            table,
        }));
        let cache_file = temp_dir.path().join("cache/apidoc");
        (CachingExtractor::new(extractor, cache_file, debug), calls)
    }

    fn touch(path: &Path, secs: u64) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn test_artifact_path_appends_view() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, _) = setup(&temp_dir, false);
        assert_eq!(
            extractor.artifact_path("premium"),
            temp_dir.path().join("cache/apidoc.premium")
        );
    }

    #[test]
    fn test_second_read_hits_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, calls) = setup(&temp_dir, false);

        let first = extractor.all("default").unwrap();
        assert!(first.warnings.is_empty());
        assert_eq!(first.entries.len(), 1);
        assert!(extractor.artifact_path("default").exists());
        let misses = calls.get();

        let second = extractor.all("default").unwrap();
        assert_eq!(second.entries, first.entries);
        assert_eq!(calls.get(), misses);
    }

    #[test]
    fn test_debug_mode_detects_changed_resources() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, calls) = setup(&temp_dir, true);
        touch(&temp_dir.path().join("routes.yaml"), 1_000);

        extractor.all("default").unwrap();
        let misses = calls.get();
        extractor.all("default").unwrap();
        assert_eq!(calls.get(), misses);

        touch(&temp_dir.path().join("routes.yaml"), 2_000);
        extractor.all("default").unwrap();
        assert!(calls.get() > misses);
    }

    #[test]
    fn test_corrupt_artifact_is_a_miss() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, calls) = setup(&temp_dir, false);
        let path = extractor.artifact_path("default");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        let extraction = extractor.all("default").unwrap();
        assert_eq!(extraction.entries.len(), 1);
        assert!(calls.get() > 0);

        let stored: Artifact = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored.entries, extraction.entries);
    }

    #[test]
    fn test_write_failure_serves_fresh_entries() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, _) = setup(&temp_dir, false);
        fs::write(temp_dir.path().join("cache"), "a file, not a directory").unwrap();

        let extraction = extractor.all("default").unwrap();
        assert_eq!(extraction.entries.len(), 1);
        assert_eq!(extraction.warnings.len(), 1);
        assert!(extraction.warnings[0].starts_with("Failed to write cache"));
    }

    #[test]
    fn test_version_filter_uses_cached_entries() {
        let temp_dir = TempDir::new().unwrap();
        let (extractor, _) = setup(&temp_dir, false);

        assert_eq!(extractor.all_for_version("2.0", "default").unwrap().entries.len(), 1);
        assert!(extractor.all_for_version("1", "default").unwrap().entries.is_empty());
    }
}
