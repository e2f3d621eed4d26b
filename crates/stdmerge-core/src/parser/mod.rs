//! Library Parser: walks a library root and builds a populated `Library`.
//!
//! One `LanguageAdapter` per ecosystem does the per-file work. A file that
//! cannot be read or parsed is skipped and recorded on the library as a
//! `ParseWarning`; only a missing root or an unknown ecosystem is fatal.

pub mod docs;
pub mod filesystem;
pub mod symbols;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::errors::{MergeError, StdResult};
use crate::models::{Library, ParseWarning};
use filesystem::{content_fingerprint, iter_source_files, relative_path};
pub use symbols::{GoAdapter, JavaAdapter, LanguageAdapter, PythonAdapter, TypeScriptAdapter};

/// Ecosystem tag → adapter.
#[derive(Clone)]
pub struct ParserRegistry {
    adapters: IndexMap<String, Arc<dyn LanguageAdapter>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(PythonAdapter));
        registry.register(Arc::new(TypeScriptAdapter));
        registry.register(Arc::new(GoAdapter));
        registry.register(Arc::new(JavaAdapter));
        registry
    }
}

impl ParserRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: IndexMap::new(),
        }
    }

    /// Add or replace the adapter for its ecosystem.
    pub fn register(&mut self, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.ecosystem().to_string(), adapter);
    }

    pub fn get(&self, ecosystem: &str) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters.get(ecosystem).cloned()
    }

    pub fn ecosystems(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// Parse one library root with the adapter registered for `ecosystem`.
    pub fn parse(&self, root: &Path, ecosystem: &str) -> StdResult<Library> {
        let adapter = self
            .get(ecosystem)
            .ok_or_else(|| MergeError::UnsupportedEcosystem {
                ecosystem: ecosystem.to_string(),
            })?;
        parse_with(adapter.as_ref(), root)
    }

    /// Parse several libraries on a bounded worker pool. Results keep the
    /// input order; each library succeeds or fails on its own.
    pub fn parse_all(
        &self,
        inputs: &[(String, PathBuf)],
        workers: usize,
    ) -> Vec<StdResult<Library>> {
        if inputs.is_empty() {
            return vec![];
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .build();
        match pool {
            Ok(pool) => pool.install(|| {
                inputs
                    .par_iter()
                    .map(|(eco, root)| self.parse(root, eco))
                    .collect()
            }),
            Err(e) => {
                warn!(error = %e, "worker pool unavailable, parsing sequentially");
                inputs
                    .iter()
                    .map(|(eco, root)| self.parse(root, eco))
                    .collect()
            }
        }
    }
}

/// Parse `root` as a library of `ecosystem` with the built-in adapters.
pub fn parse_library(root: &Path, ecosystem: &str) -> StdResult<Library> {
    ParserRegistry::default().parse(root, ecosystem)
}

fn parse_with(adapter: &dyn LanguageAdapter, root: &Path) -> StdResult<Library> {
    let ecosystem = adapter.ecosystem();
    if !root.is_dir() {
        return Err(MergeError::Parse {
            ecosystem: ecosystem.to_string(),
            path: root.to_path_buf(),
            reason: "library root does not exist or is not a directory".to_string(),
        });
    }

    let started = Instant::now();
    let files = iter_source_files(root, adapter.extensions());
    let mut library = Library::new(ecosystem, root);

    for file in &files {
        let rel = relative_path(root, file);
        let outcome = std::fs::read_to_string(file)
            .map_err(|e| e.to_string())
            .and_then(|source| adapter.parse_source(&source, &rel));
        match outcome {
            Ok(module) => {
                debug!(ecosystem, file = %rel, functions = module.all_functions().len(), "parsed module");
                library.add_module(module);
            }
            Err(reason) => {
                warn!(ecosystem, file = %rel, %reason, "skipping unparsable file");
                library.parse_warnings.push(ParseWarning { path: rel, reason });
            }
        }
    }

    library
        .metadata
        .insert("file_count".to_string(), files.len().to_string());
    library
        .metadata
        .insert("fingerprint".to_string(), content_fingerprint(root, &files));

    info!(
        ecosystem,
        root = %root.display(),
        modules = library.modules.len(),
        functions = library.functions.len(),
        skipped = library.parse_warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "library parsed"
    );
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_missing_root_is_parse_error() {
        let err = parse_library(Path::new("/nonexistent/lib"), "python").unwrap_err();
        assert!(matches!(err, MergeError::Parse { .. }));
    }

    #[test]
    fn test_unknown_ecosystem_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_library(dir.path(), "cobol").unwrap_err();
        assert!(matches!(err, MergeError::UnsupportedEcosystem { .. }));
    }

    #[test]
    fn test_bad_file_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.go", "package m\n\nfunc Add(a, b int) int {\n\treturn a + b\n}\n");
        write(dir.path(), "bad.go", "func Orphan() {}\n");

        let lib = parse_library(dir.path(), "go").unwrap();
        assert_eq!(lib.functions.len(), 1);
        assert_eq!(lib.functions[0].name, "Add");
        assert_eq!(lib.parse_warnings.len(), 1);
        assert_eq!(lib.parse_warnings[0].path, "bad.go");
        assert_eq!(lib.metadata["file_count"], "2");
    }

    #[test]
    fn test_parse_all_keeps_input_order() {
        let py = tempfile::tempdir().unwrap();
        let ts = tempfile::tempdir().unwrap();
        write(py.path(), "m.py", "def add(a, b):\n    return a + b\n");
        write(ts.path(), "m.ts", "export function add(a: number, b: number): number {\n  return a + b;\n}\n");

        let registry = ParserRegistry::default();
        let inputs = vec![
            ("typescript".to_string(), ts.path().to_path_buf()),
            ("cobol".to_string(), py.path().to_path_buf()),
            ("python".to_string(), py.path().to_path_buf()),
        ];
        let results = registry.parse_all(&inputs, 2);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().ecosystem, "typescript");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().functions[0].ecosystem(), "python");
    }

    #[test]
    fn test_registry_lists_builtins() {
        let registry = ParserRegistry::default();
        assert_eq!(registry.ecosystems(), vec!["python", "typescript", "go", "java"]);
    }
}
