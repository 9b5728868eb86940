//! Project compilation.
//!
//! Recursively scans a directory for DSL files and compiles them in parallel.
//! Each file gets its own arena and context, so workers share nothing.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::cache::IncrementalCache;
use crate::config::CompileOptions;
use crate::diagnostics::{CompilerError, RSX_IO};
use crate::filter::FileFilter;
use crate::pipeline::{compile_with_options, CompileOutput};

const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "dist", "target"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectEntry {
    pub path: String,
    pub output: Option<CompileOutput>,
    pub error: Option<CompilerError>,
    pub cached: bool,
}

impl ProjectEntry {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// All DSL files under `root`, sorted.
pub fn discover_sources(
    root: &Path,
    options: &CompileOptions,
) -> Result<Vec<PathBuf>, CompilerError> {
    if !root.exists() {
        return Err(CompilerError::unlocated(
            RSX_IO,
            "Project root does not exist.",
            &root.to_string_lossy(),
        ));
    }
    let filter = FileFilter::new(options)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(true).into_iter().filter_entry(|entry| {
        !(entry.file_type().is_dir()
            && entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
    });
    for entry in walker.flatten() {
        let path = entry.path();
        if path.is_file() && filter.matches(&path.to_string_lossy()) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Compiles every DSL file under `root`. One failing file does not stop the others.
pub fn compile_project(
    root: &Path,
    options: &CompileOptions,
) -> Result<Vec<ProjectEntry>, CompilerError> {
    let files = discover_sources(root, options)?;
    let cache = match &options.cache_dir {
        Some(dir) => Some(IncrementalCache::new(dir, options)?),
        None => None,
    };

    let entries: Vec<ProjectEntry> = files
        .par_iter()
        .map(|path| compile_file(path, options, cache.as_ref()))
        .collect();

    let failed = entries.iter().filter(|e| !e.is_ok()).count();
    let cached = entries.iter().filter(|e| e.cached).count();
    info!(
        root = %root.display(),
        files = entries.len(),
        failed,
        cached,
        "compiled rsx project"
    );
    Ok(entries)
}

fn compile_file(
    path: &Path,
    options: &CompileOptions,
    cache: Option<&IncrementalCache>,
) -> ProjectEntry {
    let path_str = path.to_string_lossy().to_string();
    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return ProjectEntry {
                error: Some(CompilerError::unlocated(
                    RSX_IO,
                    &format!("Failed to read file: {}", e),
                    &path_str,
                )),
                path: path_str,
                output: None,
                cached: false,
            };
        }
    };

    if let Some(output) = cache.and_then(|c| c.get(&path_str, &source)) {
        return ProjectEntry {
            path: path_str,
            output: Some(output),
            error: None,
            cached: true,
        };
    }

    match compile_with_options(&source, &path_str, options) {
        Ok(output) => {
            if let Some(c) = cache {
                c.set(&path_str, &source, &output);
            }
            ProjectEntry {
                path: path_str,
                output: Some(output),
                error: None,
                cached: false,
            }
        }
        Err(error) => ProjectEntry {
            path: path_str,
            output: None,
            error: Some(error),
            cached: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = "export default function Counter({ view }) {\n  let count = 0;\n  view(() => count);\n}\n";

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn discovers_rsx_files_and_skips_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/b.rsx", COUNTER);
        write(dir.path(), "src/a.rsx", COUNTER);
        write(dir.path(), "src/c.tsx", COUNTER);
        write(dir.path(), "node_modules/pkg/d.rsx", COUNTER);

        let files = discover_sources(dir.path(), &CompileOptions::default()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.rsx", "b.rsx"]);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let err = discover_sources(Path::new("/definitely/not/here"), &CompileOptions::default())
            .unwrap_err();
        assert_eq!(err.code, RSX_IO);
    }

    #[test]
    fn project_compiles_each_file_independently() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.rsx", COUNTER);
        write(
            dir.path(),
            "bad.rsx",
            "export default function Bad({ props }) { props.x = 1; }\n",
        );

        let entries = compile_project(dir.path(), &CompileOptions::default()).unwrap();
        assert_eq!(entries.len(), 2);
        let bad = entries.iter().find(|e| e.path.ends_with("bad.rsx")).unwrap();
        let ok = entries.iter().find(|e| e.path.ends_with("ok.rsx")).unwrap();
        assert!(bad.error.as_ref().unwrap().message.contains("Props are immutable"));
        assert!(ok.output.as_ref().unwrap().code.contains("__rsx_instance.count"));
    }

    #[test]
    fn second_run_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok.rsx", COUNTER);
        let options = CompileOptions {
            cache_dir: Some(cache_dir.path().to_path_buf()),
            ..CompileOptions::default()
        };

        let first = compile_project(dir.path(), &options).unwrap();
        let second = compile_project(dir.path(), &options).unwrap();
        assert!(!first[0].cached);
        assert!(second[0].cached);
        assert_eq!(first[0].output, second[0].output);
    }
}
