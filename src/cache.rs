use crate::config::CompileOptions;
use crate::diagnostics::{CompilerError, RSX_IO};
use crate::pipeline::CompileOutput;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: CompileOutput,
}

/// On-disk cache of compile results, one JSON entry per source path.
pub struct IncrementalCache {
    cache_dir: PathBuf,
    fingerprint: String,
}

impl IncrementalCache {
    pub fn new(cache_dir: &Path, options: &CompileOptions) -> Result<Self, CompilerError> {
        fs::create_dir_all(cache_dir).map_err(|e| {
            CompilerError::unlocated(
                RSX_IO,
                &format!("Cannot create cache directory: {}", e),
                &cache_dir.to_string_lossy(),
            )
        })?;
        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            fingerprint: options.fingerprint(),
        })
    }

    /// Hash of everything that determines the output for `source` at `file_path`.
    /// The path is part of it: diagnostics and source maps name the file, and
    /// distinct paths may share a flattened cache file name.
    pub fn compute_hash(&self, file_path: &str, source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(env!("CARGO_PKG_VERSION").as_bytes());
        hasher.update([0]);
        hasher.update(self.fingerprint.as_bytes());
        hasher.update([0]);
        hasher.update(file_path.as_bytes());
        hasher.update([0]);
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path.replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, source: &str) -> Option<CompileOutput> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "discarding corrupt cache entry");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == self.compute_hash(file_path, source) {
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, output: &CompileOutput) {
        let entry = CacheEntry {
            hash: self.compute_hash(file_path, source),
            output: output.clone(),
        };
        match serde_json::to_string(&entry) {
            Ok(data) => {
                if let Err(e) = fs::write(self.get_cache_path(file_path), data) {
                    tracing::warn!(file = file_path, error = %e, "failed to write cache entry");
                }
            }
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "failed to serialize cache entry")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(code: &str) -> CompileOutput {
        CompileOutput {
            code: code.to_string(),
            map: None,
            warnings: vec![],
            transformed: true,
        }
    }

    #[test]
    fn hit_requires_identical_source() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path(), &CompileOptions::default()).unwrap();
        cache.set("src/App.rsx", "let a = 1;", &output("compiled"));
        assert_eq!(cache.get("src/App.rsx", "let a = 1;").unwrap().code, "compiled");
        assert!(cache.get("src/App.rsx", "let a = 2;").is_none());
        assert!(cache.get("src/Other.rsx", "let a = 1;").is_none());
    }

    #[test]
    fn paths_sharing_a_cache_file_do_not_share_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path(), &CompileOptions::default()).unwrap();
        assert_eq!(cache.get_cache_path("a/b_c.rsx"), cache.get_cache_path("a_b/c.rsx"));
        cache.set("a/b_c.rsx", "same source", &output("from a/b_c"));
        assert!(cache.get("a_b/c.rsx", "same source").is_none());
        assert_eq!(cache.get("a/b_c.rsx", "same source").unwrap().code, "from a/b_c");
    }

    #[test]
    fn options_change_invalidates_entries() {
        let dir = tempfile::tempdir().unwrap();
        let first = IncrementalCache::new(dir.path(), &CompileOptions::default()).unwrap();
        first.set("App.rsx", "src", &output("compiled"));
        let options = CompileOptions {
            host_module: "preact".to_string(),
            ..CompileOptions::default()
        };
        let second = IncrementalCache::new(dir.path(), &options).unwrap();
        assert!(second.get("App.rsx", "src").is_none());
    }

    #[test]
    fn corrupt_entry_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = IncrementalCache::new(dir.path(), &CompileOptions::default()).unwrap();
        let path = cache.get_cache_path("App.rsx");
        fs::write(&path, "{not json").unwrap();
        assert!(cache.get("App.rsx", "src").is_none());
        assert!(!path.exists());
    }
}
