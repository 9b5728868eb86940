//! Compiler options.
//!
//! Options arrive either as a Rust value or as camelCase JSON from the build
//! tool integration, e.g. `{"include": "src/.*", "hostModule": "preact/compat"}`.

use crate::diagnostics::{CompilerError, RSX_CONFIG};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// File name suffixes that mark a DSL file.
    pub extensions: Vec<String>,
    /// Regex a path must match to be compiled.
    pub include: Option<String>,
    /// Regex that removes matching paths from compilation.
    pub exclude: Option<String>,
    /// Module the host hooks are imported from.
    pub host_module: String,
    /// Further host primitives to reject alongside the built-in three.
    pub extra_banned: Vec<String>,
    pub source_map: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            extensions: vec![".rsx".to_string()],
            include: None,
            exclude: None,
            host_module: "react".to_string(),
            extra_banned: Vec::new(),
            source_map: true,
            cache_dir: None,
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> Result<Self, CompilerError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let options: CompileOptions = serde_json::from_str(json).map_err(|e| {
            CompilerError::with_details(
                RSX_CONFIG,
                &format!("Invalid compiler options: {}", e),
                "<options>",
                e.line() as u32,
                e.column() as u32,
                None,
                vec![],
            )
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), CompilerError> {
        if self.extensions.is_empty() {
            return Err(CompilerError::unlocated(
                RSX_CONFIG,
                "At least one file extension is required.",
                "<options>",
            ));
        }
        if self.host_module.trim().is_empty() {
            return Err(CompilerError::unlocated(
                RSX_CONFIG,
                "hostModule must not be empty.",
                "<options>",
            ));
        }
        Ok(())
    }

    /// Stable digest of every option that affects generated output.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.extensions.join("\0").as_bytes());
        hasher.update([0xff]);
        hasher.update(self.include.as_deref().unwrap_or("").as_bytes());
        hasher.update([0xff]);
        hasher.update(self.exclude.as_deref().unwrap_or("").as_bytes());
        hasher.update([0xff]);
        hasher.update(self.host_module.as_bytes());
        hasher.update([0xff]);
        hasher.update(self.extra_banned.join("\0").as_bytes());
        hasher.update([self.source_map as u8]);
        format!("{:x}", hasher.finalize())
    }
}
