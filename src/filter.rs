use crate::config::CompileOptions;
use crate::diagnostics::{CompilerError, RSX_CONFIG};
use regex::Regex;

/// Decides whether a path is a DSL file.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl FileFilter {
    pub fn new(options: &CompileOptions) -> Result<Self, CompilerError> {
        Ok(Self {
            extensions: options.extensions.clone(),
            include: compile_pattern("include", options.include.as_deref())?,
            exclude: compile_pattern("exclude", options.exclude.as_deref())?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        // Query strings appended by bundlers do not count toward the extension.
        let bare = path.split('?').next().unwrap_or(path);
        if !self.extensions.iter().any(|ext| bare.ends_with(ext.as_str())) {
            return false;
        }
        if let Some(include) = &self.include {
            if !include.is_match(path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(path) {
                return false;
            }
        }
        true
    }
}

fn compile_pattern(name: &str, pattern: Option<&str>) -> Result<Option<Regex>, CompilerError> {
    match pattern {
        None => Ok(None),
        Some(p) => Regex::new(p).map(Some).map_err(|e| {
            CompilerError::with_details(
                RSX_CONFIG,
                &format!("Invalid {} pattern `{}`: {}", name, p, e),
                "<options>",
                0,
                0,
                None,
                vec![],
            )
        }),
    }
}
