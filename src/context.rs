use crate::config::CompileOptions;
use crate::diagnostics::{CompilerError, CompilerWarning, DiagnosticBuilder};
use oxc_span::Span;

/// Per-file compile state threaded through every pipeline stage.
///
/// Nothing here outlives a single `compile` call, so files can be compiled
/// on separate threads without coordination.
pub struct CompileContext<'s> {
    pub file_path: &'s str,
    pub source: &'s str,
    pub options: &'s CompileOptions,
    pub warnings: Vec<CompilerWarning>,
}

impl<'s> CompileContext<'s> {
    pub fn new(file_path: &'s str, source: &'s str, options: &'s CompileOptions) -> Self {
        Self {
            file_path,
            source,
            options,
            warnings: Vec::new(),
        }
    }

    fn builder(&self) -> DiagnosticBuilder<'s> {
        DiagnosticBuilder {
            file: self.file_path,
            source: self.source,
        }
    }

    pub fn error(
        &self,
        code: &str,
        message: &str,
        span: Span,
        hints: Vec<String>,
    ) -> CompilerError {
        self.builder().error(code, message, span, hints)
    }

    /// Records a non-fatal diagnostic and logs it.
    pub fn warn(&mut self, code: &str, message: &str, span: Span) {
        let warning = self.builder().warning(code, message, span);
        tracing::warn!(
            file = %warning.file,
            line = warning.line,
            column = warning.column,
            code = %warning.code,
            "{}",
            warning.message
        );
        self.warnings.push(warning);
    }
}
