#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_span::Span;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const RSX_PROPS_MUTATION: &str = "RSX-E001";
pub const RSX_BANNED_PRIMITIVE: &str = "RSX-E002";
pub const RSX_RESERVED_IDENTIFIER: &str = "RSX-E003";
pub const RSX_PARSE: &str = "RSX-E004";
pub const RSX_SHORTHAND_WRITE: &str = "RSX-E005";
pub const RSX_IO: &str = "RSX-E006";
pub const RSX_CONFIG: &str = "RSX-E007";

pub const RSX_PROP_DERIVED_STATE: &str = "RSX-W001";
pub const RSX_RETURN_DISCARDED: &str = "RSX-W002";

/// Every internal identifier emitted by the compiler starts with this prefix.
pub const RESERVED_PREFIX: &str = "__rsx_";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_guarantee(code: &str) -> &'static str {
    match code {
        RSX_PROPS_MUTATION => "Props are a read-only snapshot of the incoming call.",
        RSX_BANNED_PRIMITIVE => {
            "Instance state lives in promoted locals. Host state primitives are never called by user code."
        }
        RSX_RESERVED_IDENTIFIER => "Compiler-internal names never collide with user bindings.",
        RSX_PARSE => "Only syntactically valid modules are transformed.",
        RSX_SHORTHAND_WRITE => "Every write to a promoted local lands in instance storage.",
        RSX_IO => "Project compilation reads every discovered source file.",
        RSX_CONFIG => "Compiler options are validated before any file is compiled.",
        RSX_PROP_DERIVED_STATE => "Instance state is seeded once and does not follow props.",
        RSX_RETURN_DISCARDED => "The component returns the result of its registered view.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
#[error("{file}:{line}:{column}: [{code}] {message}")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self::with_details(code, message, file, line, column, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        file: &str,
        line: u32,
        column: u32,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context,
            hints,
        }
    }

    /// Error that is not tied to a position in a source file.
    pub fn unlocated(code: &str, message: &str, file: &str) -> Self {
        Self::new(code, message, file, 0, 0)
    }

    /// Long-form rendering with context line and hints, for terminal output.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n  guarantee: {}", self, self.guarantee);
        if let Some(ctx) = &self.context {
            out.push_str(&format!("\n  | {}", ctx));
        }
        for hint in &self.hints {
            out.push_str(&format!("\n  hint: {}", hint));
        }
        out
    }
}

fn error_type(code: &str) -> &'static str {
    match code {
        RSX_PARSE => "PARSE_ERROR",
        RSX_IO => "IO_ERROR",
        RSX_CONFIG => "CONFIG_ERROR",
        _ => "RSX_RULE_VIOLATION",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WARNINGS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerWarning {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
}

impl std::fmt::Display for CompilerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: [{}] {}",
            self.file, self.line, self.column, self.code, self.message
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved position of a byte offset: 1-based line and column, plus the text of that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
    pub line_text: String,
}

pub fn locate(source: &str, offset: u32) -> SourcePosition {
    let offset = (offset as usize).min(source.len());
    let before = match source.get(..offset) {
        Some(s) => s,
        None => return SourcePosition { line: 1, column: 1, line_text: String::new() },
    };
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = before.matches('\n').count() as u32 + 1;
    let column = before[line_start..].chars().count() as u32 + 1;
    let line_end = source[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(source.len());
    SourcePosition {
        line,
        column,
        line_text: source[line_start..line_end].trim_end_matches('\r').to_string(),
    }
}

/// Builds diagnostics for one source file.
pub struct DiagnosticBuilder<'s> {
    pub file: &'s str,
    pub source: &'s str,
}

impl<'s> DiagnosticBuilder<'s> {
    pub fn error(
        &self,
        code: &str,
        message: &str,
        span: Span,
        hints: Vec<String>,
    ) -> CompilerError {
        let pos = locate(self.source, span.start);
        CompilerError::with_details(
            code,
            message,
            self.file,
            pos.line,
            pos.column,
            Some(pos.line_text),
            hints,
        )
    }

    pub fn warning(&self, code: &str, message: &str, span: Span) -> CompilerWarning {
        let pos = locate(self.source, span.start);
        CompilerWarning {
            code: code.to_string(),
            message: message.to_string(),
            file: self.file.to_string(),
            line: pos.line,
            column: pos.column,
            context: Some(pos.line_text),
        }
    }
}
