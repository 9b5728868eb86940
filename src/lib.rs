//! # RSX Compiler
//!
//! Rewrites `.rsx` components, written as if their body runs once per
//! instance, into host components that the host runtime re-invokes on every
//! render.
//!
//! ## Guarantees
//!
//! 1. **Instance Storage**: every local declared directly in the component body
//!    lives on one record per instance (`__rsx_instance`). Reads and writes at
//!    any depth of the body go through that record.
//!    - `count` → `__rsx_instance.count`
//!    - `let count = 0;` → `__rsx_instance.count = 0;` (runs once, on init)
//!
//! 2. **Init Once**: the body runs exactly once per instance with the lifecycle
//!    context `{ view, update, destroy, render, props }`, then the view runs.
//!
//! 3. **Update On Change**: later calls whose props differ by reference run the
//!    `update(prev, next)` callback and the view again.
//!
//! 4. **Props Are Read-Only**: writing through props is a compile error
//!    (`RSX-E001`). Seeding instance state from props is a warning (`RSX-W001`).
//!
//! 5. **No Host State Primitives**: `useState`, `useCallback` and `useMemo`
//!    imported from the host module are compile errors (`RSX-E002`).
//!
//! 6. **Reserved Namespace**: `__rsx_` names belong to the compiler. User code
//!    that binds or references one is rejected (`RSX-E003`).
//!
//! Files that are not `.rsx`, or that have no default-exported component,
//! pass through unchanged.

#[cfg(feature = "napi")]
use napi_derive::napi;

mod ban;
mod cache;
mod config;
mod context;
mod diagnostics;
mod discovery;
mod filter;
mod guard;
mod hygiene;
mod lifecycle;
mod locate;
mod pipeline;
mod promote;
mod rewrite;
mod scope;


pub use ban::{BannedAliasSet, BannedPrimitive};
pub use cache::IncrementalCache;
pub use config::CompileOptions;
pub use diagnostics::*;
pub use discovery::{compile_project, discover_sources, ProjectEntry};
pub use filter::FileFilter;
pub use pipeline::{compile, compile_with_options, CompileOutput};

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn to_napi_error(err: CompilerError) -> napi::Error {
    napi::Error::from_reason(err.render())
}

/// Compiles one file for the build tool. `options_json` uses the camelCase
/// option names, e.g. `{"include": "src/.*"}`.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_rsx(
    source: String,
    file_path: String,
    options_json: Option<String>,
) -> napi::Result<CompileOutput> {
    let options =
        CompileOptions::from_json(options_json.as_deref().unwrap_or("")).map_err(to_napi_error)?;
    compile_with_options(&source, &file_path, &options).map_err(to_napi_error)
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_rsx_project(
    root: String,
    options_json: Option<String>,
) -> napi::Result<serde_json::Value> {
    let options =
        CompileOptions::from_json(options_json.as_deref().unwrap_or("")).map_err(to_napi_error)?;
    let entries = compile_project(std::path::Path::new(&root), &options).map_err(to_napi_error)?;
    serde_json::to_value(entries).map_err(|e| napi::Error::from_reason(e.to_string()))
}

#[cfg(feature = "napi")]
#[napi]
pub fn compile_bridge() -> String {
    "RSX Native Bridge Connected".to_string()
}
