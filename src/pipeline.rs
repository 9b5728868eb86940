//! The per-file compile pipeline.
//!
//! filter → parse → ban → hygiene → locate → promote/guard → rewrite →
//! lifecycle codegen → print. Every stage reads or writes the one
//! `CompileContext` and the one arena owned by this call.

#[cfg(feature = "napi")]
use napi_derive::napi;
use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_ast::AstBuilder;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::ban::BannedAliasSet;
use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::diagnostics::{locate, CompilerError, CompilerWarning, RSX_PARSE};
use crate::filter::FileFilter;
use crate::guard;
use crate::hygiene;
use crate::lifecycle;
use crate::locate::ComponentSite;
use crate::promote::Promotion;
use crate::rewrite::{RecordAccess, ReferenceRewriter};
use crate::scope::{param_names, PropsBinding, LIFECYCLE_NAMES};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    /// JSON source map, when enabled and the file was transformed.
    pub map: Option<String>,
    pub warnings: Vec<CompilerWarning>,
    /// False when the file was returned unchanged.
    pub transformed: bool,
}

impl CompileOutput {
    pub fn passthrough(source: &str) -> Self {
        Self {
            code: source.to_string(),
            map: None,
            warnings: Vec::new(),
            transformed: false,
        }
    }
}

/// Compiles one file with default options.
pub fn compile(source: &str, file_path: &str) -> Result<CompileOutput, CompilerError> {
    compile_with_options(source, file_path, &CompileOptions::default())
}

pub fn compile_with_options(
    source: &str,
    file_path: &str,
    options: &CompileOptions,
) -> Result<CompileOutput, CompilerError> {
    options.validate()?;
    if !FileFilter::new(options)?.matches(file_path) {
        return Ok(CompileOutput::passthrough(source));
    }
    debug!(file = file_path, "compiling rsx component");

    let mut ctx = CompileContext::new(file_path, source, options);
    let allocator = Allocator::default();
    let mut program = parse(&allocator, &ctx)?;

    BannedAliasSet::from_program(&program, options).check(&program, &ctx)?;
    hygiene::check_reserved(&program, &ctx)?;

    let Some(site) = ComponentSite::find(&program) else {
        debug!(file = file_path, "no default-exported component, passing through");
        return Ok(CompileOutput::passthrough(source));
    };

    let ast = AstBuilder::new(&allocator);
    let import = {
        let Some(mut component) = site.resolve(&mut program) else {
            return Ok(CompileOutput::passthrough(source));
        };
        let mut binding = PropsBinding::from_params(component.params());
        let params = param_names(component.params());
        let mut protected = params.clone();
        protected.extend(LIFECYCLE_NAMES.iter().map(|name| name.to_string()));
        let name = component.name();

        let Some(stmts) = component.statements_mut() else {
            return Ok(CompileOutput::passthrough(source));
        };
        binding.add_body_aliases(stmts);
        let promotion = Promotion::scan(stmts, &params, &ctx)?;
        guard::check_body(stmts, &binding, &promotion, &mut ctx)?;
        lifecycle::discard_returns(stmts, &mut ctx);
        let mut seeds = promotion.apply(stmts, &ast);

        let promoted = promotion.names().clone();
        let mut rewriter = ReferenceRewriter::new(ast, promoted.clone(), protected.clone());
        rewriter.rewrite_statements(stmts);
        let mut seed_rewriter =
            ReferenceRewriter::new(ast, promoted, protected).with_access(RecordAccess::Ref);
        for seed in &mut seeds {
            seed_rewriter.rewrite_expression(&mut seed.init);
        }
        debug!(
            file = file_path,
            component = %name,
            promoted = promotion.variables.len(),
            at_creation = seeds.len(),
            rewritten = rewriter.rewritten + seed_rewriter.rewritten,
            "promoted instance state"
        );

        lifecycle::emit(&allocator, component, &promotion, seeds, options, &ctx)?
    };
    program.body.insert(0, import);

    let (code, map) = print(&program, file_path, options);
    Ok(CompileOutput {
        code,
        map,
        warnings: ctx.warnings,
        transformed: true,
    })
}

fn source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_jsx(true)
        .with_typescript(true)
}

fn parse<'a>(
    allocator: &'a Allocator,
    ctx: &CompileContext<'a>,
) -> Result<Program<'a>, CompilerError> {
    let ret = Parser::new(allocator, ctx.source, source_type()).parse();
    if let Some(error) = ret.errors.first() {
        let offset = error
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset() as u32)
            .unwrap_or(0);
        let pos = locate(ctx.source, offset);
        return Err(CompilerError::with_details(
            RSX_PARSE,
            &format!("[RSX] Failed to parse: {}", error),
            ctx.file_path,
            pos.line,
            pos.column,
            Some(pos.line_text),
            vec![],
        ));
    }
    if ret.panicked {
        return Err(CompilerError::unlocated(RSX_PARSE, "[RSX] Failed to parse.", ctx.file_path));
    }
    Ok(ret.program)
}

fn print(
    program: &Program<'_>,
    file_path: &str,
    options: &CompileOptions,
) -> (String, Option<String>) {
    let mut codegen_options = CodegenOptions::default();
    if options.source_map {
        codegen_options.source_map_path = Some(PathBuf::from(file_path));
    }
    let ret = Codegen::new().with_options(codegen_options).build(program);
    (ret.code, ret.map.map(|map| map.to_json_string()))
}
