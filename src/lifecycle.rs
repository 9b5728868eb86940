//! Lifecycle codegen.
//!
//! The generated component is written once as JavaScript source, parsed into
//! the same arena as the user's module, and then the user's parameters and
//! body are moved into its setup function. The user's function node keeps its
//! name and position; only its parameters and body are replaced.

use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::diagnostics::{CompilerError, RSX_PARSE, RSX_RETURN_DISCARDED};
use crate::locate::ComponentFn;
use crate::promote::{CreationSeed, Promotion, Seeding};
use crate::rewrite::{record_member, RecordAccess, INSTANCE, INSTANCE_REF};
use oxc_allocator::{Allocator, Vec as ArenaVec};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::VisitMut;
use oxc_parser::Parser;
use oxc_span::{SourceType, Span, SPAN};

pub const SETUP: &str = "__rsx_setup";

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Whether the user's function takes more than the lifecycle context, e.g. a
/// forwarded `ref`. The generated function then declares two parameters so
/// hosts that inspect `fn.length` see a ref-forwarding render function.
pub fn forwards_extra_args(params: &FormalParameters<'_>) -> bool {
    params.items.len() > 1 || params.rest.is_some()
}

/// Source of the host import and the generated component, for the given
/// promoted names (in declaration order).
pub fn template_source(promotion: &Promotion, host_module: &str, forward_args: bool) -> String {
    let host = serde_json::to_string(host_module)
        .unwrap_or_else(|_| format!("\"{}\"", host_module));
    let (params, setup_args) = if forward_args {
        ("__rsx_props, __rsx_ref, ...__rsx_rest", "__rsx_ctx, __rsx_ref, ...__rsx_rest")
    } else {
        ("__rsx_props", "__rsx_ctx")
    };
    let mut slots = String::new();
    for var in &promotion.variables {
        slots.push_str(&format!("      {}: undefined,\n", var.name));
    }
    format!(
        r#"import {{ useRef as __rsx_useRef, useState as __rsx_useState, useEffect as __rsx_useEffect }} from {host};
function __rsx_component({params}) {{
  const [, __rsx_forceUpdate] = __rsx_useState(0);
  const {instance_ref} = __rsx_useRef(null);
  if ({instance_ref}.current === null) {{
    {instance_ref}.current = {{
{slots}      __rsx_initialized: false,
      __rsx_prevProps: undefined,
      __rsx_currentProps: undefined,
      __rsx_viewCb: null,
      __rsx_updateCb: null,
      __rsx_destroyCb: null,
      __rsx_viewResult: null,
      __rsx_triggerRender: null
    }};
    {instance_ref}.current.__rsx_triggerRender = () => __rsx_forceUpdate((n) => n + 1);
  }}
  const {instance} = {instance_ref}.current;
  __rsx_useEffect(() => () => {{
    if ({instance}.__rsx_destroyCb) {instance}.__rsx_destroyCb();
  }}, []);
  {instance}.__rsx_prevProps = {instance}.__rsx_currentProps;
  {instance}.__rsx_currentProps = __rsx_props;
  function __rsx_render() {{
    if ({instance}.__rsx_viewCb) {{
      {instance}.__rsx_viewResult = {instance}.__rsx_viewCb({instance}.__rsx_currentProps);
    }}
  }}
  const __rsx_ctx = {{
    view(fn) {{ {instance}.__rsx_viewCb = fn; }},
    update(fn) {{ {instance}.__rsx_updateCb = fn; }},
    destroy(fn) {{ {instance}.__rsx_destroyCb = fn; }},
    render() {{
      __rsx_render();
      {instance}.__rsx_triggerRender();
    }},
    get props() {{ return {instance}.__rsx_currentProps; }}
  }};
  function {setup}() {{}}
  if (!{instance}.__rsx_initialized) {{
    {instance}.__rsx_initialized = true;
    {setup}.call(this, {setup_args});
    __rsx_render();
  }} else if ({instance}.__rsx_prevProps !== {instance}.__rsx_currentProps) {{
    if ({instance}.__rsx_updateCb) {{
      {instance}.__rsx_updateCb({instance}.__rsx_prevProps, {instance}.__rsx_currentProps);
    }}
    __rsx_render();
  }}
  return {instance}.__rsx_viewResult ?? null;
}}
"#,
        host = host,
        params = params,
        setup_args = setup_args,
        slots = slots,
        instance = INSTANCE,
        instance_ref = INSTANCE_REF,
        setup = SETUP,
    )
}

/// Template nodes carry offsets into the template text, not the user's file.
struct SpanEraser;

impl<'a> VisitMut<'a> for SpanEraser {
    fn visit_span(&mut self, span: &mut Span) {
        *span = SPAN;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BODY PREPARATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Drops `return` statements at the top level of the component body.
/// The generated component returns the view result instead.
pub fn discard_returns<'a>(stmts: &mut ArenaVec<'a, Statement<'a>>, ctx: &mut CompileContext<'_>) {
    let mut discarded = Vec::new();
    stmts.retain(|stmt| match stmt {
        Statement::ReturnStatement(ret) => {
            discarded.push((ret.span, ret.argument.is_some()));
            false
        }
        _ => true,
    });
    for (span, has_value) in discarded {
        if has_value {
            ctx.warn(
                RSX_RETURN_DISCARDED,
                "[RSX] Top-level return value is ignored. Register markup with view(() => ...).",
                span,
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Rebuilds `component` around its (already promoted and rewritten) body and
/// returns the host import statement for the caller to place in the module.
/// `seeds` are the creation-time initializers, already rewritten to read
/// through the instance ref.
pub fn emit<'a>(
    allocator: &'a Allocator,
    component: ComponentFn<'_, 'a>,
    promotion: &Promotion,
    seeds: Vec<CreationSeed<'a>>,
    options: &CompileOptions,
    ctx: &CompileContext<'_>,
) -> Result<Statement<'a>, CompilerError> {
    let forward_args = forwards_extra_args(component.params());
    let text: &'a str =
        allocator.alloc_str(&template_source(promotion, &options.host_module, forward_args));
    let source_type = SourceType::default()
        .with_module(true)
        .with_jsx(true)
        .with_typescript(true);
    let ret = Parser::new(allocator, text, source_type).parse();
    if let Some(err) = ret.errors.first() {
        return Err(internal_error(ctx, &format!("generated component failed to parse: {}", err)));
    }
    let mut program = ret.program;
    SpanEraser.visit_program(&mut program);

    let mut body = program.body.into_iter();
    let (Some(import), Some(Statement::FunctionDeclaration(mut generated))) =
        (body.next(), body.next())
    else {
        return Err(internal_error(ctx, "generated component has an unexpected shape"));
    };
    let generated: &mut Function<'a> = &mut generated;
    if seed_record(generated, seeds, &AstBuilder::new(allocator)).is_none() {
        return Err(internal_error(ctx, "generated component has no storage record"));
    }

    match component {
        ComponentFn::Function(user) => {
            let Some(setup) = find_setup(generated) else {
                return Err(internal_error(
                    ctx,
                    "generated component is missing its setup function",
                ));
            };
            std::mem::swap(&mut setup.params, &mut user.params);
            std::mem::swap(&mut setup.body, &mut user.body);
            setup.r#async = std::mem::replace(&mut user.r#async, false);
            setup.generator = std::mem::replace(&mut user.generator, false);

            std::mem::swap(&mut user.params, &mut generated.params);
            std::mem::swap(&mut user.body, &mut generated.body);
        }
        ComponentFn::Arrow(user) => {
            let Some(setup) = find_setup(generated) else {
                return Err(internal_error(
                    ctx,
                    "generated component is missing its setup function",
                ));
            };
            let Some(setup_body) = setup.body.as_mut() else {
                return Err(internal_error(ctx, "generated setup function has no body"));
            };
            std::mem::swap(setup_body, &mut user.body);
            std::mem::swap(&mut setup.params, &mut user.params);
            setup.r#async = std::mem::replace(&mut user.r#async, false);

            let Some(generated_body) = generated.body.as_mut() else {
                return Err(internal_error(ctx, "generated component has no body"));
            };
            std::mem::swap(generated_body, &mut user.body);
            std::mem::swap(&mut generated.params, &mut user.params);
            user.expression = false;
        }
    }

    Ok(import)
}

/// Places creation-time initializers: `Record` seeds become slot values in the
/// record literal, `Creation` seeds are assigned right after it, in order.
fn seed_record<'a>(
    generated: &mut Function<'a>,
    seeds: Vec<CreationSeed<'a>>,
    ast: &AstBuilder<'a>,
) -> Option<()> {
    if seeds.is_empty() {
        return Some(());
    }
    let block = generated
        .body
        .as_mut()?
        .statements
        .iter_mut()
        .find_map(|stmt| match stmt {
            Statement::IfStatement(guard) => match &mut guard.consequent {
                Statement::BlockStatement(block) => Some(block),
                _ => None,
            },
            _ => None,
        })?;
    let Some(Statement::ExpressionStatement(creation)) = block.body.first_mut() else {
        return None;
    };
    let Expression::AssignmentExpression(assign) = &mut creation.expression else {
        return None;
    };
    let Expression::ObjectExpression(record) = &mut assign.right else {
        return None;
    };

    let mut assignments = Vec::new();
    for seed in seeds {
        if seed.seeding == Seeding::Record {
            let slot = record.properties.iter_mut().find_map(|prop| match prop {
                ObjectPropertyKind::ObjectProperty(p)
                    if matches!(
                        &p.key,
                        PropertyKey::StaticIdentifier(key) if key.name == seed.name.as_str()
                    ) =>
                {
                    Some(p)
                }
                _ => None,
            })?;
            slot.value = seed.init;
        } else {
            let member = record_member(ast, RecordAccess::Ref, &seed.name);
            let target = AssignmentTarget::from(SimpleAssignmentTarget::from(member));
            assignments.push(ast.statement_expression(
                SPAN,
                ast.expression_assignment(SPAN, AssignmentOperator::Assign, target, seed.init),
            ));
        }
    }
    for (offset, stmt) in assignments.into_iter().enumerate() {
        block.body.insert(1 + offset, stmt);
    }
    Some(())
}

fn find_setup<'f, 'a>(generated: &'f mut Function<'a>) -> Option<&'f mut Function<'a>> {
    generated
        .body
        .as_mut()?
        .statements
        .iter_mut()
        .find_map(|stmt| match stmt {
            Statement::FunctionDeclaration(func)
                if func.id.as_ref().is_some_and(|id| id.name == SETUP) =>
            {
                Some(&mut **func)
            }
            _ => None,
        })
}

fn internal_error(ctx: &CompileContext<'_>, message: &str) -> CompilerError {
    CompilerError::with_details(
        RSX_PARSE,
        &format!("[RSX] Internal error: {}", message),
        ctx.file_path,
        0,
        0,
        None,
        vec!["This is a compiler bug. Please report it with the failing file.".to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CompilerWarning;
    use std::collections::HashSet;

    fn promotion_of(code: &str) -> Promotion {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let ctx = CompileContext::new("App.rsx", code, &options);
        let program = Parser::new(&allocator, code, SourceType::default().with_module(true))
            .parse()
            .program;
        Promotion::scan(&program.body, &HashSet::new(), &ctx).unwrap()
    }

    #[test]
    fn template_parses_cleanly() {
        let allocator = Allocator::default();
        let text = template_source(&promotion_of("let a = 1; let b;"), "react", false);
        let source_type = SourceType::default().with_module(true).with_jsx(true).with_typescript(true);
        let ret = Parser::new(&allocator, &text, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        assert_eq!(ret.program.body.len(), 2);
    }

    #[test]
    fn template_lists_slots_in_declaration_order() {
        let text = template_source(&promotion_of("let zeta = 1; let alpha = 2;"), "react", false);
        let zeta = text.find("zeta: undefined").unwrap();
        let alpha = text.find("alpha: undefined").unwrap();
        let internal = text.find("__rsx_initialized: false").unwrap();
        assert!(zeta < alpha && alpha < internal);
    }

    #[test]
    fn template_escapes_host_module() {
        let text = template_source(&Promotion::default(), "my\"host", false);
        assert!(text.contains(r#"from "my\"host";"#));
    }

    #[test]
    fn template_acquires_storage_once() {
        let text = template_source(&Promotion::default(), "react", false);
        assert_eq!(text.matches("__rsx_useRef(null)").count(), 1);
    }

    #[test]
    fn template_signature_follows_forwarded_args() {
        let plain = template_source(&Promotion::default(), "react", false);
        assert!(plain.contains("function __rsx_component(__rsx_props) {"));
        assert!(plain.contains("__rsx_setup.call(this, __rsx_ctx);"));

        let forwarding = template_source(&Promotion::default(), "react", true);
        assert!(forwarding.contains("function __rsx_component(__rsx_props, __rsx_ref, ...__rsx_rest) {"));
        assert!(forwarding.contains("__rsx_setup.call(this, __rsx_ctx, __rsx_ref, ...__rsx_rest);"));
    }

    #[test]
    fn returns_are_discarded_with_warning() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let code = "function A() { view(() => 1); return <div />; }";
        let mut ctx = CompileContext::new("App.rsx", code, &options);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut program = Parser::new(&allocator, code, source_type).parse().program;
        let Statement::FunctionDeclaration(func) = &mut program.body[0] else {
            panic!("expected function");
        };
        let stmts = &mut func.body.as_mut().unwrap().statements;
        discard_returns(stmts, &mut ctx);
        assert_eq!(stmts.len(), 1);
        let warnings: &[CompilerWarning] = &ctx.warnings;
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, RSX_RETURN_DISCARDED);
    }
}
