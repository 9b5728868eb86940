use crate::context::CompileContext;
use crate::diagnostics::{
    CompilerError, RSX_PROPS_MUTATION, RSX_PROP_DERIVED_STATE, RSX_SHORTHAND_WRITE,
};
use crate::promote::Promotion;
use crate::scope::{member_path, PropsBinding};
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::Span;

// ═══════════════════════════════════════════════════════════════════════════════
// MUTATION & DIAGNOSTICS GUARD
// Runs on the component body before promotion rewrites it.
// ═══════════════════════════════════════════════════════════════════════════════

pub fn check_body(
    stmts: &[Statement<'_>],
    binding: &PropsBinding,
    promotion: &Promotion,
    ctx: &mut CompileContext<'_>,
) -> Result<(), CompilerError> {
    let mut guard = MutationGuard {
        binding,
        promotion,
        fatal: None,
        warnings: Vec::new(),
    };

    for stmt in stmts {
        if let Statement::VariableDeclaration(decl) = stmt {
            for d in &decl.declarations {
                let (BindingPattern::BindingIdentifier(id), Some(init)) = (&d.id, &d.init) else {
                    continue;
                };
                if promotion.contains(&id.name) && binding.is_referenced_in(init) {
                    guard.warnings.push((id.name.to_string(), d.span));
                }
            }
        }
        guard.visit_statement(stmt);
        if guard.fatal.is_some() {
            break;
        }
    }

    if let Some(fatal) = guard.fatal {
        return Err(fatal.into_error(ctx));
    }
    for (name, span) in guard.warnings {
        ctx.warn(
            RSX_PROP_DERIVED_STATE,
            &format!(
                "[RSX] Warning: assigning instance state from props (`{}`). The value is \
                 captured once and goes stale when props change. Move this logic into \
                 update() or into setup code that runs on init.",
                name
            ),
            span,
        );
    }
    Ok(())
}

enum Fatal {
    PropsWrite { target: String, field: String, span: Span },
    ShorthandWrite { name: String, span: Span },
}

impl Fatal {
    fn into_error(self, ctx: &CompileContext<'_>) -> CompilerError {
        match self {
            Fatal::PropsWrite { target, field, span } => ctx.error(
                RSX_PROPS_MUTATION,
                &format!(
                    "[RSX] Props are immutable. Cannot assign to `{}` (field `{}`).",
                    target, field
                ),
                span,
                vec![
                    "React to new props with update((prev, next) => ...).".to_string(),
                    "Copy the value into a local variable if it needs to change.".to_string(),
                ],
            ),
            Fatal::ShorthandWrite { name, span } => ctx.error(
                RSX_SHORTHAND_WRITE,
                &format!(
                    "[RSX] Shorthand destructuring cannot write to instance state `{}`.",
                    name
                ),
                span,
                vec![format!("Write it as `({{ {0}: {0} }} = ...)` instead.", name)],
            ),
        }
    }
}

struct MutationGuard<'g> {
    binding: &'g PropsBinding,
    promotion: &'g Promotion,
    fatal: Option<Fatal>,
    warnings: Vec<(String, Span)>,
}

impl<'g> MutationGuard<'g> {
    fn check_member_write(&mut self, object: &Expression<'_>, property: String, span: Span) {
        if self.fatal.is_some() {
            return;
        }
        let Some(mut path) = member_path(object) else {
            return;
        };
        path.push(property);
        if let Some(field) = self.binding.props_field(&path) {
            self.fatal = Some(Fatal::PropsWrite {
                target: path.join("."),
                field,
                span,
            });
        }
    }
}

impl<'g, 'a> Visit<'a> for MutationGuard<'g> {
    fn visit_simple_assignment_target(&mut self, target: &SimpleAssignmentTarget<'a>) {
        match target {
            SimpleAssignmentTarget::StaticMemberExpression(member) => {
                let property = member.property.name.to_string();
                self.check_member_write(&member.object, property, member.span);
            }
            SimpleAssignmentTarget::ComputedMemberExpression(member) => {
                let property = match &member.expression {
                    Expression::StringLiteral(s) => s.value.to_string(),
                    _ => "[]".to_string(),
                };
                self.check_member_write(&member.object, property, member.span);
            }
            _ => {}
        }
        oxc_ast_visit::walk::walk_simple_assignment_target(self, target);
    }

    fn visit_assignment_expression(&mut self, expr: &AssignmentExpression<'a>) {
        if let AssignmentTarget::AssignmentTargetIdentifier(id) = &expr.left {
            if self.promotion.contains(&id.name) && self.binding.is_referenced_in(&expr.right) {
                self.warnings.push((id.name.to_string(), expr.span));
            }
        }
        oxc_ast_visit::walk::walk_assignment_expression(self, expr);
    }

    fn visit_assignment_target_property_identifier(
        &mut self,
        prop: &AssignmentTargetPropertyIdentifier<'a>,
    ) {
        if self.fatal.is_none() && self.promotion.contains(&prop.binding.name) {
            self.fatal = Some(Fatal::ShorthandWrite {
                name: prop.binding.name.to_string(),
                span: prop.span,
            });
        }
        oxc_ast_visit::walk::walk_assignment_target_property_identifier(self, prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::diagnostics::CompilerWarning;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;
    use std::collections::HashSet;

    fn guard(code: &str) -> Result<Vec<CompilerWarning>, CompilerError> {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let mut ctx = CompileContext::new("App.rsx", code, &options);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let program = Parser::new(&allocator, code, source_type).parse().program;
        let Statement::FunctionDeclaration(func) = &program.body[0] else {
            panic!("expected function");
        };
        let mut binding = PropsBinding::from_params(&func.params);
        let stmts = &func.body.as_ref().unwrap().statements;
        binding.add_body_aliases(stmts);
        let promotion = Promotion::scan(stmts, &HashSet::new(), &ctx)?;
        check_body(stmts, &binding, &promotion, &mut ctx)?;
        Ok(ctx.warnings)
    }

    #[test]
    fn writing_props_field_is_fatal() {
        let err = guard("function A({ props }) {\n  props.count = 1;\n}").unwrap_err();
        assert_eq!(err.code, RSX_PROPS_MUTATION);
        assert!(err.message.contains("Props are immutable"));
        assert!(err.message.contains("count"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn nested_and_update_writes_are_fatal() {
        assert!(guard("function A({ props }) { props.a.b = 1; }").is_err());
        assert!(guard("function A({ props }) { props.n++; }").is_err());
        assert!(guard("function A({ props }) { [props.a] = [1]; }").is_err());
        assert!(guard("function A({ props }) { view(() => { props.x += 1; }); }").is_err());
    }

    #[test]
    fn context_props_write_is_fatal() {
        let err = guard("function A(ctx) { ctx.props.title = 'x'; }").unwrap_err();
        assert!(err.message.contains("ctx.props.title"));
    }

    #[test]
    fn bare_props_write_is_fatal_with_context_param() {
        let err = guard("function A(ctx) {\n  props.title = 'x';\n}").unwrap_err();
        assert_eq!(err.code, RSX_PROPS_MUTATION);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn props_destructured_from_context_in_body_is_guarded() {
        let err = guard("function A(ctx) {\n  const { props } = ctx;\n  props.title = 'x';\n}").unwrap_err();
        assert_eq!(err.code, RSX_PROPS_MUTATION);
        assert_eq!(err.line, 3);
        assert!(guard("function A(ctx) { const { props: p } = ctx; p.title = 'x'; }").is_err());
    }

    #[test]
    fn props_alias_bound_in_body_is_guarded() {
        assert!(guard("function A(ctx) { const p = ctx.props; p.title = 'x'; }").is_err());
        assert!(guard("function A({ props }) { const p = props; p.a.b = 1; }").is_err());
    }

    #[test]
    fn renamed_props_write_is_fatal() {
        assert!(guard("function A({ props: p }) { p.title = 'x'; }").is_err());
    }

    #[test]
    fn reading_props_is_allowed() {
        assert!(guard("function A({ props }) { const t = () => props.title; }").is_ok());
    }

    #[test]
    fn other_member_writes_are_allowed() {
        assert!(guard("function A({ props }) { const o = {}; o.props = 1; window.x = props.y; }").is_ok());
    }

    #[test]
    fn initializer_from_props_warns() {
        let warnings = guard("function A({ props }) {\n  let title = props.title;\n}").unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, RSX_PROP_DERIVED_STATE);
        assert_eq!(warnings[0].line, 2);
        assert!(warnings[0].message.contains("title"));
    }

    #[test]
    fn assignment_from_props_warns() {
        let warnings =
            guard("function A({ props }) { let n = 0; update(() => { n = props.n * 2; }); }").unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn assignment_to_non_promoted_local_does_not_warn() {
        let warnings = guard("function A({ props }) { update(() => { let m; m = props.n; }); }").unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn shorthand_write_to_promoted_is_rejected() {
        let err = guard("function A() { let a = 0; ({ a } = source); }").unwrap_err();
        assert_eq!(err.code, RSX_SHORTHAND_WRITE);
    }
}
