//! Variable promotion.
//!
//! Every single-identifier `var`/`let`/`const` declared directly in the
//! component body becomes a slot on the instance record. Initializers run
//! once per instance, in declaration order:
//!
//! - while the body opens with declarations whose initializers only read
//!   module scope or earlier slots, those initializers move into the record
//!   as it is created;
//! - from the first initializer that needs setup-scoped bindings (lifecycle
//!   parameters, props, helpers declared in the body) or the first other
//!   statement on, declarations are replaced in place by a seeding
//!   assignment inside setup code.

use crate::context::CompileContext;
use crate::diagnostics::{CompilerError, RSX_RESERVED_IDENTIFIER};
use crate::rewrite::instance_member;
use crate::scope::{declared_names, ExpressionReferences, LIFECYCLE_NAMES};
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_span::{GetSpan, Span, SPAN};
use std::collections::HashSet;

/// Where a promoted variable's initializer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seeding {
    /// `let x;`
    Unset,
    /// Value of the slot in the record literal.
    Record,
    /// Assigned right after the record literal, when the instance is created.
    Creation,
    /// Assigned at the declaration's position inside setup code.
    Setup,
}

impl Seeding {
    pub fn at_creation(self) -> bool {
        matches!(self, Seeding::Record | Seeding::Creation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotedVariable {
    pub name: String,
    /// Span of the declarator.
    pub span: Span,
    /// Span of the initializer, `None` for `let x;`.
    pub initializer: Option<Span>,
    pub seeding: Seeding,
}

/// An initializer taken out of the body to run when the record is created.
pub struct CreationSeed<'a> {
    pub name: String,
    pub seeding: Seeding,
    pub init: Expression<'a>,
}

#[derive(Debug, Clone, Default)]
pub struct Promotion {
    pub variables: Vec<PromotedVariable>,
    names: HashSet<String>,
}

fn is_promotable_kind(kind: VariableDeclarationKind) -> bool {
    matches!(
        kind,
        VariableDeclarationKind::Var | VariableDeclarationKind::Let | VariableDeclarationKind::Const
    )
}

/// Statements that evaluate nothing when reached.
fn is_inert(stmt: &Statement<'_>) -> bool {
    matches!(
        stmt,
        Statement::FunctionDeclaration(_)
            | Statement::EmptyStatement(_)
            | Statement::TSTypeAliasDeclaration(_)
            | Statement::TSInterfaceDeclaration(_)
    )
}

impl Promotion {
    /// Collects promotable declarations from the top level of `stmts`.
    /// Names in `excluded` (parameter bindings) stay ordinary locals.
    pub fn scan(
        stmts: &[Statement<'_>],
        excluded: &HashSet<String>,
        ctx: &CompileContext<'_>,
    ) -> Result<Self, CompilerError> {
        let mut setup_scoped = declared_names(stmts);
        setup_scoped.extend(excluded.iter().cloned());
        setup_scoped.extend(LIFECYCLE_NAMES.iter().map(|name| name.to_string()));

        let mut promotion = Promotion::default();
        let mut leading = true;
        for stmt in stmts {
            let decl = match stmt {
                Statement::VariableDeclaration(decl) if is_promotable_kind(decl.kind) => decl,
                other => {
                    leading &= is_inert(other);
                    continue;
                }
            };
            for d in &decl.declarations {
                let BindingPattern::BindingIdentifier(id) = &d.id else {
                    leading = false;
                    continue;
                };
                let name = id.name.as_str();
                if excluded.contains(name) || LIFECYCLE_NAMES.contains(name) {
                    leading = false;
                    continue;
                }
                if name == "__proto__" {
                    return Err(ctx.error(
                        RSX_RESERVED_IDENTIFIER,
                        "`__proto__` cannot be used as instance state.",
                        id.span,
                        vec!["Pick another name for this variable.".to_string()],
                    ));
                }
                if promotion.names.contains(name) {
                    // `var` redeclaration: assigned in place.
                    leading &= d.init.is_none();
                    continue;
                }
                let seeding = match &d.init {
                    None => Seeding::Unset,
                    Some(init) if leading => promotion.creation_seeding(init, &setup_scoped),
                    Some(_) => Seeding::Setup,
                };
                leading &= seeding != Seeding::Setup;
                promotion.names.insert(name.to_string());
                promotion.variables.push(PromotedVariable {
                    name: name.to_string(),
                    span: d.span,
                    initializer: d.init.as_ref().map(|init| init.span()),
                    seeding,
                });
            }
        }
        Ok(promotion)
    }

    /// `Record` or `Creation` when `init` can run before setup, otherwise `Setup`.
    fn creation_seeding(&self, init: &Expression<'_>, setup_scoped: &HashSet<String>) -> Seeding {
        let refs = ExpressionReferences::of(init);
        if refs.uses_function_context {
            return Seeding::Setup;
        }
        let mut reads_slots = false;
        for name in &refs.names {
            if self.names.contains(name) {
                reads_slots = true;
            } else if setup_scoped.contains(name) {
                return Seeding::Setup;
            }
        }
        let after_creation_seed = self.variables.iter().any(|v| v.seeding == Seeding::Creation);
        if reads_slots || after_creation_seed {
            Seeding::Creation
        } else {
            Seeding::Record
        }
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> &HashSet<String> {
        &self.names
    }

    fn seeding_of(&self, name: &str) -> Seeding {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.seeding)
            .unwrap_or(Seeding::Setup)
    }

    /// Removes promoted declarators from `stmts`. Setup-seeded ones become
    /// `__rsx_instance.<name> = <init>;` in place; creation-time initializers
    /// are returned in declaration order. Destructuring declarators in the same
    /// statement keep their relative order.
    pub fn apply<'a>(
        &self,
        stmts: &mut ArenaVec<'a, Statement<'a>>,
        ast: &AstBuilder<'a>,
    ) -> Vec<CreationSeed<'a>> {
        let mut seeds = Vec::new();
        if self.is_empty() {
            return seeds;
        }
        let mut seen: HashSet<String> = HashSet::new();
        let old = std::mem::replace(stmts, ast.vec());
        for stmt in old.into_iter() {
            let mut decl = match stmt {
                Statement::VariableDeclaration(decl) => decl,
                other => {
                    stmts.push(other);
                    continue;
                }
            };
            if !is_promotable_kind(decl.kind)
                || !decl.declarations.iter().any(|d| self.is_promoted(d))
            {
                stmts.push(Statement::VariableDeclaration(decl));
                continue;
            }

            let kind = decl.kind;
            let mut kept = ast.vec();
            for d in std::mem::replace(&mut decl.declarations, ast.vec()).into_iter() {
                if !self.is_promoted(&d) {
                    kept.push(d);
                    continue;
                }
                let name = match &d.id {
                    BindingPattern::BindingIdentifier(id) => id.name.to_string(),
                    _ => continue,
                };
                let first = seen.insert(name.clone());
                let span = d.span;
                let Some(init) = d.init else {
                    continue;
                };
                let seeding = if first { self.seeding_of(&name) } else { Seeding::Setup };
                if seeding.at_creation() {
                    seeds.push(CreationSeed { name, seeding, init });
                    continue;
                }
                if !kept.is_empty() {
                    let pending = std::mem::replace(&mut kept, ast.vec());
                    stmts.push(Statement::VariableDeclaration(
                        ast.alloc_variable_declaration(SPAN, kind, pending, false),
                    ));
                }
                let target = SimpleAssignmentTarget::from(instance_member(ast, &name));
                stmts.push(ast.statement_expression(
                    span,
                    ast.expression_assignment(
                        span,
                        AssignmentOperator::Assign,
                        AssignmentTarget::from(target),
                        init,
                    ),
                ));
            }
            if !kept.is_empty() {
                stmts.push(Statement::VariableDeclaration(
                    ast.alloc_variable_declaration(SPAN, kind, kept, false),
                ));
            }
        }
        seeds
    }

    fn is_promoted(&self, d: &VariableDeclarator<'_>) -> bool {
        match &d.id {
            BindingPattern::BindingIdentifier(id) => self.names.contains(id.name.as_str()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use oxc_allocator::Allocator;
    use oxc_codegen::Codegen;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    struct Promoted {
        names: Vec<String>,
        seedings: Vec<Seeding>,
        /// `(name, seeding)` of initializers taken out for creation time.
        seeds: Vec<(String, Seeding)>,
        code: String,
    }

    fn promote(code: &str, excluded: &[&str]) -> Promoted {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let ctx = CompileContext::new("App.rsx", code, &options);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut program = Parser::new(&allocator, code, source_type).parse().program;
        let excluded: HashSet<String> = excluded.iter().map(|s| s.to_string()).collect();
        let promotion = Promotion::scan(&program.body, &excluded, &ctx).unwrap();
        let ast = AstBuilder::new(&allocator);
        let seeds = promotion.apply(&mut program.body, &ast);
        Promoted {
            names: promotion.variables.iter().map(|v| v.name.clone()).collect(),
            seedings: promotion.variables.iter().map(|v| v.seeding).collect(),
            seeds: seeds.into_iter().map(|s| (s.name, s.seeding)).collect(),
            code: Codegen::new().build(&program).code,
        }
    }

    #[test]
    fn identifiers_are_promoted_in_declaration_order() {
        let p = promote("let b = 2;\nconst a = 1;\nvar c;", &[]);
        assert_eq!(p.names, vec!["b", "a", "c"]);
        assert_eq!(p.seedings, vec![Seeding::Record, Seeding::Record, Seeding::Unset]);
        assert_eq!(
            p.seeds,
            vec![("b".to_string(), Seeding::Record), ("a".to_string(), Seeding::Record)]
        );
        assert!(!p.code.contains("let b"));
        assert!(!p.code.contains("var c"));
    }

    #[test]
    fn initializers_reading_earlier_slots_run_after_the_record() {
        let p = promote("let a = 1;\nlet b = a + 1;\nlet c = 3;", &[]);
        assert_eq!(p.seedings, vec![Seeding::Record, Seeding::Creation, Seeding::Creation]);
        assert!(p.code.trim().is_empty());
    }

    #[test]
    fn setup_scoped_reads_are_seeded_in_place() {
        let p = promote(
            "let a = 1;\nlet title = props.title;\nlet b = 2;\nfunction helper() {}\nlet h = helper;",
            &[],
        );
        assert_eq!(
            p.seedings,
            vec![Seeding::Record, Seeding::Setup, Seeding::Setup, Seeding::Setup]
        );
        let title = p.code.find("__rsx_instance.title = props.title").unwrap();
        let b = p.code.find("__rsx_instance.b = 2").unwrap();
        assert!(title < b);
        assert!(p.code.contains("__rsx_instance.h = helper"));
    }

    #[test]
    fn parameter_and_context_reads_stay_in_setup() {
        let p = promote("let v = view;\nlet c = ctx.x;\nlet t = this.x;", &["ctx"]);
        assert_eq!(p.seedings, vec![Seeding::Setup, Seeding::Setup, Seeding::Setup]);
        let p = promote("let t = this.x;", &[]);
        assert_eq!(p.seedings, vec![Seeding::Setup]);
    }

    #[test]
    fn statements_between_declarations_end_creation_seeding() {
        let p = promote("let a = 1;\na += 1;\nlet b = a;", &[]);
        assert_eq!(p.seedings, vec![Seeding::Record, Seeding::Setup]);
        assert!(p.code.contains("__rsx_instance.b = a"));
    }

    #[test]
    fn destructuring_is_left_in_place() {
        let p = promote("const { x, y } = point;\nlet [first] = list;", &[]);
        assert!(p.names.is_empty());
        assert!(p.code.contains("const { x, y } = point"));
        assert!(p.code.contains("let [first] = list"));
    }

    #[test]
    fn mixed_declaration_keeps_order() {
        let p = promote("let a = 1, { b } = o, c = 3;", &[]);
        assert_eq!(p.names, vec!["a", "c"]);
        assert_eq!(p.seedings, vec![Seeding::Record, Seeding::Setup]);
        let b = p.code.find("let { b } = o").unwrap();
        let c = p.code.find("__rsx_instance.c = 3").unwrap();
        assert!(b < c);
    }

    #[test]
    fn var_redeclaration_assigns_in_place() {
        let p = promote("var a = 1;\nvar a = 2;", &[]);
        assert_eq!(p.names, vec!["a"]);
        assert_eq!(p.seeds.len(), 1);
        assert!(p.code.contains("__rsx_instance.a = 2"));
    }

    #[test]
    fn nested_declarations_are_not_promoted() {
        let p = promote("if (x) { let inner = 1; }\nfunction f() { let local = 2; }", &[]);
        assert!(p.names.is_empty());
    }

    #[test]
    fn lifecycle_and_parameter_names_are_not_promoted() {
        let p = promote("let props = 1;\nvar ctx = 2;\nlet kept = 3;", &["ctx"]);
        assert_eq!(p.names, vec!["kept"]);
        assert!(p.code.contains("let props = 1"));
    }

    #[test]
    fn proto_name_is_rejected() {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let code = "let __proto__ = {};";
        let ctx = CompileContext::new("App.rsx", code, &options);
        let program = Parser::new(&allocator, code, SourceType::default()).parse().program;
        let err = Promotion::scan(&program.body, &HashSet::new(), &ctx).unwrap_err();
        assert_eq!(err.code, RSX_RESERVED_IDENTIFIER);
    }
}
