//! Finds the root component of a DSL file.
//!
//! The root component is the module's default export when that export is a
//! callable, either directly or through a top-level binding.

use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentSite {
    /// `export default function ...`, `export default function (...)` or `export default (...) => ...`
    ExportDefault { statement: usize },
    /// `export default Name;` with `function Name(...)` at the top level.
    Declaration { statement: usize, name: String },
    /// `export default Name;` with `const Name = <function or arrow>` at the top level.
    Binding {
        statement: usize,
        declarator: usize,
        name: String,
    },
}

pub enum ComponentFn<'p, 'a> {
    Function(&'p mut Function<'a>),
    Arrow(&'p mut ArrowFunctionExpression<'a>),
}

impl ComponentSite {
    pub fn find(program: &Program<'_>) -> Option<Self> {
        for (index, stmt) in program.body.iter().enumerate() {
            let Statement::ExportDefaultDeclaration(export) = stmt else {
                continue;
            };
            return match &export.declaration {
                ExportDefaultDeclarationKind::FunctionDeclaration(_) => {
                    Some(ComponentSite::ExportDefault { statement: index })
                }
                kind => match kind.as_expression().map(unwrap_parens) {
                    Some(Expression::FunctionExpression(_))
                    | Some(Expression::ArrowFunctionExpression(_)) => {
                        Some(ComponentSite::ExportDefault { statement: index })
                    }
                    Some(Expression::Identifier(ident)) => find_binding(program, &ident.name),
                    _ => None,
                },
            };
        }
        None
    }

    pub fn resolve<'p, 'a>(&self, program: &'p mut Program<'a>) -> Option<ComponentFn<'p, 'a>> {
        match self {
            ComponentSite::ExportDefault { statement } => {
                let Statement::ExportDefaultDeclaration(export) = program.body.get_mut(*statement)?
                else {
                    return None;
                };
                match &mut export.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(func) => {
                        Some(ComponentFn::Function(&mut **func))
                    }
                    kind => kind.as_expression_mut().and_then(callable_mut),
                }
            }
            ComponentSite::Declaration { statement, .. } => {
                match program.body.get_mut(*statement)? {
                    Statement::FunctionDeclaration(func) => {
                        Some(ComponentFn::Function(&mut **func))
                    }
                    _ => None,
                }
            }
            ComponentSite::Binding {
                statement,
                declarator,
                ..
            } => match program.body.get_mut(*statement)? {
                Statement::VariableDeclaration(decl) => decl
                    .declarations
                    .get_mut(*declarator)?
                    .init
                    .as_mut()
                    .and_then(callable_mut),
                _ => None,
            },
        }
    }
}

fn find_binding(program: &Program<'_>, name: &str) -> Option<ComponentSite> {
    for (index, stmt) in program.body.iter().enumerate() {
        match stmt {
            Statement::FunctionDeclaration(func)
                if func.id.as_ref().is_some_and(|id| id.name == name) =>
            {
                return Some(ComponentSite::Declaration {
                    statement: index,
                    name: name.to_string(),
                });
            }
            Statement::VariableDeclaration(decl) => {
                for (d_index, d) in decl.declarations.iter().enumerate() {
                    let BindingPattern::BindingIdentifier(id) = &d.id else {
                        continue;
                    };
                    if id.name != name {
                        continue;
                    }
                    return match d.init.as_ref().map(unwrap_parens) {
                        Some(Expression::FunctionExpression(_))
                        | Some(Expression::ArrowFunctionExpression(_)) => {
                            Some(ComponentSite::Binding {
                                statement: index,
                                declarator: d_index,
                                name: name.to_string(),
                            })
                        }
                        _ => None,
                    };
                }
            }
            _ => {}
        }
    }
    None
}

fn unwrap_parens<'e, 'a>(expr: &'e Expression<'a>) -> &'e Expression<'a> {
    match expr {
        Expression::ParenthesizedExpression(paren) => unwrap_parens(&paren.expression),
        _ => expr,
    }
}

fn callable_mut<'p, 'a>(expr: &'p mut Expression<'a>) -> Option<ComponentFn<'p, 'a>> {
    match expr {
        Expression::FunctionExpression(func) => Some(ComponentFn::Function(&mut **func)),
        Expression::ArrowFunctionExpression(arrow) => Some(ComponentFn::Arrow(&mut **arrow)),
        Expression::ParenthesizedExpression(paren) => callable_mut(&mut paren.expression),
        _ => None,
    }
}

impl<'p, 'a> ComponentFn<'p, 'a> {
    pub fn params(&self) -> &FormalParameters<'a> {
        match self {
            ComponentFn::Function(func) => &func.params,
            ComponentFn::Arrow(arrow) => &arrow.params,
        }
    }

    pub fn statements_mut(&mut self) -> Option<&mut ArenaVec<'a, Statement<'a>>> {
        match self {
            ComponentFn::Function(func) => func.body.as_mut().map(|body| &mut body.statements),
            ComponentFn::Arrow(arrow) => Some(&mut arrow.body.statements),
        }
    }

    pub fn name(&self) -> String {
        match self {
            ComponentFn::Function(func) => func
                .id
                .as_ref()
                .map(|id| id.name.to_string())
                .unwrap_or_else(|| "<anonymous>".to_string()),
            ComponentFn::Arrow(_) => "<arrow>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn site_of(code: &str) -> Option<ComponentSite> {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(&allocator, code, source_type).parse();
        assert!(ret.errors.is_empty(), "{:?}", ret.errors);
        ComponentSite::find(&ret.program)
    }

    #[test]
    fn finds_default_function_declaration() {
        assert_eq!(
            site_of("import x from 'y';\nexport default function App() {}"),
            Some(ComponentSite::ExportDefault { statement: 1 })
        );
    }

    #[test]
    fn finds_default_arrow() {
        assert_eq!(
            site_of("export default (ctx) => { ctx.view(() => null); }"),
            Some(ComponentSite::ExportDefault { statement: 0 })
        );
    }

    #[test]
    fn resolves_exported_identifier_to_declaration() {
        assert_eq!(
            site_of("function Counter() {}\nexport default Counter;"),
            Some(ComponentSite::Declaration {
                statement: 0,
                name: "Counter".to_string()
            })
        );
    }

    #[test]
    fn resolves_exported_identifier_to_const_arrow() {
        assert_eq!(
            site_of("const Counter = () => {};\nexport default Counter;"),
            Some(ComponentSite::Binding {
                statement: 0,
                declarator: 0,
                name: "Counter".to_string()
            })
        );
    }

    #[test]
    fn non_callable_default_export_is_not_a_component() {
        assert_eq!(site_of("export default { a: 1 };"), None);
        assert_eq!(site_of("const value = 3;\nexport default value;"), None);
    }

    #[test]
    fn no_default_export_is_not_a_component() {
        assert_eq!(site_of("export function App() {}"), None);
    }

    #[test]
    fn resolve_yields_mutable_body() {
        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let mut program = Parser::new(&allocator, "export default function A() { let x = 1; }", source_type)
            .parse()
            .program;
        let site = ComponentSite::find(&program).unwrap();
        let mut component = site.resolve(&mut program).unwrap();
        assert_eq!(component.name(), "A");
        assert_eq!(component.statements_mut().unwrap().len(), 1);
    }
}
