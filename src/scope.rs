use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

lazy_static::lazy_static! {
    /// Members of the lifecycle context. Never promoted and never rewritten.
    pub static ref LIFECYCLE_NAMES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("view");
        s.insert("update");
        s.insert("destroy");
        s.insert("render");
        s.insert("props");
        s
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn collect_binding_names(pattern: &BindingPattern<'_>, names: &mut HashSet<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            names.insert(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, names);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for p in arr.elements.iter().flatten() {
                collect_binding_names(p, names);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, names);
            }
        }
        BindingPattern::AssignmentPattern(assign) => {
            collect_binding_names(&assign.left, names);
        }
    }
}

/// Collects every binding introduced by a parameter list, rest element included.
pub struct BindingCollector<'s> {
    pub symbols: &'s mut HashSet<String>,
}

impl<'s, 'b> Visit<'b> for BindingCollector<'s> {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'b>) {
        self.symbols.insert(ident.name.to_string());
    }

    // Default values may contain functions; their bindings are not ours.
    fn visit_function(&mut self, _func: &Function<'b>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _func: &ArrowFunctionExpression<'b>) {}

    fn visit_class(&mut self, _class: &Class<'b>) {}
}

pub fn param_names(params: &FormalParameters<'_>) -> HashSet<String> {
    let mut symbols = HashSet::new();
    BindingCollector {
        symbols: &mut symbols,
    }
    .visit_formal_parameters(params);
    symbols
}

/// `var` declarations anywhere in a function body, without entering nested functions.
struct VarHoistCollector<'s> {
    symbols: &'s mut HashSet<String>,
}

impl<'s, 'b> Visit<'b> for VarHoistCollector<'s> {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'b>) {
        if decl.kind == VariableDeclarationKind::Var {
            for d in &decl.declarations {
                collect_binding_names(&d.id, self.symbols);
            }
        }
        oxc_ast_visit::walk::walk_variable_declaration(self, decl);
    }

    fn visit_function(&mut self, _func: &Function<'b>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _func: &ArrowFunctionExpression<'b>) {}

    fn visit_class(&mut self, _class: &Class<'b>) {}
}

/// Names a statement list declares for its own scope: direct declarations
/// plus function-scoped `var`s hoisted out of nested blocks.
pub fn declared_names(stmts: &[Statement<'_>]) -> HashSet<String> {
    let mut names = HashSet::new();
    for stmt in stmts {
        match stmt {
            Statement::VariableDeclaration(decl) => {
                for d in &decl.declarations {
                    collect_binding_names(&d.id, &mut names);
                }
            }
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    names.insert(id.name.to_string());
                }
            }
            Statement::ClassDeclaration(class) => {
                if let Some(id) = &class.id {
                    names.insert(id.name.to_string());
                }
            }
            _ => {}
        }
    }
    let mut hoist = VarHoistCollector {
        symbols: &mut names,
    };
    for stmt in stmts {
        hoist.visit_statement(stmt);
    }
    names
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPS BINDING
// ═══════════════════════════════════════════════════════════════════════════════

/// How the component's parameters and body expose the props snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropsBinding {
    /// Local names bound directly to props. Always holds `props`, plus
    /// aliases such as `p` in `({ props: p })` or `const p = ctx.props;`.
    pub direct: Vec<String>,
    /// Name bound to the whole lifecycle context, e.g. `ctx` in `(ctx)`, read as `ctx.props`.
    pub context: Option<String>,
}

impl PropsBinding {
    pub fn from_params(params: &FormalParameters<'_>) -> Self {
        let mut binding = PropsBinding {
            direct: vec!["props".to_string()],
            context: None,
        };
        if let Some(first) = params.items.first() {
            binding.bind_pattern(&first.pattern);
        }
        binding
    }

    fn bind_pattern(&mut self, pattern: &BindingPattern<'_>) {
        match pattern {
            BindingPattern::BindingIdentifier(id) => self.context = Some(id.name.to_string()),
            BindingPattern::ObjectPattern(obj) => self.bind_props_key(obj),
            BindingPattern::AssignmentPattern(assign) => self.bind_pattern(&assign.left),
            BindingPattern::ArrayPattern(_) => {}
        }
    }

    /// `{ props }` or `{ props: p }` inside an object pattern.
    fn bind_props_key(&mut self, obj: &ObjectPattern<'_>) {
        let Some(prop) = obj
            .properties
            .iter()
            .find(|p| matches!(&p.key, PropertyKey::StaticIdentifier(key) if key.name == "props"))
        else {
            return;
        };
        let local = match &prop.value {
            BindingPattern::BindingIdentifier(id) => Some(&id.name),
            BindingPattern::AssignmentPattern(assign) => match &assign.left {
                BindingPattern::BindingIdentifier(id) => Some(&id.name),
                _ => None,
            },
            // `{ props: { a } }` leaves nothing to write through.
            _ => None,
        };
        if let Some(name) = local {
            self.add_direct(name.as_str());
        }
    }

    fn add_direct(&mut self, name: &str) {
        if !self.direct.iter().any(|d| d == name) {
            self.direct.push(name.to_string());
        }
    }

    fn is_direct(&self, name: &str) -> bool {
        self.direct.iter().any(|d| d == name)
    }

    fn is_props_root(&self, expr: &Expression<'_>) -> bool {
        match member_path(expr) {
            Some(path) if path.len() == 1 => self.is_direct(&path[0]),
            Some(path) if path.len() == 2 => {
                self.context.as_deref() == Some(path[0].as_str()) && path[1] == "props"
            }
            _ => false,
        }
    }

    /// Records props aliases declared at the top level of the component body:
    /// `const { props } = ctx;`, `const { props: p } = ctx;`, `const p = ctx.props;`.
    pub fn add_body_aliases(&mut self, stmts: &[Statement<'_>]) {
        for stmt in stmts {
            let Statement::VariableDeclaration(decl) = stmt else {
                continue;
            };
            for d in &decl.declarations {
                let Some(init) = &d.init else {
                    continue;
                };
                match &d.id {
                    BindingPattern::ObjectPattern(obj) => {
                        let is_context = matches!(
                            member_path(init).as_deref(),
                            Some([root]) if self.context.as_deref() == Some(root.as_str())
                        );
                        if is_context {
                            self.bind_props_key(obj);
                        }
                    }
                    BindingPattern::BindingIdentifier(id) if self.is_props_root(init) => {
                        self.add_direct(id.name.as_str());
                    }
                    _ => {}
                }
            }
        }
    }

    /// For a member access path like `["props", "a", "b"]`, the props field it
    /// touches, or `None` when the path is not rooted at props.
    pub fn props_field(&self, path: &[String]) -> Option<String> {
        let root = path.first()?;
        if self.is_direct(root) {
            return path.get(1).cloned();
        }
        if self.context.as_deref() == Some(root.as_str())
            && path.get(1).map(String::as_str) == Some("props")
        {
            return Some(path.get(2).cloned().unwrap_or_else(|| "props".to_string()));
        }
        None
    }

    pub fn is_referenced_in(&self, expr: &Expression<'_>) -> bool {
        let mut finder = PropsReferenceFinder {
            binding: self,
            found: false,
        };
        finder.visit_expression(expr);
        finder.found
    }
}

/// Identifiers an expression reads or writes, at any depth, and whether it
/// needs the enclosing function's own context (`this`, `arguments`, `await`...).
#[derive(Debug, Default)]
pub struct ExpressionReferences {
    pub names: Vec<String>,
    pub uses_function_context: bool,
}

impl ExpressionReferences {
    pub fn of(expr: &Expression<'_>) -> Self {
        let mut refs = ExpressionReferences::default();
        refs.visit_expression(expr);
        refs
    }
}

impl<'a> Visit<'a> for ExpressionReferences {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if ident.name == "arguments" {
            self.uses_function_context = true;
        }
        self.names.push(ident.name.to_string());
    }

    fn visit_this_expression(&mut self, _expr: &ThisExpression) {
        self.uses_function_context = true;
    }

    fn visit_super(&mut self, _expr: &Super) {
        self.uses_function_context = true;
    }

    fn visit_meta_property(&mut self, _meta: &MetaProperty<'a>) {
        self.uses_function_context = true;
    }

    fn visit_await_expression(&mut self, expr: &AwaitExpression<'a>) {
        self.uses_function_context = true;
        oxc_ast_visit::walk::walk_await_expression(self, expr);
    }

    fn visit_yield_expression(&mut self, expr: &YieldExpression<'a>) {
        self.uses_function_context = true;
        oxc_ast_visit::walk::walk_yield_expression(self, expr);
    }
}

/// Root-first path of a member chain: `a.b[c].d` gives `["a", "b", "[]", "d"]`.
pub fn member_path(expr: &Expression<'_>) -> Option<Vec<String>> {
    match expr {
        Expression::Identifier(id) => Some(vec![id.name.to_string()]),
        Expression::StaticMemberExpression(member) => {
            let mut path = member_path(&member.object)?;
            path.push(member.property.name.to_string());
            Some(path)
        }
        Expression::ComputedMemberExpression(member) => {
            let mut path = member_path(&member.object)?;
            path.push(match &member.expression {
                Expression::StringLiteral(s) => s.value.to_string(),
                _ => "[]".to_string(),
            });
            Some(path)
        }
        Expression::ParenthesizedExpression(paren) => member_path(&paren.expression),
        Expression::TSNonNullExpression(nn) => member_path(&nn.expression),
        _ => None,
    }
}

struct PropsReferenceFinder<'b> {
    binding: &'b PropsBinding,
    found: bool,
}

impl<'b, 'a> Visit<'a> for PropsReferenceFinder<'b> {
    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        if self.binding.is_direct(ident.name.as_str()) {
            self.found = true;
        }
    }

    fn visit_static_member_expression(&mut self, member: &StaticMemberExpression<'a>) {
        if let (Some(ctx), Expression::Identifier(object)) =
            (&self.binding.context, &member.object)
        {
            if object.name == ctx.as_str() && member.property.name == "props" {
                self.found = true;
            }
        }
        oxc_ast_visit::walk::walk_static_member_expression(self, member);
    }
}
