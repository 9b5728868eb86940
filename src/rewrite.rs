//! Reference rewriting.
//!
//! Reads and writes of promoted locals become field accesses on the instance
//! record, at any depth of the component body. Bindings that shadow a
//! promoted name (parameters, nested declarations, catch and loop bindings)
//! are tracked on a scope stack and left alone inside their scope.

use crate::diagnostics::RESERVED_PREFIX;
use crate::scope::{collect_binding_names, declared_names, param_names};
use oxc_allocator::Vec as ArenaVec;
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::{
    walk_arrow_function_expression, walk_block_statement, walk_catch_clause, walk_expression,
    walk_for_in_statement, walk_for_of_statement, walk_for_statement, walk_function,
    walk_jsx_element_name, walk_jsx_member_expression_object, walk_object_property,
    walk_simple_assignment_target, walk_switch_statement,
};
use oxc_ast_visit::VisitMut;
use oxc_span::SPAN;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

/// Name of the per-instance storage record inside the generated component.
pub const INSTANCE: &str = "__rsx_instance";
/// Ref object holding the record; `.current` is the record itself.
pub const INSTANCE_REF: &str = "__rsx_instanceRef";

/// How promoted slots are reached from rewritten code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAccess {
    /// `__rsx_instance.name`
    Instance,
    /// `__rsx_instanceRef.current.name`, usable while the record is being created.
    Ref,
}

fn record_object<'a>(ast: &AstBuilder<'a>, access: RecordAccess) -> Expression<'a> {
    match access {
        RecordAccess::Instance => ast.expression_identifier(SPAN, INSTANCE),
        RecordAccess::Ref => Expression::from(ast.member_expression_static(
            SPAN,
            ast.expression_identifier(SPAN, INSTANCE_REF),
            ast.identifier_name(SPAN, "current"),
            false,
        )),
    }
}

fn jsx_record_object<'a>(
    ast: &AstBuilder<'a>,
    access: RecordAccess,
) -> JSXMemberExpressionObject<'a> {
    match access {
        RecordAccess::Instance => {
            ast.jsx_member_expression_object_identifier_reference(SPAN, INSTANCE)
        }
        RecordAccess::Ref => {
            let root = ast.jsx_member_expression_object_identifier_reference(SPAN, INSTANCE_REF);
            let current = ast.jsx_identifier(SPAN, "current");
            ast.jsx_member_expression_object_member_expression(SPAN, root, current)
        }
    }
}

/// `<record>.<name>`
pub fn record_member<'a>(
    ast: &AstBuilder<'a>,
    access: RecordAccess,
    name: &str,
) -> MemberExpression<'a> {
    let arena_str: &'a str = ast.allocator.alloc_str(name);
    let property = ast.identifier_name(SPAN, arena_str);
    ast.member_expression_static(SPAN, record_object(ast, access), property, false)
}

/// `__rsx_instance.<name>`
pub fn instance_member<'a>(ast: &AstBuilder<'a>, name: &str) -> MemberExpression<'a> {
    record_member(ast, RecordAccess::Instance, name)
}

pub struct ReferenceRewriter<'a> {
    pub ast: AstBuilder<'a>,
    promoted: HashSet<String>,
    /// Names never rewritten: lifecycle members and component parameters.
    protected: HashSet<String>,
    access: RecordAccess,
    scope_stack: Vec<HashSet<String>>,
    pub rewritten: usize,
}

impl<'a> ReferenceRewriter<'a> {
    pub fn new(ast: AstBuilder<'a>, promoted: HashSet<String>, protected: HashSet<String>) -> Self {
        Self {
            ast,
            promoted,
            protected,
            access: RecordAccess::Instance,
            scope_stack: vec![HashSet::new()],
            rewritten: 0,
        }
    }

    pub fn with_access(mut self, access: RecordAccess) -> Self {
        self.access = access;
        self
    }

    pub fn rewrite_expression(&mut self, expr: &mut Expression<'a>) {
        if !self.promoted.is_empty() {
            self.visit_expression(expr);
        }
    }

    pub fn rewrite_statements(&mut self, stmts: &mut ArenaVec<'a, Statement<'a>>) {
        if self.promoted.is_empty() {
            return;
        }
        for stmt in stmts.iter_mut() {
            self.visit_statement(stmt);
        }
    }

    fn push_scope(&mut self, names: HashSet<String>) {
        self.scope_stack.push(names);
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn is_shadowed(&self, name: &str) -> bool {
        self.scope_stack.iter().rev().any(|s| s.contains(name))
    }

    fn should_rewrite(&self, name: &str) -> bool {
        self.promoted.contains(name)
            && !name.starts_with(RESERVED_PREFIX)
            && !self.protected.contains(name)
            && !self.is_shadowed(name)
    }

    fn function_scope(
        params: &FormalParameters<'a>,
        body: Option<&FunctionBody<'a>>,
    ) -> HashSet<String> {
        let mut names = param_names(params);
        if let Some(body) = body {
            names.extend(declared_names(&body.statements));
        }
        names
    }

    fn declaration_scope(decl: &VariableDeclaration<'a>) -> HashSet<String> {
        let mut names = HashSet::new();
        for d in &decl.declarations {
            collect_binding_names(&d.id, &mut names);
        }
        names
    }
}

impl<'a> VisitMut<'a> for ReferenceRewriter<'a> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if let Expression::Identifier(id) = expr {
            let name = id.name.to_string();
            if self.should_rewrite(&name) {
                let member = record_member(&self.ast, self.access, &name);
                *expr = Expression::from(member);
                self.rewritten += 1;
                return;
            }
        }
        walk_expression(self, expr);
    }

    fn visit_simple_assignment_target(&mut self, target: &mut SimpleAssignmentTarget<'a>) {
        if let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = target {
            let name = id.name.to_string();
            if self.should_rewrite(&name) {
                let member = record_member(&self.ast, self.access, &name);
                *target = SimpleAssignmentTarget::from(member);
                self.rewritten += 1;
                return;
            }
        }
        walk_simple_assignment_target(self, target);
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        walk_object_property(self, prop);
        // `{ count }` whose value became `__rsx_instance.count`
        if prop.shorthand && !matches!(prop.value, Expression::Identifier(_)) {
            prop.shorthand = false;
        }
    }

    fn visit_jsx_element_name(&mut self, name: &mut JSXElementName<'a>) {
        if let JSXElementName::IdentifierReference(id) = name {
            let tag_name = id.name.to_string();
            if self.should_rewrite(&tag_name) {
                let tag: &'a str = self.ast.allocator.alloc_str(&tag_name);
                let object = jsx_record_object(&self.ast, self.access);
                let property = self.ast.jsx_identifier(SPAN, tag);
                *name = self.ast.jsx_element_name_member_expression(SPAN, object, property);
                self.rewritten += 1;
                return;
            }
        }
        walk_jsx_element_name(self, name);
    }

    fn visit_jsx_member_expression_object(&mut self, object: &mut JSXMemberExpressionObject<'a>) {
        // `<ui.Button />` with `ui` promoted
        if let JSXMemberExpressionObject::IdentifierReference(id) = object {
            let object_name = id.name.to_string();
            if self.should_rewrite(&object_name) {
                let prop: &'a str = self.ast.allocator.alloc_str(&object_name);
                let instance = jsx_record_object(&self.ast, self.access);
                let property = self.ast.jsx_identifier(SPAN, prop);
                *object = self
                    .ast
                    .jsx_member_expression_object_member_expression(SPAN, instance, property);
                self.rewritten += 1;
                return;
            }
        }
        walk_jsx_member_expression_object(self, object);
    }

    fn visit_function(&mut self, func: &mut Function<'a>, flags: ScopeFlags) {
        let mut names = Self::function_scope(&func.params, func.body.as_deref());
        // A named function expression sees its own name.
        if func.r#type == FunctionType::FunctionExpression {
            if let Some(id) = &func.id {
                names.insert(id.name.to_string());
            }
        }
        self.push_scope(names);
        walk_function(self, func, flags);
        self.pop_scope();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &mut ArrowFunctionExpression<'a>) {
        let names = Self::function_scope(&arrow.params, Some(&*arrow.body));
        self.push_scope(names);
        walk_arrow_function_expression(self, arrow);
        self.pop_scope();
    }

    fn visit_block_statement(&mut self, block: &mut BlockStatement<'a>) {
        let names = declared_names(&block.body);
        self.push_scope(names);
        walk_block_statement(self, block);
        self.pop_scope();
    }

    fn visit_switch_statement(&mut self, stmt: &mut SwitchStatement<'a>) {
        let mut names = HashSet::new();
        for case in &stmt.cases {
            names.extend(declared_names(&case.consequent));
        }
        self.push_scope(names);
        walk_switch_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_catch_clause(&mut self, clause: &mut CatchClause<'a>) {
        let mut names = HashSet::new();
        if let Some(param) = &clause.param {
            collect_binding_names(&param.pattern, &mut names);
        }
        self.push_scope(names);
        walk_catch_clause(self, clause);
        self.pop_scope();
    }

    fn visit_for_statement(&mut self, stmt: &mut ForStatement<'a>) {
        let names = match &stmt.init {
            Some(ForStatementInit::VariableDeclaration(decl)) => Self::declaration_scope(decl),
            _ => HashSet::new(),
        };
        self.push_scope(names);
        walk_for_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_for_of_statement(&mut self, stmt: &mut ForOfStatement<'a>) {
        let names = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Self::declaration_scope(decl),
            _ => HashSet::new(),
        };
        self.push_scope(names);
        walk_for_of_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_for_in_statement(&mut self, stmt: &mut ForInStatement<'a>) {
        let names = match &stmt.left {
            ForStatementLeft::VariableDeclaration(decl) => Self::declaration_scope(decl),
            _ => HashSet::new(),
        };
        self.push_scope(names);
        walk_for_in_statement(self, stmt);
        self.pop_scope();
    }

    fn visit_class(&mut self, class: &mut Class<'a>) {
        let mut names = HashSet::new();
        if let Some(id) = &class.id {
            names.insert(id.name.to_string());
        }
        self.push_scope(names);
        oxc_ast_visit::walk_mut::walk_class(self, class);
        self.pop_scope();
    }
}
