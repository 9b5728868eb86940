//! Rejects calls to host reactive primitives inside DSL files.
//!
//! Only bindings imported from the host module count. A local function that
//! happens to be called `useState` is left alone.

use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::diagnostics::{CompilerError, RESERVED_PREFIX, RSX_BANNED_PRIMITIVE};
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::Span;
use std::collections::HashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannedPrimitive {
    State,
    Callback,
    Memo,
    Other(String),
}

impl BannedPrimitive {
    fn from_export_name(name: &str, extra: &[String]) -> Option<Self> {
        match name {
            "useState" => Some(BannedPrimitive::State),
            "useCallback" => Some(BannedPrimitive::Callback),
            "useMemo" => Some(BannedPrimitive::Memo),
            other if extra.iter().any(|e| e == other) => {
                Some(BannedPrimitive::Other(other.to_string()))
            }
            _ => None,
        }
    }

    pub fn export_name(&self) -> &str {
        match self {
            BannedPrimitive::State => "useState",
            BannedPrimitive::Callback => "useCallback",
            BannedPrimitive::Memo => "useMemo",
            BannedPrimitive::Other(name) => name,
        }
    }

    pub fn message(&self) -> String {
        match self {
            BannedPrimitive::State => "[RSX] useState() is not allowed in .rsx files. \
                A plain local such as `let count = 0;` already keeps its value for the \
                lifetime of the instance. Assign to it and call render()."
                .to_string(),
            BannedPrimitive::Callback => "[RSX] useCallback() is not allowed in .rsx files. \
                Functions declared in the component body are created once per instance, \
                so their identity is already stable."
                .to_string(),
            BannedPrimitive::Memo => "[RSX] useMemo() is not allowed in .rsx files. \
                The component body runs once per instance, not on every render, so there \
                is nothing to memoize. Recompute derived values inside update()."
                .to_string(),
            BannedPrimitive::Other(name) => format!(
                "[RSX] {}() is not allowed in .rsx files. Use the lifecycle API \
                 (view, update, destroy, render) instead.",
                name
            ),
        }
    }
}

/// Local names that alias a banned host primitive.
#[derive(Debug, Default, Clone)]
pub struct BannedAliasSet {
    aliases: HashMap<String, BannedPrimitive>,
    /// Namespace and default imports of the host module, e.g. `React` for `React.useState`.
    namespaces: HashSet<String>,
    extra: Vec<String>,
}

impl BannedAliasSet {
    pub fn from_program(program: &Program<'_>, options: &CompileOptions) -> Self {
        let mut set = BannedAliasSet {
            extra: options.extra_banned.clone(),
            ..Default::default()
        };
        for stmt in &program.body {
            let Statement::ImportDeclaration(decl) = stmt else {
                continue;
            };
            if decl.source.value != options.host_module.as_str() || decl.import_kind.is_type() {
                continue;
            }
            let Some(specifiers) = &decl.specifiers else {
                continue;
            };
            for spec in specifiers {
                match spec {
                    ImportDeclarationSpecifier::ImportSpecifier(s) => {
                        if s.import_kind.is_type() {
                            continue;
                        }
                        let imported = match &s.imported {
                            ModuleExportName::IdentifierName(n) => n.name.as_str(),
                            ModuleExportName::IdentifierReference(r) => r.name.as_str(),
                            ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
                        };
                        if let Some(primitive) =
                            BannedPrimitive::from_export_name(imported, &set.extra)
                        {
                            set.aliases.insert(s.local.name.to_string(), primitive);
                        }
                    }
                    ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                        set.namespaces.insert(s.local.name.to_string());
                    }
                    ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                        set.namespaces.insert(s.local.name.to_string());
                    }
                }
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty() && self.namespaces.is_empty()
    }

    pub fn lookup(&self, alias: &str) -> Option<&BannedPrimitive> {
        self.aliases.get(alias)
    }

    /// Fails on the first call through a banned alias.
    pub fn check(
        &self,
        program: &Program<'_>,
        ctx: &CompileContext<'_>,
    ) -> Result<(), CompilerError> {
        if self.is_empty() {
            return Ok(());
        }
        let mut finder = BannedCallFinder {
            set: self,
            found: None,
        };
        finder.visit_program(program);
        match finder.found {
            Some(hit) => {
                let mut message = hit.primitive.message();
                if hit.callee != hit.primitive.export_name() {
                    message.push_str(&format!(" (called as `{}`)", hit.callee));
                }
                Err(ctx.error(
                    RSX_BANNED_PRIMITIVE,
                    &message,
                    hit.span,
                    vec![
                        "Register behavior through view(), update(), destroy() and render()."
                            .to_string(),
                    ],
                ))
            }
            None => Ok(()),
        }
    }
}

struct BannedCall {
    primitive: BannedPrimitive,
    callee: String,
    span: Span,
}

struct BannedCallFinder<'s> {
    set: &'s BannedAliasSet,
    found: Option<BannedCall>,
}

impl<'s> BannedCallFinder<'s> {
    fn classify(&self, callee: &Expression<'_>) -> Option<(BannedPrimitive, String)> {
        match callee {
            Expression::Identifier(ident) => {
                // Injected host calls live in the reserved namespace.
                if ident.name.starts_with(RESERVED_PREFIX) {
                    return None;
                }
                self.set
                    .lookup(&ident.name)
                    .map(|p| (p.clone(), ident.name.to_string()))
            }
            Expression::StaticMemberExpression(member) => {
                let Expression::Identifier(object) = &member.object else {
                    return None;
                };
                if !self.set.namespaces.contains(object.name.as_str()) {
                    return None;
                }
                BannedPrimitive::from_export_name(&member.property.name, &self.set.extra)
                    .map(|p| (p, format!("{}.{}", object.name, member.property.name)))
            }
            Expression::ParenthesizedExpression(paren) => self.classify(&paren.expression),
            _ => None,
        }
    }
}

impl<'s, 'a> Visit<'a> for BannedCallFinder<'s> {
    fn visit_call_expression(&mut self, expr: &CallExpression<'a>) {
        if self.found.is_some() {
            return;
        }
        if let Some((primitive, callee)) = self.classify(&expr.callee) {
            self.found = Some(BannedCall {
                primitive,
                callee,
                span: expr.span,
            });
            return;
        }
        oxc_ast_visit::walk::walk_call_expression(self, expr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run(code: &str, options: &CompileOptions) -> Result<(), CompilerError> {
        let allocator = Allocator::default();
        let ctx = CompileContext::new("App.rsx", code, options);
        let source_type = SourceType::default().with_module(true).with_jsx(true);
        let ret = Parser::new(&allocator, code, source_type).parse();
        let set = BannedAliasSet::from_program(&ret.program, options);
        set.check(&ret.program, &ctx)
    }

    fn check(code: &str) -> Result<(), CompilerError> {
        run(code, &CompileOptions::default())
    }

    #[test]
    fn use_state_is_banned_with_specific_message() {
        let err = check("import { useState } from 'react';\nexport default function A() { const [a] = useState(0); }")
            .unwrap_err();
        assert_eq!(err.code, RSX_BANNED_PRIMITIVE);
        assert!(err.message.contains("useState"));
        assert!(err.message.contains("not allowed"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn use_callback_and_use_memo_have_their_own_messages() {
        let cb = check("import { useCallback } from 'react';\nuseCallback(() => {}, []);").unwrap_err();
        assert!(cb.message.contains("useCallback"));
        assert!(cb.message.contains("identity"));

        let memo = check("import { useMemo } from 'react';\nuseMemo(() => 1, []);").unwrap_err();
        assert!(memo.message.contains("useMemo"));
        assert!(memo.message.contains("update()"));
    }

    #[test]
    fn renamed_import_is_tracked_by_alias() {
        let err = check("import { useState as s } from 'react';\ns(1);").unwrap_err();
        assert!(err.message.contains("useState"));
        assert!(err.message.contains("called as `s`"));
    }

    #[test]
    fn namespace_access_is_banned() {
        let err = check("import * as React from 'react';\nReact.useMemo(() => 1);").unwrap_err();
        assert!(err.message.contains("useMemo"));
        let err = check("import React from 'react';\nReact.useState(1);").unwrap_err();
        assert!(err.message.contains("useState"));
    }

    #[test]
    fn imports_from_other_modules_are_ignored() {
        assert!(check("import { useState } from './local';\nuseState(1);").is_ok());
        assert!(check("function useState() {}\nuseState(1);").is_ok());
    }

    #[test]
    fn importing_without_calling_is_allowed() {
        assert!(check("import { useState } from 'react';\nexport default function A() {}").is_ok());
    }

    #[test]
    fn other_hooks_are_allowed() {
        assert!(check("import { useEffect, useRef } from 'react';\nuseRef(null);").is_ok());
    }

    #[test]
    fn extra_banned_uses_generic_message() {
        let options = CompileOptions {
            extra_banned: vec!["useReducer".to_string()],
            ..CompileOptions::default()
        };
        let err = run("import { useReducer } from 'react';\nuseReducer(f, 0);", &options).unwrap_err();
        assert!(err.message.contains("useReducer() is not allowed"));
        assert!(err.message.contains("lifecycle API"));
    }

    #[test]
    fn custom_host_module_is_honored() {
        let options = CompileOptions {
            host_module: "preact/hooks".to_string(),
            ..CompileOptions::default()
        };
        assert!(run("import { useState } from 'preact/hooks';\nuseState(0);", &options).is_err());
        assert!(run("import { useState } from 'react';\nuseState(0);", &options).is_ok());
    }
}
