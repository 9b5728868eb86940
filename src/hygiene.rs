use crate::context::CompileContext;
use crate::diagnostics::{CompilerError, RESERVED_PREFIX, RSX_RESERVED_IDENTIFIER};
use oxc_ast::ast::*;
use oxc_ast_visit::Visit;
use oxc_span::Span;

/// Rejects user identifiers inside the compiler's reserved namespace.
pub fn check_reserved(
    program: &Program<'_>,
    ctx: &CompileContext<'_>,
) -> Result<(), CompilerError> {
    let mut finder = ReservedNameFinder { found: None };
    finder.visit_program(program);
    match finder.found {
        Some((name, span)) => Err(ctx.error(
            RSX_RESERVED_IDENTIFIER,
            &format!(
                "`{}` uses the reserved `{}` prefix. Names with this prefix belong to the compiler.",
                name, RESERVED_PREFIX
            ),
            span,
            vec![format!(
                "Rename `{}` to something without the `{}` prefix.",
                name, RESERVED_PREFIX
            )],
        )),
        None => Ok(()),
    }
}

struct ReservedNameFinder {
    found: Option<(String, Span)>,
}

impl ReservedNameFinder {
    fn check(&mut self, name: &str, span: Span) {
        if self.found.is_none() && name.starts_with(RESERVED_PREFIX) {
            self.found = Some((name.to_string(), span));
        }
    }
}

impl<'a> Visit<'a> for ReservedNameFinder {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'a>) {
        self.check(&ident.name, ident.span);
    }

    fn visit_identifier_reference(&mut self, ident: &IdentifierReference<'a>) {
        self.check(&ident.name, ident.span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn check(code: &str) -> Result<(), CompilerError> {
        let allocator = Allocator::default();
        let options = CompileOptions::default();
        let ctx = CompileContext::new("App.rsx", code, &options);
        let ret = Parser::new(&allocator, code, SourceType::default().with_module(true)).parse();
        check_reserved(&ret.program, &ctx)
    }

    #[test]
    fn reserved_binding_is_rejected() {
        let err = check("export default function A() {\n  let __rsx_instance = 1;\n}").unwrap_err();
        assert_eq!(err.code, RSX_RESERVED_IDENTIFIER);
        assert_eq!(err.line, 2);
        assert!(err.message.contains("__rsx_instance"));
    }

    #[test]
    fn reserved_reference_is_rejected() {
        assert!(check("export default function A() { __rsx_render(); }").is_err());
    }

    #[test]
    fn reserved_property_name_is_allowed() {
        assert!(check("export default function A(o) { o.__rsx_x = 1; }").is_ok());
    }
}
