//! Registration call-site collection.
//!
//! Parses the configuration source with OXC and walks it for calls to one of
//! the configured registration callees. Only the static shapes are accepted:
//!
//! ```js
//! registerMock("./api");
//! registerMock("lodash", { spy: true });
//! sb.mock(import("./api"), { spy: true });
//! ```

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, CallExpression, Expression, ObjectExpression, ObjectPropertyKind,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};
use std::path::Path;

use super::{DiagnosticKind, ExtractDiagnostic};

/// A registration as written, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRegistration {
    pub specifier: String,
    pub spy: bool,
    pub span: Span,
}

/// Source type used for configuration files.
///
/// The extension decides TypeScript vs JavaScript; JavaScript always gets JSX
/// enabled and unknown extensions parse as TSX.
pub(crate) fn config_source_type(path: &Path) -> SourceType {
    match SourceType::from_path(path) {
        Ok(source_type) if source_type.is_javascript() => source_type.with_jsx(true),
        Ok(source_type) => source_type,
        Err(_) => SourceType::tsx(),
    }
}

/// Parse `source` and collect every registration call in source order
pub(crate) fn collect_registrations(
    source: &str,
    source_type: SourceType,
    callee_names: &[String],
) -> (Vec<RawRegistration>, Vec<ExtractDiagnostic>) {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();

    let mut diagnostics: Vec<ExtractDiagnostic> = parsed
        .errors
        .iter()
        .map(|err| ExtractDiagnostic::new(DiagnosticKind::Parse, err.to_string()))
        .collect();

    let mut collector = RegistrationCollector {
        source,
        callee_names,
        registrations: Vec::new(),
        diagnostics: Vec::new(),
    };
    collector.visit_program(&parsed.program);

    diagnostics.append(&mut collector.diagnostics);
    (collector.registrations, diagnostics)
}

struct RegistrationCollector<'s> {
    source: &'s str,
    callee_names: &'s [String],
    registrations: Vec<RawRegistration>,
    diagnostics: Vec<ExtractDiagnostic>,
}

impl<'s> RegistrationCollector<'s> {
    fn is_registration(&self, callee: &Expression<'_>) -> bool {
        let name = match callee {
            Expression::Identifier(ident) => ident.name.to_string(),
            Expression::StaticMemberExpression(member) => match &member.object {
                Expression::Identifier(object) => {
                    format!("{}.{}", object.name, member.property.name)
                }
                _ => return false,
            },
            _ => return false,
        };
        self.callee_names.iter().any(|candidate| *candidate == name)
    }

    fn diagnose(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        let line = line_of(self.source, span.start);
        self.diagnostics
            .push(ExtractDiagnostic::new(kind, message).at(span, line));
    }

    fn record(&mut self, call: &CallExpression<'_>) {
        let Some(first) = call.arguments.first() else {
            self.diagnose(
                DiagnosticKind::Extraction,
                call.span,
                "mock registration without a module specifier",
            );
            return;
        };

        let specifier = match static_specifier(first) {
            Ok(specifier) => specifier,
            Err(found) => {
                self.diagnose(
                    DiagnosticKind::Extraction,
                    call.span,
                    format!(
                        "mock registration specifier must be a string literal, found {}",
                        found
                    ),
                );
                return;
            }
        };

        let spy = match call.arguments.get(1) {
            None => false,
            Some(Argument::ObjectExpression(object)) => match spy_flag(object) {
                Ok(spy) => spy,
                Err(message) => {
                    self.diagnose(DiagnosticKind::Extraction, call.span, message);
                    false
                }
            },
            Some(_) => {
                self.diagnose(
                    DiagnosticKind::Extraction,
                    call.span,
                    format!("options of mock '{}' must be an object literal", specifier),
                );
                false
            }
        };

        self.registrations.push(RawRegistration {
            specifier,
            spy,
            span: call.span,
        });
    }
}

impl<'a, 's> Visit<'a> for RegistrationCollector<'s> {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if self.is_registration(&call.callee) {
            self.record(call);
        }
        walk::walk_call_expression(self, call);
    }
}

/// Statically known specifier of the first registration argument
fn static_specifier(argument: &Argument<'_>) -> Result<String, &'static str> {
    match argument {
        Argument::StringLiteral(lit) => Ok(lit.value.to_string()),
        Argument::TemplateLiteral(template) => {
            if !template.expressions.is_empty() {
                return Err("a template literal with substitutions");
            }
            template
                .quasis
                .first()
                .and_then(|quasi| quasi.value.cooked)
                .map(|cooked| cooked.to_string())
                .ok_or("an invalid template literal")
        }
        Argument::ImportExpression(import) => match &import.source {
            Expression::StringLiteral(lit) => Ok(lit.value.to_string()),
            _ => Err("a dynamic import of a computed specifier"),
        },
        Argument::SpreadElement(_) => Err("a spread argument"),
        Argument::Identifier(_) => Err("an identifier"),
        _ => Err("a computed expression"),
    }
}

/// Value of the `spy` property of the options object
fn spy_flag(object: &ObjectExpression<'_>) -> Result<bool, String> {
    for property in &object.properties {
        match property {
            ObjectPropertyKind::ObjectProperty(prop) => {
                if prop.computed || prop.key.static_name().as_deref() != Some("spy") {
                    continue;
                }
                return match &prop.value {
                    Expression::BooleanLiteral(flag) => Ok(flag.value),
                    _ => Err("the `spy` option must be a boolean literal".to_string()),
                };
            }
            ObjectPropertyKind::SpreadProperty(_) => {
                return Err("spread properties are not supported in mock options".to_string());
            }
        }
    }
    Ok(false)
}

/// 1-based line number of a byte offset
pub(crate) fn line_of(source: &str, offset: u32) -> usize {
    let end = (offset as usize).min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["registerMock".to_string(), "sb.mock".to_string()]
    }

    fn collect(source: &str) -> (Vec<RawRegistration>, Vec<ExtractDiagnostic>) {
        collect_registrations(source, SourceType::tsx(), &names())
    }

    #[test]
    fn test_collects_in_source_order() {
        let (regs, diags) = collect(
            r#"
registerMock("./api");
registerMock("lodash", { spy: true });
"#,
        );
        assert!(diags.is_empty());
        let specs: Vec<_> = regs.iter().map(|r| (r.specifier.as_str(), r.spy)).collect();
        assert_eq!(specs, vec![("./api", false), ("lodash", true)]);
    }

    #[test]
    fn test_member_callee_and_dynamic_import() {
        let (regs, diags) = collect(
            r#"
import { sb } from "storybook/test";
sb.mock(import("./api.ts"), { spy: true });
sb.mock(`./utils`);
"#,
        );
        assert!(diags.is_empty());
        assert_eq!(regs.len(), 2);
        assert_eq!(regs[0].specifier, "./api.ts");
        assert!(regs[0].spy);
        assert_eq!(regs[1].specifier, "./utils");
    }

    #[test]
    fn test_non_literal_specifier_is_skipped_with_diagnostic() {
        let (regs, diags) = collect(
            r#"
const name = "./api";
registerMock(name);
registerMock(`./${name}`);
registerMock("./ok");
"#,
        );
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].specifier, "./ok");
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::Extraction));
        assert_eq!(diags[0].line, Some(3));
    }

    #[test]
    fn test_non_boolean_spy_defaults_to_false() {
        let (regs, diags) = collect(r#"registerMock("./api", { spy: isCI });"#);
        assert_eq!(regs.len(), 1);
        assert!(!regs[0].spy);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_ignores_other_calls() {
        let (regs, _) = collect(
            r#"
mock("./api");
other.mock("./api");
vi.registerMock("./api");
"#,
        );
        assert!(regs.is_empty());
    }

    #[test]
    fn test_nested_registrations_are_found() {
        let (regs, _) = collect(
            r#"
export default {
  beforeAll() {
    registerMock("./inner", { spy: false });
  },
};
"#,
        );
        assert_eq!(regs.len(), 1);
        assert_eq!(regs[0].specifier, "./inner");
    }

    #[test]
    fn test_tsx_syntax_is_accepted() {
        let (regs, diags) = collect(
            r#"
import type { Preview } from "@storybook/react";
registerMock("./api", { spy: true });
const decorators = [(Story: any) => <div className="wrap"><Story /></div>];
class Store { #count = 0; static instance?: Store; }
export default { decorators } satisfies Preview;
"#,
        );
        assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags);
        assert_eq!(regs.len(), 1);
    }

    #[test]
    fn test_config_source_type() {
        assert!(config_source_type(Path::new("preview.ts")).is_typescript());
        assert!(config_source_type(Path::new("preview.js")).is_jsx());
        assert!(config_source_type(Path::new("preview")).is_jsx());
    }

    #[test]
    fn test_line_of() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 100), 3);
    }
}
