//! Export rewriting.
//!
//! Every value export of the module is turned into a module-private binding
//! and collected, so the epilogue can re-export instrumented stand-ins under
//! the same names:
//!
//! | source                         | rewritten                                   |
//! |--------------------------------|---------------------------------------------|
//! | `export function f() {}`       | `function f() {}`                           |
//! | `export const a = 1, b = 2`    | `const a = 1, b = 2`                        |
//! | `export default expr`          | `const __modmock_default__ = expr;`         |
//! | `export { a as b }`            | *(removed)*                                 |
//! | `export { a as b } from "m"`   | `import { a as __modmock_reexport_0__ } from "m";` |
//! | `export * as ns from "m"`      | `import * as __modmock_reexport_1__ from "m";`     |
//!
//! Type-only exports, `declare` declarations, enums and namespaces are left
//! untouched; they carry no function value to instrument.

use oxc_ast::ast::{
    Declaration, ExportAllDeclaration, ExportDefaultDeclaration, ExportDefaultDeclarationKind,
    ExportNamedDeclaration, ExportSpecifier, ModuleExportName, Program, Statement,
};
use oxc_span::GetSpan;
use rustc_hash::FxHashSet;

use super::editor::SourceEditor;
use super::runtime::DEFAULT_BINDING;

/// One export of the original module
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExportBinding {
    pub exported: String,
    pub local: String,
}

pub(crate) struct ExportRewriter<'e, 's> {
    source: &'s str,
    editor: &'e mut SourceEditor<'s>,
    bindings: Vec<ExportBinding>,
    seen: FxHashSet<String>,
    notes: Vec<String>,
    reexports: usize,
}

impl<'e, 's> ExportRewriter<'e, 's> {
    pub fn new(source: &'s str, editor: &'e mut SourceEditor<'s>) -> Self {
        Self {
            source,
            editor,
            bindings: Vec::new(),
            seen: FxHashSet::default(),
            notes: Vec::new(),
            reexports: 0,
        }
    }

    /// Rewrite all top-level exports, returning the collected bindings and notes
    pub fn run(mut self, program: &Program<'_>) -> (Vec<ExportBinding>, Vec<String>) {
        for statement in &program.body {
            match statement {
                Statement::ExportNamedDeclaration(decl) => self.named(decl),
                Statement::ExportDefaultDeclaration(decl) => self.default(decl),
                Statement::ExportAllDeclaration(decl) => self.all(decl),
                _ => {}
            }
        }
        (self.bindings, self.notes)
    }

    fn record(&mut self, exported: impl Into<String>, local: impl Into<String>) {
        let exported = exported.into();
        // TypeScript overloads declare the same export more than once
        if self.seen.insert(exported.clone()) {
            self.bindings.push(ExportBinding {
                exported,
                local: local.into(),
            });
        }
    }

    fn next_reexport_binding(&mut self) -> String {
        let name = format!("__modmock_reexport_{}__", self.reexports);
        self.reexports += 1;
        name
    }

    /// Drop the `export ` keyword in front of a declaration
    fn strip_export_keyword(&mut self, statement_start: u32, declaration_start: u32) -> bool {
        if declaration_start <= statement_start {
            return false;
        }
        self.editor.remove(statement_start, declaration_start);
        true
    }

    fn named(&mut self, decl: &ExportNamedDeclaration<'_>) {
        if decl.export_kind.is_type() {
            return;
        }

        if let Some(declaration) = &decl.declaration {
            match declaration {
                Declaration::VariableDeclaration(var) if !var.declare => {
                    if self.strip_export_keyword(decl.span.start, var.span.start) {
                        for declarator in &var.declarations {
                            for ident in declarator.id.get_binding_identifiers() {
                                self.record(ident.name.as_str(), ident.name.as_str());
                            }
                        }
                    }
                }
                Declaration::FunctionDeclaration(func) if !func.declare => {
                    if let Some(id) = &func.id {
                        if self.strip_export_keyword(decl.span.start, func.span.start) {
                            self.record(id.name.as_str(), id.name.as_str());
                        }
                    }
                }
                Declaration::ClassDeclaration(class) if !class.declare => {
                    if let Some(id) = &class.id {
                        if self.strip_export_keyword(decl.span.start, class.span.start) {
                            self.record(id.name.as_str(), id.name.as_str());
                        }
                    }
                }
                _ => {}
            }
            return;
        }

        let (types, values): (Vec<&ExportSpecifier<'_>>, Vec<&ExportSpecifier<'_>>) = decl
            .specifiers
            .iter()
            .partition(|spec| spec.export_kind.is_type());

        let mut replacement = String::new();
        match &decl.source {
            Some(source) => {
                let from = source.span.source_text(self.source);
                if !values.is_empty() {
                    let mut imports = Vec::with_capacity(values.len());
                    for spec in values {
                        let private = self.next_reexport_binding();
                        imports.push(format!("{} as {}", render_name(&spec.local), private));
                        self.record(spec.exported.name().as_str(), private);
                    }
                    replacement.push_str(&format!("import {{ {} }} from {};", imports.join(", "), from));
                }
                if !types.is_empty() {
                    replacement.push_str(&format!("export type {{ {} }} from {};", render_specifiers(&types), from));
                }
            }
            None => {
                for spec in values {
                    self.record(spec.exported.name().as_str(), spec.local.name().as_str());
                }
                if !types.is_empty() {
                    replacement.push_str(&format!("export type {{ {} }};", render_specifiers(&types)));
                }
            }
        }
        self.editor.overwrite(decl.span.start, decl.span.end, replacement);
    }

    fn default(&mut self, decl: &ExportDefaultDeclaration<'_>) {
        let start = decl.span.start;
        match &decl.declaration {
            ExportDefaultDeclarationKind::FunctionDeclaration(func) => match &func.id {
                Some(id) => {
                    if self.strip_export_keyword(start, func.span.start) {
                        self.record("default", id.name.as_str());
                    }
                }
                None => self.capture_default(start, func.span.start, func.span.end, func.span.end),
            },
            ExportDefaultDeclarationKind::ClassDeclaration(class) => match &class.id {
                Some(id) => {
                    if self.strip_export_keyword(start, class.span.start) {
                        self.record("default", id.name.as_str());
                    }
                }
                None => self.capture_default(start, class.span.start, class.span.end, class.span.end),
            },
            ExportDefaultDeclarationKind::TSInterfaceDeclaration(_) => {}
            expression => {
                let span = expression.span();
                self.capture_default(start, span.start, span.end, decl.span.end);
            }
        }
    }

    /// `export default <value>` → `const __modmock_default__ = <value>;`
    fn capture_default(&mut self, start: u32, value_start: u32, value_end: u32, statement_end: u32) {
        if value_start <= start {
            return;
        }
        self.editor
            .overwrite(start, value_start, format!("const {} = ", DEFAULT_BINDING));
        let terminated = statement_end > value_end
            && self.source[value_end as usize..statement_end as usize].contains(';');
        if !terminated {
            self.editor.insert(statement_end, ";");
        }
        self.record("default", DEFAULT_BINDING);
    }

    fn all(&mut self, decl: &ExportAllDeclaration<'_>) {
        if decl.export_kind.is_type() {
            return;
        }
        let from = decl.source.span.source_text(self.source);
        match &decl.exported {
            Some(exported) => {
                let private = self.next_reexport_binding();
                self.editor.overwrite(
                    decl.span.start,
                    decl.span.end,
                    format!("import * as {} from {};", private, from),
                );
                self.record(exported.name().as_str(), private);
            }
            None => self.notes.push(format!(
                "`export * from {}` is kept as is; its names cannot be listed statically",
                from
            )),
        }
    }
}

fn render_specifiers(specs: &[&ExportSpecifier<'_>]) -> String {
    specs
        .iter()
        .map(|spec| {
            let local = render_name(&spec.local);
            let exported = render_name(&spec.exported);
            if local == exported {
                local
            } else {
                format!("{} as {}", local, exported)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_name(name: &ModuleExportName<'_>) -> String {
    render_export_name(name.name().as_str())
}

/// Export names that are not identifiers must be written as string literals
pub(crate) fn render_export_name(name: &str) -> String {
    if is_identifier_name(name) {
        name.to_string()
    } else {
        serde_json::Value::String(name.to_string()).to_string()
    }
}

fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '$' || first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '$' || c == '_' || c.is_alphanumeric())
}
