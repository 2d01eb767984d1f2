//! Automock code generation.
//!
//! Rewrites the source of a mocked module so that it exports instrumented
//! stand-ins with the same names as the original exports:
//!
//! ```text
//! export function fetchUser(id) { ... }      function fetchUser(id) { ... }
//! export const VERSION = "1.0";        ──▶   const VERSION = "1.0";
//!                                            const __modmock_module__ = __modmock_mock_module__({ ... }, spy);
//!                                            const __modmock_export_0__ = __modmock_module__["fetchUser"];
//!                                            export { __modmock_export_0__ as fetchUser, ... };
//! ```
//!
//! Function-valued exports are replaced at runtime by stand-ins that never
//! call the original; everything else is re-exported unchanged. The rewrite
//! is done with span edits on the original text, so untouched code keeps its
//! formatting and the produced source map stays line accurate.

mod editor;
mod rewrite;
mod runtime;

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_sourcemap::SourceMap;
use oxc_span::SourceType;

use crate::error::{MockError, Result};
use crate::paths::strip_id;

use editor::SourceEditor;
use rewrite::{render_export_name, ExportBinding, ExportRewriter};
use runtime::{MOCKED_MODULE_BINDING, MOCK_MODULE_FN, RUNTIME};

/// Rewritten module
#[derive(Debug, Clone)]
pub struct AutomockOutput {
    pub code: String,
    pub map: SourceMap,
    /// Export names of the mocked module, in source order
    pub exports: Vec<String>,
    /// Constructs that were kept as is
    pub notes: Vec<String>,
}

/// Source type of a module id, ignoring query suffixes
fn module_source_type(id: &str) -> SourceType {
    match SourceType::from_path(strip_id(id)) {
        Ok(source_type) if source_type.is_javascript() => source_type.with_jsx(true),
        Ok(source_type) => source_type,
        Err(_) => SourceType::mjs(),
    }
}

/// Automock `code`, the source of module `id`.
///
/// # Errors
///
/// Returns [`MockError::Transform`] when the source does not parse. Callers
/// serve the module unmodified in that case.
pub fn automock(code: &str, id: &str, spy: bool) -> Result<AutomockOutput> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, module_source_type(id)).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let reason = parsed
            .errors
            .iter()
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(MockError::transform(id, reason));
    }

    let mut editor = SourceEditor::new(code);
    let (bindings, notes) = ExportRewriter::new(code, &mut editor).run(&parsed.program);

    if !bindings.is_empty() {
        editor.append(&epilogue(&bindings, spy));
    }

    let (code, map) = editor.finish(&strip_id(id));
    Ok(AutomockOutput {
        code,
        map,
        exports: bindings.into_iter().map(|b| b.exported).collect(),
        notes,
    })
}

/// Module object construction, re-exports and the runtime helpers
fn epilogue(bindings: &[ExportBinding], spy: bool) -> String {
    let entries = bindings
        .iter()
        .map(|binding| {
            format!(
                "{}: {}",
                serde_json::Value::String(binding.exported.clone()),
                binding.local
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::from("\n");
    out.push_str(&format!(
        "const {} = {}({{ {} }}, {});\n",
        MOCKED_MODULE_BINDING, MOCK_MODULE_FN, entries, spy
    ));

    let mut specifiers = Vec::with_capacity(bindings.len());
    for (index, binding) in bindings.iter().enumerate() {
        let private = format!("__modmock_export_{}__", index);
        out.push_str(&format!(
            "const {} = {}[{}];\n",
            private,
            MOCKED_MODULE_BINDING,
            serde_json::Value::String(binding.exported.clone())
        ));
        specifiers.push(format!("{} as {}", private, render_export_name(&binding.exported)));
    }
    out.push_str(&format!("export {{ {} }};\n", specifiers.join(", ")));
    out.push_str(RUNTIME);
    out
}
