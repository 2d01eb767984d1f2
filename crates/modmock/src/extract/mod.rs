//! Mock registration extraction.
//!
//! Reads the configuration entry file, collects the registration calls it
//! contains, resolves each specifier like an import written in that file and
//! looks up a manual mock. The result is a fresh [`Manifest`] plus the
//! non-fatal diagnostics of the pass.
//!
//! ```text
//! preview.ts ──parse──▶ registrations ──resolve──▶ MockCall ──scan __mocks__──▶ Manifest
//! ```

mod redirect;
mod visitor;

use oxc_resolver::{ResolveOptions, Resolver};
use oxc_span::Span;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{MockError, Result};
use crate::manifest::{Manifest, MockCall};
use crate::options::MockOptions;
use crate::paths::PathNormalizer;

pub(crate) use visitor::line_of;

/// Category of an extraction diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The configuration source has a syntax error (the parser recovered)
    Parse,
    /// A registration is not statically analyzable
    Extraction,
    /// A registration specifier did not resolve
    Resolution,
    /// A second registration targets an already registered module
    Duplicate,
}

/// Non-fatal problem found while extracting registrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Option<Span>,
    /// 1-based line in the configuration file
    pub line: Option<usize>,
    pub specifier: Option<String>,
}

impl ExtractDiagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            line: None,
            specifier: None,
        }
    }

    pub(crate) fn at(mut self, span: Span, line: usize) -> Self {
        self.span = Some(span);
        self.line = Some(line);
        self
    }

    pub(crate) fn for_specifier(mut self, specifier: impl Into<String>) -> Self {
        self.specifier = Some(specifier.into());
        self
    }
}

/// Output of one extraction pass
#[derive(Debug, Clone)]
pub struct Extraction {
    pub manifest: Manifest,
    pub diagnostics: Vec<ExtractDiagnostic>,
}

/// Extracts manifests from a configuration entry file.
///
/// Holds the resolver so repeated passes on a dev server reuse it; its cache
/// is cleared at the start of every pass because the files it saw may have
/// changed.
#[derive(Clone)]
pub struct Extractor {
    options: Arc<MockOptions>,
    resolver: Arc<Resolver>,
    normalizer: PathNormalizer,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    pub fn new(options: Arc<MockOptions>) -> Self {
        let resolver = Resolver::new(ResolveOptions {
            condition_names: options.condition_names.clone(),
            extensions: options.extensions.clone(),
            symlinks: !options.preserve_symlinks,
            ..Default::default()
        });

        Self {
            normalizer: PathNormalizer::new(options.preserve_symlinks),
            options,
            resolver: Arc::new(resolver),
        }
    }

    pub fn options(&self) -> &MockOptions {
        &self.options
    }

    /// Run one extraction pass.
    ///
    /// # Errors
    ///
    /// Only an unreadable configuration file is an error. Malformed or
    /// unresolvable registrations are skipped and reported as diagnostics.
    pub async fn extract(&self, root: &Path) -> Result<Extraction> {
        let config_path = &self.options.config_entry_path;
        let source = tokio::fs::read_to_string(config_path)
            .await
            .map_err(|source| MockError::ConfigRead {
                path: config_path.clone(),
                source,
            })?;

        let source_type = visitor::config_source_type(config_path);
        let (registrations, mut diagnostics) =
            visitor::collect_registrations(&source, source_type, &self.options.callee_names);

        self.resolver.clear_cache();
        let from_dir = self.options.config_entry_dir();

        let mut calls = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let line = line_of(&source, registration.span.start);
            let absolute_path = match self.resolve(&registration.specifier, from_dir) {
                Ok(path) => path,
                Err(err) => {
                    diagnostics.push(
                        ExtractDiagnostic::new(DiagnosticKind::Resolution, err.to_string())
                            .at(registration.span, line)
                            .for_specifier(&registration.specifier),
                    );
                    continue;
                }
            };

            let mut call = MockCall::new(&registration.specifier, absolute_path, registration.spy);
            call.redirect_path = redirect::find_mock_redirect(
                root,
                &registration.specifier,
                &call.absolute_path,
                &self.options.mocks_dir_name,
            )
            .await;

            debug!(
                specifier = %call.specifier,
                path = %call.absolute_path.display(),
                redirect = ?call.redirect_path,
                spy = call.spy,
                "registered mock"
            );
            calls.push((call, registration.span, line));
        }

        let mut seen = FxHashSet::default();
        let mut unique = Vec::with_capacity(calls.len());
        for (call, span, line) in calls {
            if seen.insert(call.absolute_path.clone()) {
                unique.push(call);
                continue;
            }
            diagnostics.push(
                ExtractDiagnostic::new(
                    DiagnosticKind::Duplicate,
                    format!(
                        "'{}' mocks {} which is already registered, keeping the first registration",
                        call.specifier,
                        call.absolute_path.display()
                    ),
                )
                .at(span, line)
                .for_specifier(&call.specifier),
            );
        }
        let (manifest, _) = Manifest::from_calls(unique);

        for diagnostic in &diagnostics {
            warn!(
                kind = ?diagnostic.kind,
                line = ?diagnostic.line,
                "{}: {}",
                config_path.display(),
                diagnostic.message
            );
        }

        Ok(Extraction {
            manifest,
            diagnostics,
        })
    }

    fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<PathBuf> {
        self.resolver
            .resolve(from_dir, specifier)
            .map(|resolution| PathBuf::from(self.normalizer.normalize_path(resolution.path())))
            .map_err(|e| MockError::Resolution {
                specifier: specifier.to_string(),
                from: from_dir.to_path_buf(),
                reason: e.to_string(),
            })
    }
}

/// One-shot extraction with a fresh resolver
pub async fn extract(options: &MockOptions, root: &Path) -> Result<Extraction> {
    Extractor::new(Arc::new(options.clone())).extract(root).await
}
