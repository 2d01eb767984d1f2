//! Load and transform interception.
//!
//! The [`Interceptor`] answers the two per-module questions a host asks:
//! should this module be loaded from a manual mock file, and should its
//! source be replaced by an automock. Both answers are derived from the
//! manifest snapshot passed in, so a hook that started before a manifest
//! swap finishes against the snapshot it started with.

use oxc_sourcemap::SourceMap;
use std::path::PathBuf;
use tracing::{debug, error, warn};

use crate::automock::automock;
use crate::manifest::Manifest;
use crate::matching::MatchStrategy;
use crate::paths::PathNormalizer;

/// Result of the load hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Serve the manual mock file instead of the module
    Redirected { path: PathBuf, code: String },
    /// Let the host load the module normally
    PassThrough,
}

/// Result of the transform hook
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    /// Source replaced by instrumented stand-ins
    Automocked { code: String, map: SourceMap },
    /// Source replaced by the manual mock file
    Redirected { path: PathBuf, code: String },
    /// Leave the source as is
    PassThrough,
}

impl TransformOutcome {
    pub fn is_pass_through(&self) -> bool {
        matches!(self, Self::PassThrough)
    }

    /// Replacement source, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Automocked { code, .. } | Self::Redirected { code, .. } => Some(code),
            Self::PassThrough => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Interceptor {
    strategy: MatchStrategy,
    normalizer: PathNormalizer,
}

impl Interceptor {
    pub fn new(strategy: MatchStrategy, normalizer: PathNormalizer) -> Self {
        Self {
            strategy,
            normalizer,
        }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Serve the manual mock of a registered module.
    ///
    /// Only exact path matches are redirected here; pre-bundled dependency
    /// ids are handled by [`Interceptor::transform`].
    pub async fn load(&self, manifest: &Manifest, id: &str) -> LoadOutcome {
        let Some(call) = MatchStrategy::ExactPath.find(manifest, id, &self.normalizer) else {
            return LoadOutcome::PassThrough;
        };
        let Some(redirect) = &call.redirect_path else {
            return LoadOutcome::PassThrough;
        };

        match tokio::fs::read_to_string(redirect).await {
            Ok(code) => {
                debug!(id, redirect = %redirect.display(), "serving manual mock");
                LoadOutcome::Redirected {
                    path: redirect.clone(),
                    code,
                }
            }
            Err(err) => {
                warn!(
                    id,
                    redirect = %redirect.display(),
                    error = %err,
                    "failed to read manual mock, loading original module"
                );
                LoadOutcome::PassThrough
            }
        }
    }

    /// Automock or redirect the source of a registered module
    pub async fn transform(&self, manifest: &Manifest, code: &str, id: &str) -> TransformOutcome {
        let Some(call) = self.strategy.find(manifest, id, &self.normalizer) else {
            return TransformOutcome::PassThrough;
        };

        if let Some(redirect) = &call.redirect_path {
            return match tokio::fs::read_to_string(redirect).await {
                Ok(code) => {
                    debug!(id, redirect = %redirect.display(), "serving manual mock from transform");
                    TransformOutcome::Redirected {
                        path: redirect.clone(),
                        code,
                    }
                }
                Err(err) => {
                    warn!(
                        id,
                        redirect = %redirect.display(),
                        error = %err,
                        "failed to read manual mock, leaving module untouched"
                    );
                    TransformOutcome::PassThrough
                }
            };
        }

        match automock(code, id, call.spy) {
            Ok(output) if output.exports.is_empty() => {
                warn!(id, "mocked module has no ES exports to replace, leaving it untouched");
                TransformOutcome::PassThrough
            }
            Ok(output) => {
                for note in &output.notes {
                    warn!(id, "{}", note);
                }
                debug!(id, exports = ?output.exports, spy = call.spy, "automocked module");
                TransformOutcome::Automocked {
                    code: output.code,
                    map: output.map,
                }
            }
            Err(err) => {
                error!(id, error = %err, "automock failed, leaving module untouched");
                TransformOutcome::PassThrough
            }
        }
    }
}
