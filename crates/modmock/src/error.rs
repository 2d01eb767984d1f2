//! Error types for mock extraction, automocking and invalidation.
//!
//! None of these errors is fatal to the host. Hooks on
//! [`MockSession`](crate::MockSession) catch them, log them through `tracing`
//! and fall back to serving modules unmodified. They are still surfaced as
//! `Result`s so hosts that want stricter behaviour can act on them.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the mocking engine
#[derive(Error, Debug, Diagnostic)]
pub enum MockError {
    /// The configuration entry file could not be read
    #[error("Failed to read mock configuration {}: {source}", path.display())]
    #[diagnostic(
        code(modmock::config_read),
        help("Check that `config_entry_path` points at the file containing the mock registrations")
    )]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A registration could not be statically extracted
    #[error("Invalid mock registration: {message}")]
    #[diagnostic(code(modmock::extract))]
    Extraction { message: String },

    /// A registration specifier did not resolve to a file
    #[error("Failed to resolve mocked module '{specifier}' from {}: {reason}", from.display())]
    #[diagnostic(
        code(modmock::resolve),
        help("The specifier is resolved exactly like an import written in the configuration file")
    )]
    Resolution {
        specifier: String,
        from: PathBuf,
        reason: String,
    },

    /// Automock code generation failed
    #[error("Failed to automock {id}: {reason}")]
    #[diagnostic(code(modmock::transform))]
    Transform { id: String, reason: String },

    /// Processing a file system event failed
    #[error("Failed to process change of {}: {reason}", path.display())]
    #[diagnostic(code(modmock::watch_callback))]
    WatchCallback { path: PathBuf, reason: String },

    /// File watcher setup failed
    #[error("File watcher error: {0}")]
    #[diagnostic(code(modmock::watch))]
    Watch(#[from] notify::Error),

    /// Invalid plugin options
    #[error("Invalid mock options: {0}")]
    #[diagnostic(code(modmock::options))]
    Options(String),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    #[diagnostic(code(modmock::io))]
    Io(#[from] std::io::Error),
}

impl MockError {
    /// Create a Transform error
    pub fn transform(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transform {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create an Extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction {
            message: message.into(),
        }
    }
}

/// Result type for mocking operations
pub type Result<T> = std::result::Result<T, MockError>;
