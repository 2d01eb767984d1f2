#![cfg_attr(docsrs, feature(doc_cfg))]

//! # modmock
//!
//! Module mocking for JavaScript build pipelines and dev servers.
//!
//! A configuration file registers modules to mock:
//!
//! ```js
//! // .storybook/preview.ts
//! sb.mock("../src/api.ts", { spy: true });
//! sb.mock("lodash");
//! ```
//!
//! The engine statically extracts those registrations into a [`Manifest`],
//! serves manual mocks from `__mocks__` directories, automocks everything
//! else by replacing function exports with inert stand-ins, and keeps a dev
//! server consistent when the configuration or a manual mock changes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use modmock::{HostMode, MockOptions, MockSession, TransformOutcome};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = MockOptions::new("/project/.storybook/preview.ts", "/project/.storybook");
//! let session = MockSession::new(options, HostMode::Build, "/project")?;
//! session.build_start().await?;
//!
//! let code = std::fs::read_to_string("/project/src/api.ts")?;
//! if let TransformOutcome::Automocked { code, .. } =
//!     session.transform(&code, "/project/src/api.ts").await
//! {
//!     println!("{code}");
//! }
//! # Ok(()) }
//! ```

pub mod automock;
pub mod error;
pub mod extract;
pub mod graph;
pub mod invalidate;
pub mod loader;
pub mod manifest;
pub mod matching;
pub mod options;
pub mod paths;
pub mod server;
pub mod session;
pub mod watcher;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{init_logging, init_logging_from_env, LogLevel};

pub use automock::{automock, AutomockOutput};
pub use error::{MockError, Result};
pub use extract::{extract, DiagnosticKind, ExtractDiagnostic, Extraction, Extractor};
pub use graph::{InMemoryModuleGraph, ModuleGraph, ModuleNode};
pub use invalidate::{invalidate_changes, InvalidationReport};
pub use loader::{Interceptor, LoadOutcome, TransformOutcome};
pub use manifest::{Manifest, MockCall};
pub use matching::{HostMode, MatchStrategy};
pub use options::MockOptions;
pub use paths::{clean_id, strip_id, PathNormalizer};
pub use server::{DevServer, HmrEvent, HotChannel, ReloadBroadcaster};
pub use session::{ControllerState, MockSession};
pub use watcher::{FileChange, FileWatcher, WatchTargets};

// Source maps produced by the automocker
pub use oxc_sourcemap::SourceMap;
