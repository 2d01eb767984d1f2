//! Mock plugin options.
//!
//! Options are plain serde data so hosts can build them programmatically,
//! deserialize them from their own config, or load them with
//! [`MockOptions::load`] from a `modmock.toml` file and `MODMOCK_*`
//! environment variables.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MockError, Result};

/// Name of the optional options file looked up by [`MockOptions::load`]
pub const OPTIONS_FILE: &str = "modmock.toml";

/// Options for a mocking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockOptions {
    /// Absolute path to the file containing the mock registrations
    pub config_entry_path: PathBuf,

    /// Absolute path to the project's configuration directory
    pub config_dir: PathBuf,

    /// Pass-through settings of the host, never interpreted here
    pub core_options: Option<serde_json::Value>,

    /// Callee names recognized as mock registrations.
    ///
    /// Plain names match identifier calls (`registerMock("./api")`), dotted
    /// names match static member calls (`sb.mock("./api")`).
    pub callee_names: Vec<String>,

    /// Compare module ids without resolving symlinks
    pub preserve_symlinks: bool,

    /// Directory name reserved for manual mocks
    pub mocks_dir_name: String,

    /// Extensions tried when resolving registration specifiers
    pub extensions: Vec<String>,

    /// Package export conditions used when resolving registration specifiers
    pub condition_names: Vec<String>,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            config_entry_path: PathBuf::new(),
            config_dir: PathBuf::new(),
            core_options: None,
            callee_names: vec!["registerMock".to_string(), "sb.mock".to_string()],
            preserve_symlinks: false,
            mocks_dir_name: "__mocks__".to_string(),
            extensions: [".js", ".mjs", ".cjs", ".ts", ".mts", ".cts", ".jsx", ".tsx", ".json"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            condition_names: vec![
                "import".to_string(),
                "module".to_string(),
                "browser".to_string(),
                "default".to_string(),
            ],
        }
    }
}

impl MockOptions {
    /// Create options for a configuration entry file
    ///
    /// # Example
    ///
    /// ```rust
    /// use modmock::MockOptions;
    ///
    /// let options = MockOptions::new("/project/.storybook/preview.ts", "/project/.storybook")
    ///     .with_preserve_symlinks(true);
    /// assert_eq!(options.mocks_dir_name, "__mocks__");
    /// ```
    pub fn new(config_entry_path: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_entry_path: config_entry_path.into(),
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    /// Load options layered from defaults, `<dir>/modmock.toml` and
    /// `MODMOCK_*` environment variables (later layers win).
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Figment::from(Serialized::defaults(MockOptions::default()))
            .merge(Toml::file(dir.as_ref().join(OPTIONS_FILE)))
            .merge(Env::prefixed("MODMOCK_"))
            .extract()
            .map_err(|e| MockError::Options(e.to_string()))
    }

    /// Replace the recognized registration callee names
    pub fn with_callee_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callee_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether symlinks are preserved when comparing module ids
    pub fn with_preserve_symlinks(mut self, preserve: bool) -> Self {
        self.preserve_symlinks = preserve;
        self
    }

    /// Set the manual mock directory name
    pub fn with_mocks_dir_name(mut self, name: impl Into<String>) -> Self {
        self.mocks_dir_name = name.into();
        self
    }

    /// Attach pass-through host settings
    pub fn with_core_options(mut self, value: serde_json::Value) -> Self {
        self.core_options = Some(value);
        self
    }

    /// Check the options are usable for a session
    pub fn validate(&self) -> Result<()> {
        if self.config_entry_path.as_os_str().is_empty() {
            return Err(MockError::Options(
                "config_entry_path must be set".to_string(),
            ));
        }
        if !self.config_entry_path.is_absolute() {
            return Err(MockError::Options(format!(
                "config_entry_path must be absolute, got {}",
                self.config_entry_path.display()
            )));
        }
        if self.callee_names.is_empty() {
            return Err(MockError::Options(
                "at least one registration callee name is required".to_string(),
            ));
        }
        if self.mocks_dir_name.is_empty() || self.mocks_dir_name.contains(['/', '\\']) {
            return Err(MockError::Options(format!(
                "mocks_dir_name must be a single directory name, got '{}'",
                self.mocks_dir_name
            )));
        }
        Ok(())
    }

    /// Directory containing the configuration entry file
    pub fn config_entry_dir(&self) -> &Path {
        self.config_entry_path
            .parent()
            .unwrap_or(self.config_dir.as_path())
    }
}
