//! Shared fixtures for integration tests.

#![allow(dead_code)]

use modmock::{
    DevServer, HostMode, HotChannel, InMemoryModuleGraph, MockOptions, MockSession, ModuleGraph,
    ReloadBroadcaster,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary project with a `.storybook/preview.ts` configuration file
pub struct Project {
    _dir: TempDir,
    root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        // Resolved paths are canonical, so fixtures must be too
        let root = fs::canonicalize(dir.path()).expect("canonical root");
        fs::create_dir_all(root.join(".storybook")).expect("create config dir");
        fs::create_dir_all(root.join("src")).expect("create src");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Module id of a project file, as a host would hand it out
    pub fn id(&self, rel: &str) -> String {
        self.path(rel).to_string_lossy().into_owned()
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn config_path(&self) -> PathBuf {
        self.path(".storybook/preview.ts")
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write(".storybook/preview.ts", contents)
    }

    /// Minimal installed package with a `main` entry
    pub fn add_package(&self, name: &str, source: &str) -> PathBuf {
        self.write(
            &format!("node_modules/{}/package.json", name),
            &format!(r#"{{ "name": "{}", "main": "index.js" }}"#, name),
        );
        self.write(&format!("node_modules/{}/index.js", name), source)
    }

    pub fn options(&self) -> MockOptions {
        MockOptions::new(self.config_path(), self.path(".storybook"))
    }

    pub fn session(&self, mode: HostMode) -> MockSession {
        MockSession::new(self.options(), mode, self.root()).expect("valid session")
    }
}

/// Dev server double backed by the in-memory graph and broadcaster
#[derive(Default)]
pub struct TestServer {
    pub graph: InMemoryModuleGraph,
    pub hot: ReloadBroadcaster,
}

impl DevServer for TestServer {
    fn module_graph(&self) -> &dyn ModuleGraph {
        &self.graph
    }

    fn hot(&self) -> &dyn HotChannel {
        &self.hot
    }
}
