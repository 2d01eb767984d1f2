//! Rolldown plugin for modmock
//!
//! Wires a [`MockSession`] into Rolldown's plugin hooks:
//!
//! - `build_start` extracts the mock registrations;
//! - `load` serves manual mocks from `__mocks__` directories;
//! - `transform` replaces registered modules with automocks.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use modmock::MockOptions;
//! use modmock_plugin::MockPlugin;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = MockOptions::new("/project/.storybook/preview.ts", "/project/.storybook");
//! let plugin = MockPlugin::new(options, "/project")?;
//! // Its transform hook runs in the `pre` phase, ahead of other transforms
//! # Ok(())
//! # }
//! ```

use modmock::{HostMode, LoadOutcome, MockOptions, MockSession, SourceMap, TransformOutcome};
use rolldown_plugin::{
    HookBuildStartArgs, HookLoadArgs, HookLoadOutput, HookLoadReturn, HookNoopReturn,
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    PluginContext, PluginHookMeta, PluginOrder, SharedTransformPluginContext,
};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Rolldown plugin serving mocked modules in production builds
#[derive(Debug, Clone)]
pub struct MockPlugin {
    session: Arc<MockSession>,
}

impl MockPlugin {
    /// Create a plugin with a build-mode session rooted at `root`
    pub fn new(options: MockOptions, root: impl Into<PathBuf>) -> modmock::Result<Self> {
        let session = MockSession::new(options, HostMode::Build, root)?;
        Ok(Self::from_session(Arc::new(session)))
    }

    /// Share an existing session, e.g. one also driven by a dev server
    pub fn from_session(session: Arc<MockSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<MockSession> {
        &self.session
    }
}

/// Extract registrations; a missing configuration file leaves the build unmocked
async fn build_start_impl(session: &MockSession) -> anyhow::Result<()> {
    match session.build_start().await {
        Ok(extraction) => {
            debug!(
                "[modmock] {} mocked module(s) registered",
                extraction.manifest.len()
            );
        }
        Err(err) => {
            warn!("[modmock] {}", err);
        }
    }
    Ok(())
}

async fn load_impl(session: &MockSession, id: &str) -> anyhow::Result<Option<String>> {
    match session.load(id).await {
        LoadOutcome::Redirected { path, code } => {
            debug!("[modmock] Loading {} from {}", id, path.display());
            Ok(Some(code))
        }
        LoadOutcome::PassThrough => Ok(None),
    }
}

/// Replacement source and, for automocks, its map back to the original
async fn transform_impl(
    session: &MockSession,
    code: &str,
    id: &str,
) -> anyhow::Result<Option<(String, Option<SourceMap>)>> {
    match session.transform(code, id).await {
        TransformOutcome::Automocked { code, map } => Ok(Some((code, Some(map)))),
        TransformOutcome::Redirected { code, .. } => Ok(Some((code, None))),
        TransformOutcome::PassThrough => Ok(None),
    }
}

impl Plugin for MockPlugin {
    fn name(&self) -> Cow<'static, str> {
        "modmock".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::BuildStart | HookUsage::Load | HookUsage::Transform
    }

    fn build_start(
        &self,
        _ctx: &PluginContext,
        _args: &HookBuildStartArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let session = Arc::clone(&self.session);

        async move { build_start_impl(&session).await }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let session = Arc::clone(&self.session);
        let id = args.id.to_string();

        async move {
            Ok(load_impl(&session, &id).await?.map(|code| HookLoadOutput {
                code: code.into(),
                ..Default::default()
            }))
        }
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let session = Arc::clone(&self.session);
        let id = args.id.to_string();
        let code = args.code.to_string();

        async move {
            Ok(transform_impl(&session, &code, &id)
                .await?
                .map(|(code, map)| HookTransformOutput {
                    code: Some(code),
                    map,
                    side_effects: None,
                    module_type: None,
                }))
        }
    }

    /// Automocks must see the untransformed module source
    fn transform_meta(&self) -> Option<PluginHookMeta> {
        Some(PluginHookMeta {
            order: Some(PluginOrder::Pre),
        })
    }
}
