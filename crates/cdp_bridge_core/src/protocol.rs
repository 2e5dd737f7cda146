use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::PropertyDescriptor;
use crate::Result;

/// Identifier of a remotely debuggable page/tab instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The debugging-protocol surface consumed by the capture pipeline.
///
/// `CdpBrowser` is the live implementation; tests substitute mocks. Object
/// serialization is driven host-side, so alongside the evaluate capability
/// the trait exposes own-property enumeration for the renderer's traversal.
#[async_trait]
pub trait DebuggerProtocol: Send + Sync {
    /// Attach a debugging session to the target with a fixed protocol version.
    async fn attach(&self, target: &TargetId, protocol_version: &str) -> Result<()>;

    /// Detach the session. Succeeds trivially when no session exists.
    async fn detach(&self, target: &TargetId) -> Result<()>;

    /// Enable delivery of runtime events (console calls, exceptions).
    async fn enable_runtime_events(&self, target: &TargetId) -> Result<()>;

    /// Enable delivery of browser-level log entries.
    async fn enable_log_events(&self, target: &TargetId) -> Result<()>;

    /// Enumerate the own properties of a remote object.
    async fn get_properties(
        &self,
        target: &TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>>;

    /// Evaluate a function with the remote object as `this`, returning the
    /// result by value.
    async fn call_function_on(
        &self,
        target: &TargetId,
        object_id: &str,
        declaration: &str,
    ) -> Result<Value>;

    /// Current URL of the target, re-fetched from the browser.
    async fn target_url(&self, target: &TargetId) -> Result<String>;
}
