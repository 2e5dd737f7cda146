//! Per-target debugging session lifecycle.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use url::Url;

use cdp_bridge_core::{DebuggerProtocol, Result, TargetId};

/// One attached session. Created only after the full attach/enable sequence
/// succeeds, so the router never observes a partially-attached target.
#[derive(Debug, Clone)]
pub struct TargetSession {
    pub attached: bool,
    pub protocol_version: String,
}

pub struct AttachmentManager {
    protocol: Arc<dyn DebuggerProtocol>,
    protocol_version: String,
    sessions: Mutex<HashMap<TargetId, TargetSession>>,
}

impl AttachmentManager {
    pub fn new(protocol: Arc<dyn DebuggerProtocol>, protocol_version: String) -> Self {
        Self {
            protocol,
            protocol_version,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a session to `target`. Idempotent: a no-op when already
    /// attached. Targets whose URL scheme is not `http`/`https` are skipped
    /// silently. The session map lock is held across the whole sequence so
    /// concurrent attaches for one target collapse into the in-flight
    /// attempt.
    pub async fn attach(&self, target: &TargetId) {
        let mut sessions = self.sessions.lock().await;
        if sessions.contains_key(target) {
            return;
        }

        let url = match self.protocol.target_url(target).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(target_id = %target, "could not resolve target url: {e}");
                return;
            }
        };

        if !has_debuggable_scheme(&url) {
            tracing::trace!(target_id = %target, "skipping non-debuggable target {url}");
            return;
        }

        if let Err(e) = self.attach_sequence(target).await {
            tracing::warn!(target_id = %target, "debugger attach failed: {e}");
            // Roll back whatever partially succeeded; the target stays
            // invisible to the router either way.
            let _ = self.protocol.detach(target).await;
            return;
        }

        sessions.insert(
            target.clone(),
            TargetSession {
                attached: true,
                protocol_version: self.protocol_version.clone(),
            },
        );
        tracing::info!(target_id = %target, "attached to {url}");
    }

    async fn attach_sequence(&self, target: &TargetId) -> Result<()> {
        self.protocol.attach(target, &self.protocol_version).await?;
        self.protocol.enable_runtime_events(target).await?;
        self.protocol.enable_log_events(target).await?;
        Ok(())
    }

    /// Detach from `target`. Idempotent: issues a protocol detach only when
    /// currently attached, and removes membership regardless of the call
    /// outcome.
    pub async fn detach(&self, target: &TargetId) {
        let mut sessions = self.sessions.lock().await;
        if !sessions.contains_key(target) {
            return;
        }

        if let Err(e) = self.protocol.detach(target).await {
            tracing::debug!(target_id = %target, "detach call failed: {e}");
        }
        sessions.remove(target);
    }

    pub async fn is_attached(&self, target: &TargetId) -> bool {
        let sessions = self.sessions.lock().await;
        sessions.get(target).map(|s| s.attached).unwrap_or(false)
    }

    pub async fn attached_targets(&self) -> Vec<TargetId> {
        let sessions = self.sessions.lock().await;
        sessions.keys().cloned().collect()
    }

    /// The browser removed the target; force a detach.
    pub async fn on_target_removed(&self, target: &TargetId) {
        self.detach(target).await;
    }

    /// The protocol layer reported the session gone; drop membership without
    /// issuing a detach call, since there is nothing left to detach from.
    pub async fn on_protocol_detached(&self, target: &TargetId) {
        let mut sessions = self.sessions.lock().await;
        if sessions.remove(target).is_some() {
            tracing::debug!(target_id = %target, "session detached by protocol");
        }
    }
}

fn has_debuggable_scheme(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeProtocol;
    use std::sync::atomic::Ordering;

    const VERSION: &str = "1.3";

    fn manager_with(proto: Arc<FakeProtocol>) -> AttachmentManager {
        AttachmentManager::new(proto, VERSION.to_string())
    }

    #[tokio::test]
    async fn double_attach_leaves_one_session_and_enables_once() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-1");
        proto.set_url(&target, "http://a.com/page").await;
        let manager = manager_with(proto.clone());

        manager.attach(&target).await;
        manager.attach(&target).await;

        assert!(manager.is_attached(&target).await);
        assert_eq!(manager.attached_targets().await.len(), 1);
        assert_eq!(proto.attach_calls.load(Ordering::SeqCst), 1);
        assert_eq!(proto.enable_runtime_calls.load(Ordering::SeqCst), 1);
        assert_eq!(proto.enable_log_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_http_targets_are_skipped_silently() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-settings");
        proto.set_url(&target, "chrome://settings").await;
        let manager = manager_with(proto.clone());

        manager.attach(&target).await;

        assert!(!manager.is_attached(&target).await);
        assert_eq!(proto.attach_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn enable_failure_leaves_target_unattached() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-1");
        proto.set_url(&target, "https://a.com").await;
        proto.fail_enable_log.store(true, Ordering::SeqCst);
        let manager = manager_with(proto.clone());

        manager.attach(&target).await;

        assert!(!manager.is_attached(&target).await);
        // The half-open session was rolled back.
        assert_eq!(proto.detach_calls.load(Ordering::SeqCst), 1);

        // A later re-trigger succeeds once the failure clears.
        proto.fail_enable_log.store(false, Ordering::SeqCst);
        manager.attach(&target).await;
        assert!(manager.is_attached(&target).await);
    }

    #[tokio::test]
    async fn detach_on_detached_target_issues_no_protocol_call() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-1");
        let manager = manager_with(proto.clone());

        manager.detach(&target).await;

        assert_eq!(proto.detach_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn target_removal_forces_detach() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-1");
        proto.set_url(&target, "http://a.com").await;
        let manager = manager_with(proto.clone());

        manager.attach(&target).await;
        manager.on_target_removed(&target).await;

        assert!(!manager.is_attached(&target).await);
        assert_eq!(proto.detach_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn protocol_detach_drops_membership_without_detach_call() {
        let proto = Arc::new(FakeProtocol::new());
        let target = TargetId::new("tab-1");
        proto.set_url(&target, "http://a.com").await;
        let manager = manager_with(proto.clone());

        manager.attach(&target).await;
        manager.on_protocol_detached(&target).await;

        assert!(!manager.is_attached(&target).await);
        assert_eq!(proto.detach_calls.load(Ordering::SeqCst), 0);
    }
}
