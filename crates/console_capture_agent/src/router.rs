//! Dispatch of inbound protocol events into normalized log records.

use std::sync::Arc;

use serde_json::{json, Value};

use cdp_bridge_core::types::{ExceptionDetails, LogEntry, TargetEvent};
use cdp_bridge_core::{DebuggerProtocol, TargetId};

use crate::attach::AttachmentManager;
use crate::queue::{DeliveryQueue, LogRecord};
use crate::render::render_remote_value;

pub struct EventRouter {
    protocol: Arc<dyn DebuggerProtocol>,
    manager: Arc<AttachmentManager>,
    queue: Arc<DeliveryQueue>,
}

impl EventRouter {
    pub fn new(
        protocol: Arc<dyn DebuggerProtocol>,
        manager: Arc<AttachmentManager>,
        queue: Arc<DeliveryQueue>,
    ) -> Self {
        Self {
            protocol,
            manager,
            queue,
        }
    }

    /// Single inbound handler for the protocol event stream. Events for
    /// targets no longer attached are dropped (guards against detach races).
    pub async fn on_protocol_event(&self, target: &TargetId, event: TargetEvent) {
        if let TargetEvent::Detached { reason } = &event {
            tracing::debug!(target_id = %target, "protocol detached session: {reason}");
            self.manager.on_protocol_detached(target).await;
            return;
        }

        if !self.manager.is_attached(target).await {
            return;
        }

        // Best-effort re-fetch of the target's current URL; transcription
        // continues with an empty source on failure.
        let source_url = self
            .protocol
            .target_url(target)
            .await
            .unwrap_or_default();

        let record = match event {
            TargetEvent::ConsoleApiCalled { kind, args } => {
                // Arguments are rendered sequentially so remote round trips
                // never interleave within one record.
                let mut rendered = Vec::with_capacity(args.len());
                for arg in &args {
                    rendered.push(render_remote_value(self.protocol.as_ref(), target, arg).await);
                }
                LogRecord {
                    level: kind,
                    args: rendered,
                    source_url,
                }
            }
            TargetEvent::ExceptionThrown { details } => LogRecord {
                level: "error".to_string(),
                args: vec![exception_arg(&details)],
                source_url,
            },
            TargetEvent::LogEntryAdded { entry } => LogRecord {
                args: log_entry_args(&entry, &source_url),
                level: entry.level,
                source_url,
            },
            TargetEvent::Detached { .. } => return,
        };

        self.queue.enqueue(record).await;
    }
}

fn exception_arg(details: &ExceptionDetails) -> Value {
    let message = details
        .exception
        .as_ref()
        .and_then(|e| e.description.clone())
        .unwrap_or_else(|| details.text.clone());
    json!({
        "exception": message,
        "stack": details.stack_trace.clone().unwrap_or(Value::Null),
    })
}

fn log_entry_args(entry: &LogEntry, fallback_url: &str) -> Vec<Value> {
    let url = entry.url.clone().unwrap_or_else(|| fallback_url.to_string());
    vec![
        Value::String(entry.text.clone()),
        json!({ "source": entry.source, "url": url }),
    ]
}
