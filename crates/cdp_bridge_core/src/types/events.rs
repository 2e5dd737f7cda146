use serde::Deserialize;
use serde_json::Value;

use super::values::{ExceptionDetails, LogEntry, RemoteObject};

/// Typed protocol events consumed by the capture pipeline. Everything the
/// browser pushes over an attached session is decoded into one of these
/// variants; unrecognized methods are dropped at the session layer.
#[derive(Debug, Clone)]
pub enum TargetEvent {
    /// A console API invocation inside the page (`console.log` and friends).
    ConsoleApiCalled { kind: String, args: Vec<RemoteObject> },
    /// An uncaught exception in the page.
    ExceptionThrown { details: ExceptionDetails },
    /// A browser-level log entry (deprecation, violation, network warning).
    LogEntryAdded { entry: LogEntry },
    /// The protocol layer detached the session (target closed, devtools
    /// opened, socket dropped). Membership must be removed without issuing
    /// a detach call.
    Detached { reason: String },
}

#[derive(Debug, Deserialize)]
struct ConsoleApiParams {
    #[serde(rename = "type", default = "default_console_kind")]
    kind: String,
    #[serde(default)]
    args: Vec<RemoteObject>,
}

fn default_console_kind() -> String {
    "log".to_string()
}

#[derive(Debug, Deserialize)]
struct ExceptionParams {
    #[serde(rename = "exceptionDetails", default)]
    exception_details: ExceptionDetails,
}

#[derive(Debug, Deserialize)]
struct LogEntryParams {
    entry: LogEntry,
}

#[derive(Debug, Deserialize)]
struct DetachedParams {
    #[serde(default)]
    reason: String,
}

impl TargetEvent {
    /// Decode a raw protocol event frame. Returns `None` for methods the
    /// pipeline does not consume or for payloads that fail to decode.
    pub fn decode(method: &str, params: Value) -> Option<Self> {
        match method {
            "Runtime.consoleAPICalled" => {
                let p: ConsoleApiParams = serde_json::from_value(params).ok()?;
                Some(Self::ConsoleApiCalled {
                    kind: p.kind,
                    args: p.args,
                })
            }
            "Runtime.exceptionThrown" => {
                let p: ExceptionParams = serde_json::from_value(params).ok()?;
                Some(Self::ExceptionThrown {
                    details: p.exception_details,
                })
            }
            "Log.entryAdded" => {
                let p: LogEntryParams = serde_json::from_value(params).ok()?;
                Some(Self::LogEntryAdded { entry: p.entry })
            }
            "Inspector.detached" => {
                let p: DetachedParams = serde_json::from_value(params).unwrap_or(DetachedParams {
                    reason: String::new(),
                });
                Some(Self::Detached { reason: p.reason })
            }
            _ => None,
        }
    }
}
