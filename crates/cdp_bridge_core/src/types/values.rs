use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A protocol-supplied descriptor for a value living in the target's runtime:
/// either an inline primitive, an explicit `undefined`, or an opaque object
/// handle with an optional human-readable description.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteObject {
    pub fn is_undefined(&self) -> bool {
        self.kind.as_deref() == Some("undefined")
    }

    pub fn is_function(&self) -> bool {
        self.kind.as_deref() == Some("function")
    }

    pub fn is_array(&self) -> bool {
        self.subtype.as_deref() == Some("array")
    }
}

/// One own property of a remote object, as returned by the protocol's
/// property enumeration call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: Option<RemoteObject>,
    #[serde(default)]
    pub enumerable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub exception: Option<RemoteObject>,
    #[serde(default)]
    pub stack_trace: Option<Value>,
}

/// A browser-level log entry (deprecations, violations, network warnings).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_level() -> String {
    "log".to_string()
}
