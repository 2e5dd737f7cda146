//! Keyed, append-only retention of rendered log lines.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;

use crate::config::KeyMatchPolicy;

/// The two keys derived for every record: precise and origin-wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// origin + path, trailing separator stripped, query/fragment dropped.
    pub full: String,
    /// scheme + host (+ non-default port).
    pub origin: String,
}

/// Derive the store keys for a URL. Deterministic and idempotent:
/// `derive_keys(k.full).full == k.full` for every derivable URL.
pub fn derive_keys(url_string: &str) -> StoreKeys {
    let candidate = if url_string.starts_with("http://") || url_string.starts_with("https://") {
        url_string.to_string()
    } else {
        format!("http://{url_string}")
    };

    match Url::parse(&candidate) {
        Ok(parsed) if parsed.has_host() => {
            let origin = parsed.origin().ascii_serialization();
            let path = parsed.path().trim_end_matches('/');
            StoreKeys {
                full: format!("{origin}{path}"),
                origin,
            }
        }
        _ => {
            tracing::debug!("failed to parse URL for key derivation: {url_string}");
            let normalized = url_string.trim_end_matches('/').to_string();
            StoreKeys {
                full: normalized.clone(),
                origin: normalized,
            }
        }
    }
}

/// Render a record to its stored line: `[LEVEL] arg arg ...`. Strings pass
/// through, other JSON values are compactly encoded.
pub fn format_line(method: &str, args: &Value) -> String {
    let method = if method.is_empty() { "log" } else { method };
    let rendered = match args {
        Value::Array(items) => items
            .iter()
            .map(stringify_arg)
            .collect::<Vec<_>>()
            .join(" "),
        other => stringify_arg(other),
    };
    format!("[{}] {rendered}", method.to_uppercase())
}

fn stringify_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// In-memory keyed store. Append-only except for explicit clears; no TTL,
/// no capacity bound. The mutex makes the read-and-clear path on queries a
/// real critical section, so a concurrent append is never lost.
#[derive(Default)]
pub struct LogStore {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one incoming record under its derived keys (once per distinct
    /// key). Returns the rendered line for logging.
    pub async fn append_report(&self, url: &str, method: &str, args: &Value) -> String {
        let line = format_line(method, args);
        let keys = derive_keys(url);

        let mut entries = self.entries.lock().await;
        // A root URL derives identical keys; store the line once.
        if keys.full != keys.origin {
            entries.entry(keys.full).or_default().push(line.clone());
        }
        entries.entry(keys.origin).or_default().push(line.clone());
        line
    }

    pub async fn lines_for(&self, key: &str) -> Vec<String> {
        let entries = self.entries.lock().await;
        entries.get(key).cloned().unwrap_or_default()
    }

    pub async fn clear(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
    }

    pub async fn key_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Resolve all lines matching `url` under the given policy, optionally
    /// clearing the matched entries. Lookup and clear happen under one lock
    /// acquisition.
    pub async fn query(&self, url: &str, policy: KeyMatchPolicy, clear: bool) -> Vec<String> {
        let keys = derive_keys(url);
        let mut entries = self.entries.lock().await;

        match policy {
            KeyMatchPolicy::ExactWithOriginFallback => {
                let matched = [&keys.full, &keys.origin]
                    .into_iter()
                    .find(|key| entries.get(*key).is_some_and(|lines| !lines.is_empty()));
                let Some(matched) = matched else {
                    return Vec::new();
                };

                let lines = entries.get(matched).cloned().unwrap_or_default();
                if clear {
                    entries.remove(&keys.full);
                    entries.remove(&keys.origin);
                }
                lines
            }
            KeyMatchPolicy::OriginSubstring => {
                let mut matched: Vec<String> = entries
                    .keys()
                    .filter(|key| key.contains(&keys.origin))
                    .cloned()
                    .collect();
                matched.sort();

                let mut lines = Vec::new();
                for key in &matched {
                    lines.extend(entries.get(key).cloned().unwrap_or_default());
                }
                if clear {
                    for key in &matched {
                        entries.remove(key);
                    }
                }
                lines
            }
        }
    }
}
