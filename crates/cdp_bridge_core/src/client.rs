use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::types::{PropertyDescriptor, TargetEvent};
use crate::{CdpConfig, CdpError, DebuggerProtocol, Result, TargetId};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Capacity of the shared protocol event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A target entry from the browser's `/json/list` discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    pub fn target_id(&self) -> TargetId {
        TargetId::new(&self.id)
    }
}

/// One live WebSocket debugging session for a single target. Commands are
/// JSON frames `{id, method, params}`; responses are matched back to pending
/// callers by id, events are forwarded to the shared pipeline channel.
struct CdpSession {
    writer: Mutex<WsSink>,
    pending: PendingMap,
    next_id: AtomicU64,
    reader_task: JoinHandle<()>,
}

impl CdpSession {
    fn spawn(
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        target: TargetId,
        events: mpsc::Sender<(TargetId, TargetEvent)>,
    ) -> Self {
        let (writer, reader) = stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = tokio::spawn(reader_loop(reader, pending.clone(), target, events));

        Self {
            writer: Mutex::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            reader_task,
        }
    }

    async fn send_command(
        &self,
        method: &str,
        params: Value,
        wait_timeout: std::time::Duration,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let body = serde_json::to_string(&frame)?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::Text(body)).await {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                return Err(e.into());
            }
        }

        let response = match timeout(wait_timeout, rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => {
                return Err(CdpError::InvalidResponse(format!(
                    "session closed while waiting for '{method}'"
                )));
            }
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                return Err(CdpError::Timeout(wait_timeout));
            }
        };

        if let Some(error) = response.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown protocol error");
            return Err(CdpError::protocol(code, message));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn shutdown(&self) {
        {
            let mut writer = self.writer.lock().await;
            let _ = writer.send(Message::Close(None)).await;
        }
        self.reader_task.abort();
    }
}

/// What a single inbound socket frame means to the session.
enum Frame {
    Response { id: u64, payload: Value },
    Event { method: String, params: Value },
    Other,
}

fn classify_frame(payload: Value) -> Frame {
    if let Some(id) = payload.get("id").and_then(Value::as_u64) {
        return Frame::Response { id, payload };
    }
    if let Some(method) = payload.get("method").and_then(Value::as_str) {
        let method = method.to_string();
        let params = payload.get("params").cloned().unwrap_or(Value::Null);
        return Frame::Event { method, params };
    }
    Frame::Other
}

async fn reader_loop(
    mut reader: WsSource,
    pending: PendingMap,
    target: TargetId,
    events: mpsc::Sender<(TargetId, TargetEvent)>,
) {
    while let Some(message) = reader.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(target_id = %target, "session socket error: {e}");
                break;
            }
        };

        let payload: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(target_id = %target, "undecodable protocol frame: {e}");
                continue;
            }
        };

        match classify_frame(payload) {
            Frame::Response { id, payload } => {
                let mut pending_map = pending.lock().await;
                if let Some(tx) = pending_map.remove(&id) {
                    let _ = tx.send(payload);
                }
            }
            Frame::Event { method, params } => {
                if let Some(event) = TargetEvent::decode(&method, params) {
                    if events.send((target.clone(), event)).await.is_err() {
                        break;
                    }
                } else {
                    tracing::trace!(target_id = %target, "ignoring protocol event {method}");
                }
            }
            Frame::Other => {}
        }
    }

    // The socket is gone; surface it as a protocol-initiated detach so the
    // attachment manager can drop membership without a detach call.
    let _ = events
        .send((
            target.clone(),
            TargetEvent::Detached {
                reason: "connection_closed".to_string(),
            },
        ))
        .await;
}

/// Live `DebuggerProtocol` implementation over a browser's remote debugging
/// port: target discovery via the HTTP endpoint, one WebSocket session per
/// attached target, events funneled into a single channel.
pub struct CdpBrowser {
    config: CdpConfig,
    http_client: reqwest::Client,
    sessions: Mutex<HashMap<TargetId, Arc<CdpSession>>>,
    events_tx: mpsc::Sender<(TargetId, TargetEvent)>,
}

impl CdpBrowser {
    pub fn new(config: CdpConfig) -> (Self, mpsc::Receiver<(TargetId, TargetEvent)>) {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        (
            Self {
                config,
                http_client,
                sessions: Mutex::new(HashMap::new()),
                events_tx,
            },
            events_rx,
        )
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }

    /// List the browser's current debuggable targets.
    pub async fn discover_targets(&self) -> Result<Vec<TargetInfo>> {
        let url = format!("{}/json/list", self.config.endpoint.trim_end_matches('/'));
        let response = self.http_client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(CdpError::InvalidResponse(format!(
                "HTTP error from discovery endpoint: {}",
                response.status()
            )));
        }

        Ok(response.json::<Vec<TargetInfo>>().await?)
    }

    async fn find_target(&self, target: &TargetId) -> Result<TargetInfo> {
        let targets = self.discover_targets().await?;
        targets
            .into_iter()
            .find(|t| t.id == target.as_str())
            .ok_or_else(|| CdpError::TargetNotFound(target.to_string()))
    }

    async fn session(&self, target: &TargetId) -> Result<Arc<CdpSession>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(target)
            .cloned()
            .ok_or_else(|| CdpError::NotAttached(target.to_string()))
    }

    async fn send_command(&self, target: &TargetId, method: &str, params: Value) -> Result<Value> {
        let session = self.session(target).await?;
        session
            .send_command(method, params, self.config.timeout)
            .await
    }
}

#[async_trait]
impl DebuggerProtocol for CdpBrowser {
    async fn attach(&self, target: &TargetId, protocol_version: &str) -> Result<()> {
        {
            let sessions = self.sessions.lock().await;
            if sessions.contains_key(target) {
                return Ok(());
            }
        }

        let info = self.find_target(target).await?;
        let ws_url = info.web_socket_debugger_url.ok_or_else(|| {
            CdpError::InvalidResponse(format!("target {target} has no debugger socket"))
        })?;

        tracing::debug!(target_id = %target, version = protocol_version, "attaching session at {ws_url}");
        let (stream, _) = connect_async(&ws_url).await?;
        let session = Arc::new(CdpSession::spawn(
            stream,
            target.clone(),
            self.events_tx.clone(),
        ));

        let mut sessions = self.sessions.lock().await;
        sessions.insert(target.clone(), session);
        Ok(())
    }

    async fn detach(&self, target: &TargetId) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(target)
        };

        if let Some(session) = session {
            session.shutdown().await;
        }
        Ok(())
    }

    async fn enable_runtime_events(&self, target: &TargetId) -> Result<()> {
        self.send_command(target, "Runtime.enable", json!({})).await?;
        Ok(())
    }

    async fn enable_log_events(&self, target: &TargetId) -> Result<()> {
        self.send_command(target, "Log.enable", json!({})).await?;
        Ok(())
    }

    async fn get_properties(
        &self,
        target: &TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>> {
        let result = self
            .send_command(
                target,
                "Runtime.getProperties",
                json!({
                    "objectId": object_id,
                    "ownProperties": true,
                }),
            )
            .await?;

        let properties = result
            .get("result")
            .cloned()
            .ok_or_else(|| {
                CdpError::InvalidResponse("getProperties response missing result array".into())
            })?;

        Ok(serde_json::from_value(properties)?)
    }

    async fn call_function_on(
        &self,
        target: &TargetId,
        object_id: &str,
        declaration: &str,
    ) -> Result<Value> {
        let result = self
            .send_command(
                target,
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id,
                    "functionDeclaration": declaration,
                    "returnByValue": true,
                }),
            )
            .await?;

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn target_url(&self, target: &TargetId) -> Result<String> {
        Ok(self.find_target(target).await?.url)
    }
}
