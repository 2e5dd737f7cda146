//! Ordered, retrying delivery of log records to the collection service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::ReportConfig;

/// A normalized console/exception/log event, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub level: String,
    pub args: Vec<Value>,
    pub source_url: String,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("no collection endpoint accepted the record")]
    Unavailable,
}

/// Where drained records go. One call covers a full delivery attempt; a
/// returned error means the record must stay at the head of the queue.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn deliver(&self, record: &LogRecord) -> Result<(), SinkError>;
}

/// POSTs records as `{url, method, args}` report bodies, trying each
/// configured endpoint in order until one accepts.
pub struct HttpReportSink {
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl HttpReportSink {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn deliver(&self, record: &LogRecord) -> Result<(), SinkError> {
        let body = json!({
            "url": record.source_url,
            "method": record.level,
            "args": record.args,
        });

        for endpoint in &self.endpoints {
            match self.client.post(endpoint).json(&body).send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    tracing::debug!("endpoint {endpoint} answered {}", response.status());
                }
                Err(e) => {
                    tracing::debug!("endpoint {endpoint} unreachable: {e}");
                }
            }
        }

        Err(SinkError::Unavailable)
    }
}

/// FIFO buffer between the event router and the collection service.
///
/// Drain attempts run at most once at a time (the in-flight flag); a failed
/// head delivery stops the pass and leaves everything queued, to be retried
/// by the next enqueue or flush-timer tick. Retries are unbounded at a fixed
/// interval: ordering is guaranteed at the cost of head-of-line blocking.
pub struct DeliveryQueue {
    sink: Arc<dyn ReportSink>,
    queue: Mutex<VecDeque<LogRecord>>,
    draining: AtomicBool,
}

impl DeliveryQueue {
    pub fn new(sink: Arc<dyn ReportSink>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        })
    }

    pub async fn enqueue(&self, record: LogRecord) {
        {
            let mut queue = self.queue.lock().await;
            queue.push_back(record);
        }
        self.drain().await;
    }

    /// Deliver queued records head-first. Re-entrant-safe: a second trigger
    /// while a drain is in flight is a no-op, the running pass picks up
    /// whatever was enqueued meanwhile.
    pub async fn drain(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }

        loop {
            let head = {
                let queue = self.queue.lock().await;
                queue.front().cloned()
            };
            let Some(record) = head else {
                break;
            };

            match self.sink.deliver(&record).await {
                Ok(()) => {
                    let mut queue = self.queue.lock().await;
                    queue.pop_front();
                }
                Err(e) => {
                    tracing::debug!("delivery failed, record stays queued: {e}");
                    break;
                }
            }
        }

        // A record enqueued between the empty-head check and this store is
        // missed by this pass; the flush timer's next drain picks it up.
        self.draining.store(false, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn the periodic re-trigger that retries stalled deliveries.
    pub fn run_flush_timer(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.drain().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Records deliveries; fails the first `fail_first` attempts.
    struct FlakySink {
        delivered: Mutex<Vec<LogRecord>>,
        fail_first: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl FlakySink {
        fn failing(fail_first: usize) -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
                fail_first: AtomicUsize::new(fail_first),
                attempts: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ReportSink for FlakySink {
        async fn deliver(&self, record: &LogRecord) -> Result<(), SinkError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.fail_first.load(Ordering::SeqCst) {
                return Err(SinkError::Unavailable);
            }
            self.delivered.lock().await.push(record.clone());
            Ok(())
        }
    }

    fn record(level: &str, marker: &str) -> LogRecord {
        LogRecord {
            level: level.to_string(),
            args: vec![json!(marker)],
            source_url: "http://a.com/page".to_string(),
        }
    }

    #[tokio::test]
    async fn order_preserved_across_simulated_outage() {
        // First three attempts fail: the head stalls through several drain
        // triggers while e2/e3 pile up behind it.
        let sink = FlakySink::failing(3);
        let queue = DeliveryQueue::new(sink.clone());

        queue.enqueue(record("log", "e1")).await;
        queue.enqueue(record("log", "e2")).await;
        queue.enqueue(record("log", "e3")).await;
        assert_eq!(queue.len().await, 3);

        // Timer-style re-triggers; the fourth attempt starts succeeding.
        queue.drain().await;
        queue.drain().await;

        assert!(queue.is_empty().await);
        let delivered = sink.delivered.lock().await;
        let markers: Vec<&Value> = delivered.iter().map(|r| &r.args[0]).collect();
        assert_eq!(markers, vec![&json!("e1"), &json!("e2"), &json!("e3")]);
    }

    #[tokio::test]
    async fn failed_head_stays_queued() {
        let sink = FlakySink::failing(usize::MAX);
        let queue = DeliveryQueue::new(sink);

        queue.enqueue(record("error", "boom")).await;
        queue.drain().await;
        queue.drain().await;

        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn drain_on_empty_queue_is_a_noop() {
        let sink = FlakySink::failing(0);
        let queue = DeliveryQueue::new(sink.clone());
        queue.drain().await;
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 0);
    }

    /// Minimal one-shot HTTP responder used to exercise the real sink.
    async fn accepting_endpoint() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0_u8; 4096];
                let _ = stream.read(&mut buf).await;
                let _ = stream
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
            }
        });
        (format!("http://{addr}/report"), handle)
    }

    #[tokio::test]
    async fn http_sink_fails_over_to_next_endpoint() {
        let (live, handle) = accepting_endpoint().await;
        // Port 9 (discard) is near-certainly closed; connection is refused.
        let config = ReportConfig {
            endpoints: vec!["http://127.0.0.1:9/report".to_string(), live],
            ..ReportConfig::default()
        };
        let sink = HttpReportSink::new(&config);

        sink.deliver(&record("log", "e1"))
            .await
            .expect("second endpoint should accept");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn http_sink_errors_when_all_endpoints_unreachable() {
        let config = ReportConfig {
            endpoints: vec![
                "http://127.0.0.1:9/report".to_string(),
                "http://127.0.0.1:10/report".to_string(),
            ],
            ..ReportConfig::default()
        };
        let sink = HttpReportSink::new(&config);

        let err = sink.deliver(&record("log", "e1")).await.unwrap_err();
        assert!(matches!(err, SinkError::Unavailable));
    }
}
