use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CdpConfig {
    /// HTTP endpoint of the browser's remote debugging port.
    pub endpoint: String,
    /// Debugger protocol version issued on attach.
    pub protocol_version: String,
    pub timeout: Duration,
}

impl Default for CdpConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9222".to_string(),
            protocol_version: "1.3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl CdpConfig {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
        .with_timeout(timeout)
    }

    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoint = std::env::var("CDP_ENDPOINT").unwrap_or(defaults.endpoint);

        let protocol_version =
            std::env::var("CDP_PROTOCOL_VERSION").unwrap_or(defaults.protocol_version);

        let timeout = std::env::var("CDP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);

        Self {
            endpoint,
            protocol_version,
            timeout,
        }
    }
}
