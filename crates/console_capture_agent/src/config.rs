use std::time::Duration;

/// Delivery settings for the report pipeline.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Collection endpoints tried in order until one accepts.
    pub endpoints: Vec<String>,
    /// Fixed interval between background drain attempts.
    pub flush_interval: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:3201/report".to_string()],
            flush_interval: Duration::from_secs(2),
        }
    }
}

impl ReportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let endpoints = std::env::var("REPORT_ENDPOINTS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.endpoints);

        let flush_interval = std::env::var("REPORT_FLUSH_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);

        Self {
            endpoints,
            flush_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert_eq!(config.endpoints, vec!["http://127.0.0.1:3201/report"]);
        assert_eq!(config.flush_interval, Duration::from_secs(2));
    }
}
