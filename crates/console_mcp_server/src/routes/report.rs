//! The collection endpoint: `POST /report`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
}

/// Accept one rendered log record and retain it under both derived keys.
/// A missing `url` is rejected before any state mutation.
pub async fn submit_report(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ReportBody>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let Some(url) = body.url.filter(|u| !u.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "Missing url"));
    };

    let method = body.method.unwrap_or_else(|| "log".to_string());
    let args = body.args.unwrap_or(Value::Null);

    let line = ctx.store.append_report(&url, &method, &args).await;
    tracing::debug!("stored log for {url}: {line}");

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use serde_json::json;

    fn ctx() -> Arc<AppContext> {
        Arc::new(AppContext::new(ServerConfig::default()))
    }

    #[tokio::test]
    async fn report_without_url_is_rejected_without_mutation() {
        let ctx = ctx();
        let body: ReportBody =
            serde_json::from_value(json!({ "method": "log", "args": ["x"] })).unwrap();

        let result = submit_report(State(ctx.clone()), Json(body)).await;

        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
        assert_eq!(ctx.store.key_count().await, 0);
    }

    #[tokio::test]
    async fn report_is_appended_under_both_keys() {
        let ctx = ctx();
        let body: ReportBody = serde_json::from_value(json!({
            "url": "http://a.com/page",
            "method": "error",
            "args": ["boom"]
        }))
        .unwrap();

        let status = submit_report(State(ctx.clone()), Json(body)).await.unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            ctx.store.lines_for("http://a.com/page").await,
            vec!["[ERROR] boom"]
        );
        assert_eq!(ctx.store.lines_for("http://a.com").await, vec!["[ERROR] boom"]);
    }

    #[tokio::test]
    async fn missing_method_defaults_to_log() {
        let ctx = ctx();
        let body: ReportBody =
            serde_json::from_value(json!({ "url": "http://a.com", "args": ["hi"] })).unwrap();

        submit_report(State(ctx.clone()), Json(body)).await.unwrap();

        assert_eq!(ctx.store.lines_for("http://a.com").await, vec!["[LOG] hi"]);
    }
}
