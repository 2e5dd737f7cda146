//! The query protocol endpoint: `POST /mcp`, JSON-RPC 2.0.
//!
//! Supported methods: `initialize`, `notifications/initialized`,
//! `prompts/list`, `tools/list`, and `tools/call` dispatching to the two
//! retrieval tools. Malformed envelopes and unknown methods/tools get
//! structured error responses; nothing here can crash the process.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::AppContext;

const ERROR_INVALID_REQUEST: i64 = -32600;
const ERROR_METHOD_NOT_FOUND: i64 = -32601;
const ERROR_INVALID_PARAMS: i64 = -32602;

const TOOL_READ_ACTIVE_CONSOLE: &str = "readActiveConsole";
const TOOL_READ_ERRORS_ONLY: &str = "readErrorsOnly";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub async fn handle_mcp(
    State(ctx): State<Arc<AppContext>>,
    Json(request): Json<RpcRequest>,
) -> Response {
    let (status, body) = dispatch(&ctx, request).await;
    match body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}

pub async fn dispatch(ctx: &AppContext, request: RpcRequest) -> (StatusCode, Option<Value>) {
    let id = request.id.unwrap_or(Value::Null);

    if request.jsonrpc.as_deref() != Some("2.0") {
        return (
            StatusCode::BAD_REQUEST,
            Some(rpc_error(id, ERROR_INVALID_REQUEST, "Invalid Request")),
        );
    }

    match request.method.as_deref() {
        Some("initialize") => (StatusCode::OK, Some(rpc_result(id, initialize_result()))),
        Some("notifications/initialized") => (StatusCode::NO_CONTENT, None),
        Some("prompts/list") => (
            StatusCode::OK,
            Some(rpc_result(id, json!({ "prompts": [] }))),
        ),
        Some("tools/list") => (
            StatusCode::OK,
            Some(rpc_result(id, json!({ "tools": tool_descriptors() }))),
        ),
        Some("tools/call") => call_tool(ctx, id, request.params).await,
        Some(other) => {
            tracing::debug!("unknown rpc method: {other}");
            (
                StatusCode::NOT_FOUND,
                Some(rpc_error(id, ERROR_METHOD_NOT_FOUND, "Method not found")),
            )
        }
        None => (
            StatusCode::NOT_FOUND,
            Some(rpc_error(id, ERROR_METHOD_NOT_FOUND, "Method not found")),
        ),
    }
}

async fn call_tool(
    ctx: &AppContext,
    id: Value,
    params: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let params = params.unwrap_or(Value::Null);
    let name = params.get("name").and_then(Value::as_str).unwrap_or("");
    let url = params
        .get("arguments")
        .and_then(|args| args.get("url"))
        .and_then(Value::as_str);

    match name {
        TOOL_READ_ACTIVE_CONSOLE => {
            let Some(url) = url else {
                return invalid_params(id);
            };
            let lines = ctx
                .store
                .query(url, ctx.config.match_policy, ctx.config.clear_on_read)
                .await;
            let text = if lines.is_empty() {
                format!(
                    "No console logs have been captured for {url}. \
                     Make sure you have visited the page."
                )
            } else {
                lines.join("\n")
            };
            (StatusCode::OK, Some(rpc_result(id, tool_text(text))))
        }
        TOOL_READ_ERRORS_ONLY => {
            let Some(url) = url else {
                return invalid_params(id);
            };
            // Same key matching as the active-console read, never clearing.
            let lines = ctx.store.query(url, ctx.config.match_policy, false).await;
            let filtered: Vec<String> = lines
                .into_iter()
                .filter(|line| line.starts_with("[ERROR]") || line.starts_with("[WARNING]"))
                .collect();
            let text = if filtered.is_empty() {
                format!("No errors or warnings have been captured for {url}.")
            } else {
                filtered.join("\n")
            };
            (StatusCode::OK, Some(rpc_result(id, tool_text(text))))
        }
        other => {
            tracing::debug!("unknown tool requested: {other}");
            (
                StatusCode::NOT_FOUND,
                Some(rpc_error(
                    id,
                    ERROR_METHOD_NOT_FOUND,
                    format!("Unknown tool: {other}"),
                )),
            )
        }
    }
}

fn invalid_params(id: Value) -> (StatusCode, Option<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Some(rpc_error(
            id,
            ERROR_INVALID_PARAMS,
            "Missing required argument: url",
        )),
    )
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": "2025-06-18",
        "serverInfo": {
            "name": "console_mcp_server",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Query interface over captured browser console output."
        },
        "capabilities": {
            "prompts": { "enabled": true },
            "tools": { "enabled": true },
            "resources": { "enabled": false }
        }
    })
}

fn tool_descriptors() -> Value {
    json!([
        {
            "name": TOOL_READ_ACTIVE_CONSOLE,
            "description": "Retrieves recently captured console output from a specific URL.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The full URL." }
                },
                "required": ["url"]
            }
        },
        {
            "name": TOOL_READ_ERRORS_ONLY,
            "description": "Retrieves only console errors and warnings from a specific URL.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "description": "The full URL." }
                },
                "required": ["url"]
            }
        }
    ])
}

fn tool_text(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

fn rpc_result(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn rpc_error(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}
