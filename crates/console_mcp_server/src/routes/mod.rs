//! HTTP surface: the collection endpoint and the query protocol endpoint.

pub mod mcp;
pub mod report;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::post;
use axum::Router;
use tracing::info;

use crate::AppContext;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/report", post(report::submit_report))
        .route("/mcp", post(mcp::handle_mcp))
        .with_state(ctx)
}

pub async fn start_server(ctx: Arc<AppContext>) -> Result<()> {
    let addr: SocketAddr = ctx.config.bind_addr.parse()?;
    let router = build_router(ctx);

    info!("console MCP server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
