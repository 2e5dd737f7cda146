use std::sync::Arc;

use console_mcp_server::routes;
use console_mcp_server::{AppContext, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    tracing::info!(
        addr = %config.bind_addr,
        policy = ?config.match_policy,
        clear_on_read = config.clear_on_read,
        "starting console collection server"
    );

    let ctx = Arc::new(AppContext::new(config));
    routes::start_server(ctx).await
}
