//! Console MCP Server
//!
//! Collection service for captured browser console output: accepts rendered
//! log records on `/report`, retains them in a keyed in-memory store, and
//! exposes MCP-style retrieval tools over a JSON-RPC endpoint at `/mcp`.

pub mod config;
pub mod routes;
pub mod store;

pub use config::{KeyMatchPolicy, ServerConfig};
pub use store::LogStore;

/// Process-wide state shared by all routes: constructed once in `main` and
/// handed to the router, never ambient.
pub struct AppContext {
    pub store: LogStore,
    pub config: ServerConfig,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            store: LogStore::new(),
            config,
        }
    }
}
