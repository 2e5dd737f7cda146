//! CDP Bridge Core
//!
//! A reusable async library for communicating with a remotely debuggable
//! browser over the Chrome DevTools Protocol (CDP). Provides structured
//! config, error handling, typed protocol events, and a per-target session
//! client used by the console capture pipeline.

pub mod config;
pub mod error;
pub mod client;
pub mod protocol;
pub mod types;

// Re-export commonly used types
pub use config::CdpConfig;
pub use error::CdpError;
pub use client::CdpBrowser;
pub use protocol::{DebuggerProtocol, TargetId};

/// Result type alias using CdpError
pub type Result<T> = std::result::Result<T, CdpError>;
