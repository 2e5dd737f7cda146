//! Console Capture Agent
//!
//! Attaches debugging sessions to browser targets, transcribes their console
//! and exception events into log records, and forwards the records to a
//! collection endpoint through an ordered, retrying delivery queue.

pub mod attach;
pub mod config;
pub mod queue;
pub mod render;
pub mod router;

#[cfg(test)]
pub(crate) mod testutil;

pub use attach::AttachmentManager;
pub use config::ReportConfig;
pub use queue::{DeliveryQueue, HttpReportSink, LogRecord, ReportSink};
pub use router::EventRouter;
