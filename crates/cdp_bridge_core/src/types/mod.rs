pub mod events;
pub mod values;

pub use events::TargetEvent;
pub use values::{ExceptionDetails, LogEntry, PropertyDescriptor, RemoteObject};
