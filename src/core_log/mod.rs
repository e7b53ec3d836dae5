pub mod events;
pub mod logger;

pub use events::{EventSink, SessionEvent};
pub use logger::LogSink;
