//! The event-to-notification pipeline.

pub mod event_loop;
pub mod matcher;
pub mod processor;
pub mod recorder;

pub use event_loop::EventLoop;
pub use matcher::RuleMatcher;
pub use processor::{EventProcessor, ProcessError, ProcessOutcome};
pub use recorder::{NotificationRecorder, RecorderError};
