//! Data models shared across the crate.

pub mod decoded_event;
pub mod log;
pub mod notification;
pub mod rule;

pub use decoded_event::{DecodedEvent, FieldValue};
pub use log::Log;
pub use notification::{NewNotification, Notification, NotificationStatus};
pub use rule::{AdapterKind, Rule, RuleConfig, RuleValidationError};
