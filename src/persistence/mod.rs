//! Storage of rules and notifications.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::PersistenceError;
pub use sqlite::SqliteStateRepository;
pub use traits::AppRepository;
