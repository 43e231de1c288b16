//! # MamaGuide Memory
//!
//! Local persistence in a single SQLite file (`~/.mamaguide/mamaguide.db`):
//! - preferences (key/value), including the due date
//! - the symptom log

pub mod pregnancy;
pub mod sqlite;
pub mod symptom_log;

pub use pregnancy::current_week;
pub use sqlite::SqliteStore;
pub use symptom_log::{NewSymptomLog, SymptomLogEntry, SymptomSeverity};
