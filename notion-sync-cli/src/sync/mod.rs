//! Sheet → Notion upsert sync
//!
//! Cell values are normalized per column rule, mapped onto the database's
//! declared property types, and upserted one row at a time keyed by the
//! unique-key column.

pub mod images;
pub mod normalize;
pub mod orchestrator;
pub mod properties;
pub mod report;
pub mod thumbnail;

pub use orchestrator::SyncRunner;
pub use report::{RowStatus, SyncReport};
