//! sheetsync-core - Core library for sheetsync
//!
//! Journals spreadsheet cell edits into a deduplicated hidden log and
//! answers whether a downstream batch sync may run: the journal must hold
//! changes and no edit may have landed within the inactivity window.

pub mod activity;
pub mod clock;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod gate;
pub mod journal;
pub mod lock;
pub mod models;
pub mod trigger;
pub mod util;
pub mod visibility;
pub mod workbook;

pub use context::JournalContext;
pub use error::{Error, Result};
pub use gate::SyncGate;
pub use journal::EditJournal;
pub use models::{ChangeRecord, EditEvent, PlatformEditEvent, Readiness, RecordId, RecordOutcome};
pub use trigger::EditTrigger;
pub use workbook::{LibSqlWorkbook, MemoryWorkbook, Workbook};
