//! Data models for sheetsync

mod change_record;
mod edit_event;
mod outcome;
mod readiness;

pub use change_record::{ChangeRecord, RecordId};
pub use edit_event::{parse_a1, EditEvent, PlatformEditEvent, PlatformRange};
pub use outcome::RecordOutcome;
pub use readiness::{GateError, NotReadyReason, Readiness};
