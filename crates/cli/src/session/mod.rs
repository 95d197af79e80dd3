//! Session bookkeeping: liveness episodes, command and model history, export/import.

#[cfg(test)]
mod tests;

mod record;
mod repository;
mod tracker;

pub use record::{CommandEntry, ModelEntry, SessionExport, SessionHistory, SessionInfo, SessionRecord};
pub use repository::SessionRepository;
pub use tracker::SessionTracker;
