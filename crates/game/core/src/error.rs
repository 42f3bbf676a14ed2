//! Snapshot construction errors.
//!
//! Note the narrow scope: once a snapshot exists, the tactical engine has
//! no error channel at all. Rejection is a sentinel utility and bad
//! lookups degrade to worst-case danger. Errors exist only where snapshots
//! are assembled from the outside world.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    /// The actor roster is at capacity; the sensed actor was dropped.
    #[error("actor roster full ({capacity} slots)")]
    RosterFull { capacity: usize },

    /// A race template id referenced a slot outside the template table.
    #[error("unknown race id {0}")]
    UnknownRace(u16),
}
