//! Link scanner.
//!
//! A scan walks the links below a root element, keeps the ones that qualify
//! as tracks and numbers them densely in document order. The result is an
//! immutable [`Snapshot`]; every scan produces a new one and the player only
//! ever looks at the latest.

mod debounce;
mod scan;
mod snapshot;

pub use debounce::Debouncer;
pub use scan::{LinkRules, LinkScanner, Reconciled, reconcile};
pub use snapshot::{Snapshot, SnapshotDiff, TrackDescriptor};
