//! Touch Engine - Element tree and per-tick snapshots.
//!
//! - Registry: [`Scene`], the arena-backed element tree touches are routed through
//! - Snapshot: [`FrameSnapshot`] / [`SnapshotPool`], the throwaway copy walks enumerate
//!
//! # Architecture
//!
//! Elements are NOT objects. They are generational indices into an arena:
//!
//! ```text
//! #0v0: root   (pre=[],    post=[#1, #2])
//! #1v0: panel  (pre=[],    post=[#3])      interaction + cover area
//! #2v0: popup  (pre=[],    post=[])        painted above #1
//! #3v0: button (pre=[],    post=[])        interaction area
//! ```
//!
//! Dispatch never walks the live arena directly; it walks a snapshot and
//! re-reads live state per node.

mod registry;
mod snapshot;

pub use registry::*;
pub use snapshot::*;
