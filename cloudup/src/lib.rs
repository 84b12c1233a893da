//! `cloudup` - upload a local directory tree to a destination root.
//!
//! The binary wires command-line arguments into the engine in the `common`
//! crate: discovery, a priority-then-shuffled scheduling policy, a bounded
//! worker pool with completion-order result collection, and an
//! ignore-failures verdict at the end.
//!
//! ```bash
//! # upload a tree with the defaults (16 workers, 4 priority files)
//! cloudup -s /data/staging -d /mnt/archive/staging --summary
//!
//! # fail the whole job on the first broken file, never replace anything
//! cloudup -s src -d dest --overwrite false --ignore-failures false
//! ```

pub mod path;
