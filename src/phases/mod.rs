//! Implementation of the phases of a reconciliation run.
//!
//! ## Overview
//!
//! A run follows 6 phases:
//! 1. Discovery - Find fragments, decode their names, group and load them
//! 2. Alignment - Pair each translated fragment with its original
//! 3. Merging - Combine pairs into bilingual per-theme aggregates
//! 4. Tree Building - Fold aggregates into the nested corpus tree
//! 5. Writing to Disk - Persist staged aggregates and the corpus atomically
//! 6. Bookkeeping - Archive merged fragments, stage copies, prune aggregates
//!
//! The coverage audit samples counts after phase 2 and after phase 4; see
//! [`crate::audit`]. Phases 1 to 4 are synchronous and deterministic: the
//! same fragments always give byte-identical output.

pub mod alignment;
pub mod archive;
pub mod building;
pub mod discovery;
pub mod merging;
pub mod orchestrator;
pub mod write;

pub use alignment as phase2;
pub use archive as phase6;
pub use building as phase4;
pub use discovery as phase1;
pub use merging as phase3;
pub use write as phase5;

pub use alignment::{apply_renames, Matcher};
pub use building::TreeBuilder;
pub use discovery::{Catalog, FragmentGroup, LoadedFragment};
pub use merging::Merger;
