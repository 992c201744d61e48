//! # Corpus Reconciliation Library
//!
//! This library reconciles a two-language document corpus that is split into
//! numbered fragment files and translated piecemeal. It locates fragments,
//! aligns each translated fragment with its original even when numbering has
//! drifted, merges the two language tracks into bilingual publication
//! records, and rebuilds the nested corpus tree from the merged records. It
//! is used by the `corpus-reconcile` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use corpus_reconcile::config::CorpusConfig;
//! use corpus_reconcile::model::{FragmentDoc, Publication, ThemeRecords};
//! use corpus_reconcile::phases::building;
//! use corpus_reconcile::visit;
//!
//! let config = CorpusConfig::default();
//! let doc = FragmentDoc {
//!     volume: "3.信仰編".to_string(),
//!     theme_name: "信仰".to_string(),
//!     publications: vec![
//!         Publication { title: "A".to_string(), ..Default::default() },
//!         Publication { title: "A".to_string(), ..Default::default() },
//!         Publication { title: "B".to_string(), ..Default::default() },
//!     ],
//!     ..Default::default()
//! };
//!
//! let corpus = building::build(&config.volume_names, vec![ThemeRecords::from_doc(doc)]);
//! let counts = visit::count(&corpus);
//! assert_eq!(counts.title_groups, 2);
//! assert_eq!(counts.publications, 3);
//! ```
//!
//! ## Core Concepts
//!
//! - **Configuration (`config`)**: the explicit [`config::CorpusConfig`]
//!   record handed to every component.
//! - **Model (`model`, `visit`)**: fragment documents, publications and the
//!   Corpus/Volume/Theme/TitleGroup tree, with a visitor over the tree.
//! - **Phases (`phases`)**: discovery, alignment, merging, tree building,
//!   atomic writing and directory bookkeeping.
//! - **Audit (`audit`)**: recoverable diagnostics and the coverage report
//!   that gates archival.
//! - **Staging (`filesystem`)**: an in-memory area where outputs are staged
//!   before anything touches the disk, which is what makes dry runs possible.
//!
//! ## Execution Flow
//!
//! [`phases::orchestrator::execute_merge`] runs a full reconciliation:
//!
//! 1.  **Discovery**: Scan the working directory and group fragments by key.
//! 2.  **Alignment**: Match every translated fragment with an original.
//! 3.  **Merging**: Build one bilingual aggregate per group.
//! 4.  **Tree Building**: Rebuild the corpus from every aggregate.
//! 5.  **Disk Output**: Atomically write aggregates and the corpus.
//! 6.  **Archive** (optional): Move merged fragments to the backup directories.

pub mod audit;
pub mod config;
pub mod defaults;
pub mod error;
pub mod filesystem;
pub mod model;
pub mod output;
pub mod phases;
pub mod scoring;
pub mod translate;
pub mod visit;
