//! Selective backup and restore for Encore
//!
//! Exports any subset of the persisted stores into a single versioned
//! snapshot and restores any subset of a snapshot back into the stores.
//!
//! # Architecture
//!
//! - `Section` / `Selection`: the closed catalog of backup sections
//! - `StoreAdapter`: full-export and full-replace access to one store
//! - `codec`: snapshot <-> bytes, with per-version decoders
//! - `StorageSink`: where the bytes go (file, memory)
//! - `BackupEngine`: export, restore and inspect over a `StoreSet`
//! - `BackupArchive`: dated snapshot files in the backup directory
//!
//! # Snapshot Format
//!
//! Snapshots are JSON objects:
//! - `formatVersion`: positive integer, required
//! - `exportedAtEpochMillis`: export time in epoch milliseconds
//! - one optional array per section, keyed by the section key
//!
//! A section key that is missing means the section was not exported and a
//! restore leaves that store alone. An empty array means the store was empty
//! and a restore clears it.
//!
//! # Example
//!
//! ```rust,ignore
//! use encore::backup::{BackupEngine, FileSink, Selection, StoreSet};
//!
//! let engine = BackupEngine::new(StoreSet::from_storage(&storage));
//! let sink = FileSink::new("favorites.json");
//!
//! let selection = Selection::from_keys(["favorites", "lyrics"]);
//! engine.export(&selection, &sink)?;
//!
//! let report = engine.restore(&selection, &sink)?;
//! println!("{}", report.summary());
//! ```

pub mod adapter;
pub mod archive;
pub mod codec;
pub mod engine;
pub mod section;
pub mod sink;
pub mod snapshot;

pub use adapter::{Adapter, SectionStore, StoreAdapter, StoreSet};
pub use archive::{ArchiveEntry, BackupArchive};
pub use codec::{decode, encode, DecodedSnapshot, CURRENT_FORMAT_VERSION};
pub use engine::{
    BackupEngine, CancelToken, ExportReport, RestoreReport, SectionState, SnapshotSummary,
};
pub use section::{all_sections, default_selection, Section, Selection};
pub use sink::{FileSink, MemorySink, StorageSink};
pub use snapshot::{SectionRecord, SectionRecords, Snapshot};
