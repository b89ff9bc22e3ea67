//! Encore - selective backup and restore for a music player's local data
//!
//! Exports any subset of the player's persisted stores (preferences,
//! favorites, cached lyrics, search history, transition rules) into one
//! versioned snapshot, and restores any subset of a snapshot back.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Path resolution and user settings
//! - `error`: Custom error types
//! - `models`: Record shapes for every backup section
//! - `storage`: JSON file stores
//! - `backup`: Section registry, adapters, snapshot codec, sinks and engine
//! - `audit`: Journal of backup operations
//! - `logging`: Diagnostic log setup
//! - `cli`: Command handlers for the `encore` binary
//!
//! # Example
//!
//! ```rust,ignore
//! use encore::backup::{BackupEngine, FileSink, Selection, StoreSet};
//! use encore::config::EncorePaths;
//! use encore::storage::Storage;
//!
//! let storage = Storage::new(EncorePaths::new()?)?;
//! storage.load_all()?;
//!
//! let engine = BackupEngine::new(StoreSet::from_storage(&storage));
//! engine.export(&Selection::all(), &FileSink::new("encore.json"))?;
//! ```

pub mod audit;
pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod storage;

pub use error::{BackupError, EncoreError};
