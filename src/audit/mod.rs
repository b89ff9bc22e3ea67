//! Audit journal for Encore
//!
//! Records every export, restore and prune run from the command line in an
//! append-only, line-delimited JSON file (`audit.log`).
//!
//! # Example
//!
//! ```rust,ignore
//! use encore::audit::{AuditEntry, AuditLogger, Operation};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! let entry = AuditEntry::succeeded(
//!     Operation::Export,
//!     selection.sections(),
//!     report.destination.clone(),
//!     report.summary(),
//! );
//! logger.log(&entry)?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, Operation, Outcome};
pub use logger::AuditLogger;
