//! File actions module.
//!
//! This module provides functionality for:
//! - Relocating duplicate copies into the quarantine directory
//! - Restoring quarantined files from the manifest
//!
//! Nothing here deletes a file whose content does not exist elsewhere:
//! a source is only removed after a rename, or after a verified copy.
//!
//! ```no_run
//! use wechat_dedup::actions::QuarantineMover;
//! use std::path::Path;
//!
//! let mover = QuarantineMover::create(Path::new("/home/me/WeChat-Duplicates"));
//! ```

pub mod quarantine;
pub mod restore;

pub use quarantine::{
    is_cross_device_error, reserve_destination, suffixed_name, MoveBatch, MoveError, MoverStats,
    QuarantineEntry, QuarantineMover,
};
pub use restore::{restore_entry, restore_manifest, RestoreOutcome};
