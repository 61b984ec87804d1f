//! Restore manifest for quarantined files.
//!
//! Every completed relocation is appended to `quarantine-manifest.json` in
//! the quarantine directory, so a later `restore` can put each file back
//! where it was found.
//!
//! # Architecture
//!
//! * [`data`]: Serializable manifest and entry models.
//! * [`io`]: Saving and loading with a SHA-256 integrity envelope.

pub mod data;
pub mod io;

pub use data::{
    Manifest, ManifestEntry, MANIFEST_FILE_NAME, MANIFEST_TMP_FILE_NAME, MANIFEST_VERSION,
};
