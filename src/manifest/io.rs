//! Saving and loading the restore manifest.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::data::{Manifest, MANIFEST_VERSION};

/// Manifest wrapped with a checksum of its compact JSON.
#[derive(Debug, Serialize, Deserialize)]
struct ManifestEnvelope {
    /// SHA256 checksum of the compact manifest JSON.
    checksum: String,
    /// The manifest itself.
    manifest: Manifest,
}

fn checksum_of(manifest: &Manifest) -> Result<String> {
    let compact = serde_json::to_string(manifest)
        .context("Failed to serialize manifest for checksum calculation")?;
    let mut hasher = Sha256::new();
    hasher.update(compact.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl Manifest {
    /// Serialize with an integrity checksum, pretty printed.
    pub fn to_json(&self) -> Result<String> {
        let envelope = ManifestEnvelope {
            checksum: checksum_of(self)?,
            manifest: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).context("Failed to serialize manifest envelope")
    }

    /// Write the manifest to `path`.
    ///
    /// The file is written beside the target and renamed over it, so a
    /// crash never leaves a truncated manifest.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");

        let mut file = File::create(&tmp)
            .with_context(|| format!("Failed to create manifest file: {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("Failed to write manifest to: {}", tmp.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync manifest: {}", tmp.display()))?;
        drop(file);

        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace manifest: {}", path.display()))?;
        log::debug!("Saved manifest with {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Read a manifest and verify its checksum and version.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

        let envelope: ManifestEnvelope = serde_json::from_str(&content)
            .context("Failed to parse manifest. The file might be corrupted.")?;

        if checksum_of(&envelope.manifest)? != envelope.checksum {
            anyhow::bail!(
                "Manifest integrity check failed: checksum mismatch in {}",
                path.display()
            );
        }

        let manifest = envelope.manifest;
        if manifest.version != MANIFEST_VERSION {
            anyhow::bail!(
                "Unsupported manifest version: {}. Current version is {}.",
                manifest.version,
                MANIFEST_VERSION
            );
        }

        Ok(manifest)
    }

    /// Load the manifest for `quarantine_dir`, or start an empty one.
    pub fn load_or_new(quarantine_dir: &Path) -> Result<Self> {
        let path = Self::path_in(quarantine_dir);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::new(quarantine_dir))
        }
    }
}
