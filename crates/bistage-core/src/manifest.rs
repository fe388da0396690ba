use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use bistage_domain::{RuntimeFamily, RuntimeVersion};

/// On-disk record of the versions last built into a family tree. The
/// install phase replays this set so installs target exactly what was
/// built, even when host discovery changed in between.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct VersionManifest {
    family: RuntimeFamily,
    channels: Vec<String>,
}

impl VersionManifest {
    pub(crate) fn record(
        path: &Path,
        family: RuntimeFamily,
        versions: &[RuntimeVersion],
    ) -> Result<()> {
        let manifest = Self {
            family,
            channels: versions
                .iter()
                .map(|version| version.channel().to_string())
                .collect(),
        };
        let contents = serde_json::to_string_pretty(&manifest)
            .context("failed to serialize version manifest")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(path, contents + "\n")
            .with_context(|| format!("failed to write version manifest at {}", path.display()))
    }

    /// Loads the recorded version set, or `None` when no manifest exists.
    /// A manifest recorded for a different family is rejected.
    pub(crate) fn load(path: &Path, family: RuntimeFamily) -> Result<Option<Vec<RuntimeVersion>>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read version manifest at {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&contents)
            .with_context(|| format!("invalid version manifest at {}", path.display()))?;
        if manifest.family != family {
            bail!(
                "version manifest at {} belongs to {}",
                path.display(),
                manifest.family
            );
        }
        let mut versions = Vec::with_capacity(manifest.channels.len());
        for channel in &manifest.channels {
            versions.push(RuntimeVersion::new(family, channel)?);
        }
        Ok(Some(versions))
    }
}
