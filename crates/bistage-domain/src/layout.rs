use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

use crate::RuntimeFamily;

/// Layout token handed to the install collaborator. Selects the packaging
/// filesystem convention instead of the interpreter's default layout.
pub const INSTALL_LAYOUT: &str = "deb";

/// Filesystem plan for one staging run: where the package sources live,
/// where each family's shared build tree goes, and where each family's
/// install lands.
#[derive(Clone, Debug)]
pub struct StageLayout {
    source_tree: PathBuf,
    build_base: PathBuf,
    legacy_root: PathBuf,
    modern_root: PathBuf,
    artifact: Option<PathBuf>,
}

impl StageLayout {
    /// The two destination roots must differ; families never share one.
    pub fn new(
        source_tree: impl Into<PathBuf>,
        build_base: impl Into<PathBuf>,
        legacy_root: impl Into<PathBuf>,
        modern_root: impl Into<PathBuf>,
    ) -> Result<Self> {
        let legacy_root = legacy_root.into();
        let modern_root = modern_root.into();
        if legacy_root == modern_root {
            bail!(
                "destination roots must be distinct per family (both are {})",
                legacy_root.display()
            );
        }
        Ok(Self {
            source_tree: source_tree.into(),
            build_base: build_base.into(),
            legacy_root,
            modern_root,
            artifact: None,
        })
    }

    /// Registers the generated module stripped after every per-version
    /// build, as a path relative to the build tree root. Absolute paths
    /// and components that climb out of the tree are rejected.
    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Result<Self> {
        let artifact = artifact.into();
        let plain = artifact.components().all(|part| matches!(part, Component::Normal(_)));
        if artifact.as_os_str().is_empty() || !plain {
            bail!(
                "generated module path must stay inside the build tree: {}",
                artifact.display()
            );
        }
        self.artifact = Some(artifact);
        Ok(self)
    }

    #[must_use]
    pub fn source_tree(&self) -> &Path {
        &self.source_tree
    }

    #[must_use]
    pub fn build_base(&self) -> &Path {
        &self.build_base
    }

    /// The family's shared purelib tree under the build base. Every version
    /// of the family builds into this one tree.
    #[must_use]
    pub fn build_tree(&self, family: RuntimeFamily) -> PathBuf {
        self.build_base.join(family.dir_name())
    }

    /// Sidecar manifest recording the versions last built into the family
    /// tree. Lives beside the tree, never inside it, so the install
    /// collaborator cannot copy it into a destination root.
    #[must_use]
    pub fn version_manifest(&self, family: RuntimeFamily) -> PathBuf {
        self.build_base
            .join(format!("{}.versions.json", family.dir_name()))
    }

    #[must_use]
    pub fn dest_root(&self, family: RuntimeFamily) -> &Path {
        match family {
            RuntimeFamily::Legacy => &self.legacy_root,
            RuntimeFamily::Modern => &self.modern_root,
        }
    }

    /// Relative path of the generated module, when one is configured.
    #[must_use]
    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    /// Absolute location of the generated module inside a family's tree.
    #[must_use]
    pub fn artifact_in_tree(&self, family: RuntimeFamily) -> Option<PathBuf> {
        self.artifact
            .as_ref()
            .map(|rel| self.build_tree(family).join(rel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StageLayout {
        StageLayout::new("pkg", "build", "dist/py2", "dist/py3")
            .unwrap()
            .with_artifact("mysql/__init__.py")
            .unwrap()
    }

    #[test]
    fn family_paths_never_collide() {
        let layout = layout();
        assert_ne!(
            layout.build_tree(RuntimeFamily::Legacy),
            layout.build_tree(RuntimeFamily::Modern)
        );
        assert_ne!(
            layout.dest_root(RuntimeFamily::Legacy),
            layout.dest_root(RuntimeFamily::Modern)
        );
        assert_ne!(
            layout.version_manifest(RuntimeFamily::Legacy),
            layout.version_manifest(RuntimeFamily::Modern)
        );
    }

    #[test]
    fn manifest_sits_beside_the_tree_not_inside() {
        let layout = layout();
        for family in RuntimeFamily::ALL {
            let manifest = layout.version_manifest(family);
            assert!(!manifest.starts_with(layout.build_tree(family)));
            assert!(manifest.starts_with(layout.build_base()));
        }
    }

    #[test]
    fn artifact_resolves_under_the_family_tree() {
        let layout = layout();
        let path = layout.artifact_in_tree(RuntimeFamily::Legacy).unwrap();
        assert_eq!(
            path,
            Path::new("build").join("py2").join("mysql/__init__.py")
        );
    }

    #[test]
    fn shared_destination_roots_are_rejected() {
        assert!(StageLayout::new("pkg", "build", "dist", "dist").is_err());
    }

    #[test]
    fn artifact_that_leaves_the_tree_is_rejected() {
        let base = StageLayout::new("pkg", "build", "dist/py2", "dist/py3").unwrap();
        assert!(base.clone().with_artifact("../outside.py").is_err());
        assert!(base.clone().with_artifact("/etc/module.py").is_err());
        assert!(base.clone().with_artifact("pkg/../../outside.py").is_err());
        assert!(base.clone().with_artifact("").is_err());
        assert!(base.with_artifact("pkg/__init__.py").is_ok());
    }
}
