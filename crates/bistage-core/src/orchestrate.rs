use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use bistage_domain::{RuntimeFamily, StageLayout};

use crate::build::build_family;
use crate::context::CommandContext;
use crate::discovery;
use crate::install::install_family;
use crate::manifest::VersionManifest;
use crate::outcome::{ExecutionOutcome, StageUserError};

/// Filesystem layout options for one invocation, as received from the
/// driver. Relative paths are resolved against the current directory
/// before any collaborator runs.
#[derive(Clone, Debug)]
pub struct StageRequest {
    pub source_tree: PathBuf,
    pub build_base: PathBuf,
    pub legacy_root: PathBuf,
    pub modern_root: PathBuf,
    pub artifact: Option<PathBuf>,
}

/// Runs the build half of the lifecycle: discover versions per family,
/// build each family into its shared tree, and record what was built.
///
/// # Errors
/// Returns an error if any per-version build fails or the manifest
/// cannot be written; operator mistakes come back as a `UserError`
/// outcome instead.
pub fn run_build_phase(ctx: &CommandContext, request: &StageRequest) -> Result<ExecutionOutcome> {
    let layout = match resolve_layout(request, true) {
        Ok(layout) => layout,
        Err(err) => match err.downcast::<StageUserError>() {
            Ok(user) => return Ok(ExecutionOutcome::user_error(user.message, user.details)),
            Err(err) => return Err(err),
        },
    };

    let mut families = Vec::new();
    let mut phrases = Vec::new();
    for family in RuntimeFamily::ALL {
        let versions = discovery::discover(ctx, family);
        if !versions.is_empty() {
            // Invalidate the previous record before touching the tree; it
            // is re-recorded only after every version builds.
            remove_path(&layout.version_manifest(family))?;
        }
        let report = build_family(ctx.compiler(), &layout, family, &versions)?;
        if !versions.is_empty() {
            VersionManifest::record(&layout.version_manifest(family), family, &versions)?;
        }
        if let Some(phrase) = family_phrase(family, &report.channels) {
            phrases.push(phrase);
        }
        families.push(json!({
            "family": family.to_string(),
            "channels": report.channels,
            "tree": report.tree.display().to_string(),
            "pruned": report.pruned,
        }));
    }

    let message = if phrases.is_empty() {
        "no interpreters discovered; nothing to build".to_string()
    } else {
        format!("built {}", phrases.join("; "))
    };
    info!(%message, "build phase finished");
    Ok(ExecutionOutcome::success(message, json!({ "families": families })))
}

/// Runs the install half of the lifecycle. Versions recorded by the
/// build phase take precedence over fresh discovery so the installs
/// always match the staged trees.
///
/// # Errors
/// Returns an error if any per-version install fails or a manifest is
/// unreadable.
pub fn run_install_phase(ctx: &CommandContext, request: &StageRequest) -> Result<ExecutionOutcome> {
    let layout = match resolve_layout(request, true) {
        Ok(layout) => layout,
        Err(err) => match err.downcast::<StageUserError>() {
            Ok(user) => return Ok(ExecutionOutcome::user_error(user.message, user.details)),
            Err(err) => return Err(err),
        },
    };

    let mut families = Vec::new();
    let mut phrases = Vec::new();
    for family in RuntimeFamily::ALL {
        let recorded = VersionManifest::load(&layout.version_manifest(family), family)?;
        let from_manifest = recorded.is_some();
        let versions = match recorded {
            Some(versions) => versions,
            None => discovery::discover(ctx, family),
        };
        install_family(ctx.installer(), &layout, family, &versions)?;
        let channels: Vec<String> = versions
            .iter()
            .map(|version| version.channel().to_string())
            .collect();
        if let Some(phrase) = family_phrase(family, &channels) {
            phrases.push(phrase);
        }
        families.push(json!({
            "family": family.to_string(),
            "channels": channels,
            "root": layout.dest_root(family).display().to_string(),
            "recorded": from_manifest,
        }));
    }

    let message = if phrases.is_empty() {
        "no interpreters discovered; nothing to install".to_string()
    } else {
        format!("installed {}", phrases.join("; "))
    };
    info!(%message, "install phase finished");
    Ok(ExecutionOutcome::success(message, json!({ "families": families })))
}

/// Drops everything the build phase staged: both family trees and their
/// version manifests. Destination roots are left alone.
///
/// # Errors
/// Returns an error if a staged path exists but cannot be removed.
pub fn run_clean(request: &StageRequest) -> Result<ExecutionOutcome> {
    let layout = match resolve_layout(request, false) {
        Ok(layout) => layout,
        Err(err) => match err.downcast::<StageUserError>() {
            Ok(user) => return Ok(ExecutionOutcome::user_error(user.message, user.details)),
            Err(err) => return Err(err),
        },
    };

    let mut removed = Vec::new();
    for family in RuntimeFamily::ALL {
        for path in [layout.build_tree(family), layout.version_manifest(family)] {
            if remove_path(&path)? {
                removed.push(path.display().to_string());
            }
        }
    }

    let message = if removed.is_empty() {
        "nothing to clean".to_string()
    } else {
        format!("removed {} staged path(s)", removed.len())
    };
    Ok(ExecutionOutcome::success(message, json!({ "removed": removed })))
}

/// Reports the versions each family would stage right now.
pub fn run_versions(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let mut families = Vec::new();
    let mut phrases = Vec::new();
    for family in RuntimeFamily::ALL {
        let versions = discovery::discover(ctx, family);
        let channels: Vec<String> = versions
            .iter()
            .map(|version| version.channel().to_string())
            .collect();
        if let Some(phrase) = family_phrase(family, &channels) {
            phrases.push(phrase);
        }
        families.push(json!({
            "family": family.to_string(),
            "channels": channels,
        }));
    }
    let message = if phrases.is_empty() {
        "no interpreters discovered".to_string()
    } else {
        format!("discovered {}", phrases.join("; "))
    };
    Ok(ExecutionOutcome::success(message, json!({ "families": families })))
}

fn family_phrase(family: RuntimeFamily, channels: &[String]) -> Option<String> {
    if channels.is_empty() {
        None
    } else {
        Some(format!("{family} {}", channels.join(", ")))
    }
}

/// Absolutizes the request paths and checks the operator-facing
/// preconditions. Collaborators run with the source tree as their
/// working directory, so every path they receive must be absolute.
fn resolve_layout(request: &StageRequest, require_source: bool) -> Result<StageLayout> {
    let source_tree = absolutize(&request.source_tree)?;
    let legacy_root = absolutize(&request.legacy_root)?;
    let modern_root = absolutize(&request.modern_root)?;
    if legacy_root == modern_root {
        return Err(StageUserError::new(
            format!(
                "legacy and modern destination roots are both {}",
                legacy_root.display()
            ),
            json!({ "root": legacy_root.display().to_string() }),
        )
        .into());
    }
    if require_source && !source_tree.is_dir() {
        return Err(StageUserError::new(
            format!("source tree {} does not exist", source_tree.display()),
            json!({ "source_tree": source_tree.display().to_string() }),
        )
        .into());
    }
    let layout = StageLayout::new(
        source_tree,
        absolutize(&request.build_base)?,
        legacy_root,
        modern_root,
    )?;
    Ok(match &request.artifact {
        Some(rel) => match layout.with_artifact(rel) {
            Ok(layout) => layout,
            Err(err) => {
                return Err(StageUserError::new(
                    format!("{err:#}"),
                    json!({ "artifact": rel.display().to_string() }),
                )
                .into())
            }
        },
        None => layout,
    })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("failed to resolve current directory")?;
    Ok(cwd.join(path))
}

fn remove_path(path: &Path) -> Result<bool> {
    let removal = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removal {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}
