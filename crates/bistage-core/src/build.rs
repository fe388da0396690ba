use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use bistage_domain::{RuntimeFamily, RuntimeVersion, StageError, StageLayout};

use crate::effects::{CompileRequest, Compiler};
use crate::tree::{self, TreeSnapshot};

/// What one family build produced, for reporting.
#[derive(Debug)]
pub(crate) struct FamilyBuild {
    pub(crate) tree: PathBuf,
    pub(crate) channels: Vec<String>,
    pub(crate) pruned: usize,
}

/// Builds every version of a family into the family's shared tree,
/// stripping the generated module after each compile and verifying that
/// successive versions produce identical output.
///
/// The first compile failure aborts the family; later versions are not
/// attempted.
pub(crate) fn build_family(
    compiler: &dyn Compiler,
    layout: &StageLayout,
    family: RuntimeFamily,
    versions: &[RuntimeVersion],
) -> Result<FamilyBuild> {
    let tree = layout.build_tree(family);
    if versions.is_empty() {
        debug!(family = %family, "no versions to build; leaving tree untouched");
        return Ok(FamilyBuild {
            tree,
            channels: Vec::new(),
            pruned: 0,
        });
    }

    tree::reset_tree(&tree)?;
    let mut pruned = 0;
    let mut previous: Option<(String, TreeSnapshot)> = None;
    for version in versions {
        info!(family = %family, channel = %version, "building");
        let request = CompileRequest {
            version,
            source_tree: layout.source_tree(),
            build_base: layout.build_base(),
            purelib: &tree,
        };
        let output = match compiler.compile(&request) {
            Ok(output) => output,
            Err(err) => {
                return Err(StageError::Build {
                    family,
                    channel: version.channel().to_string(),
                    detail: format!("{err:#}"),
                }
                .into())
            }
        };
        if output.code != 0 {
            return Err(StageError::Build {
                family,
                channel: version.channel().to_string(),
                detail: output.failure_detail(),
            }
            .into());
        }
        if let Some(artifact) = layout.artifact_in_tree(family) {
            if tree::remove_generated_artifact(family, &artifact)? {
                pruned += 1;
                debug!(family = %family, path = %artifact.display(), "stripped generated module");
            }
        }
        let snapshot = tree::snapshot_tree(&tree, layout.artifact())?;
        if let Some((previous_channel, previous_snapshot)) = &previous {
            let diverged = tree::diff_snapshots(previous_snapshot, &snapshot);
            if !diverged.is_empty() {
                return Err(StageError::Inconsistent {
                    family,
                    previous: previous_channel.clone(),
                    channel: version.channel().to_string(),
                    paths: diverged,
                }
                .into());
            }
        }
        previous = Some((version.channel().to_string(), snapshot));
    }

    Ok(FamilyBuild {
        tree,
        channels: versions
            .iter()
            .map(|version| version.channel().to_string())
            .collect(),
        pruned,
    })
}
