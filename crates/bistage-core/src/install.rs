use anyhow::Result;
use tracing::{debug, info};

use bistage_domain::{RuntimeFamily, RuntimeVersion, StageError, StageLayout, INSTALL_LAYOUT};

use crate::effects::{InstallRequest, Installer};

/// Installs every version of a family out of the family's shared tree
/// into that family's destination root. Builds are never re-run here;
/// the collaborator is always told to reuse the staged tree.
///
/// The first install failure aborts the family.
pub(crate) fn install_family(
    installer: &dyn Installer,
    layout: &StageLayout,
    family: RuntimeFamily,
    versions: &[RuntimeVersion],
) -> Result<usize> {
    if versions.is_empty() {
        debug!(family = %family, "no versions to install");
        return Ok(0);
    }
    let tree = layout.build_tree(family);
    let dest_root = layout.dest_root(family);
    for version in versions {
        info!(
            family = %family,
            channel = %version,
            root = %dest_root.display(),
            "installing"
        );
        let request = InstallRequest {
            version,
            source_tree: layout.source_tree(),
            build_base: layout.build_base(),
            build_tree: &tree,
            dest_root,
            skip_build: true,
            layout: INSTALL_LAYOUT,
        };
        let output = match installer.install(&request) {
            Ok(output) => output,
            Err(err) => {
                return Err(StageError::Install {
                    family,
                    channel: version.channel().to_string(),
                    detail: format!("{err:#}"),
                }
                .into())
            }
        };
        if output.code != 0 {
            return Err(StageError::Install {
                family,
                channel: version.channel().to_string(),
                detail: output.failure_detail(),
            }
            .into());
        }
    }
    Ok(versions.len())
}
