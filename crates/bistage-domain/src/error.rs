use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::RuntimeFamily;

/// Failure raised by a staging phase. Every variant names its family, and
/// the per-version variants name the channel that failed, so the driver can
/// report exactly where a run stopped.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{family} build failed for {channel}: {detail}")]
    Build {
        family: RuntimeFamily,
        channel: String,
        detail: String,
    },

    #[error("{family} install failed for {channel}: {detail}")]
    Install {
        family: RuntimeFamily,
        channel: String,
        detail: String,
    },

    /// The generated module could not be deleted for a reason other than
    /// absence. Left in place it would shadow the regenerated module the
    /// later packaging step writes, so this is never downgraded.
    #[error("could not strip generated module {} from the {family} build tree", .path.display())]
    ArtifactRemoval {
        family: RuntimeFamily,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Two versions of one family wrote different contents into the shared
    /// build tree; the later version would silently win otherwise.
    #[error("{family} output for {channel} does not match {previous}: {}", summarize(.paths))]
    Inconsistent {
        family: RuntimeFamily,
        previous: String,
        channel: String,
        paths: Vec<PathBuf>,
    },
}

fn summarize(paths: &[PathBuf]) -> String {
    match paths {
        [] => "no differing paths recorded".to_string(),
        [only] => only.display().to_string(),
        [first, rest @ ..] => format!("{} (+{} more)", first.display(), rest.len()),
    }
}
