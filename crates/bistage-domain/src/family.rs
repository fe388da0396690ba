use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two incompatible CPython generations a package is staged for.
///
/// Artifacts for different families never share a build tree or a
/// destination root; every path the layout hands out is keyed by family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeFamily {
    #[serde(rename = "python2")]
    Legacy,
    #[serde(rename = "python3")]
    Modern,
}

impl RuntimeFamily {
    /// Processing order for a full run: legacy first, then modern.
    pub const ALL: [RuntimeFamily; 2] = [RuntimeFamily::Legacy, RuntimeFamily::Modern];

    /// Major component every channel of this family must carry.
    #[must_use]
    pub fn major(self) -> u64 {
        match self {
            RuntimeFamily::Legacy => 2,
            RuntimeFamily::Modern => 3,
        }
    }

    /// Short name used for the family build tree and its version manifest.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            RuntimeFamily::Legacy => "py2",
            RuntimeFamily::Modern => "py3",
        }
    }

    /// Host helper that lists this family's installed interpreters.
    #[must_use]
    pub fn lister_command(self) -> &'static str {
        match self {
            RuntimeFamily::Legacy => "pyversions",
            RuntimeFamily::Modern => "py3versions",
        }
    }
}

impl fmt::Display for RuntimeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuntimeFamily::Legacy => "python2",
            RuntimeFamily::Modern => "python3",
        })
    }
}
