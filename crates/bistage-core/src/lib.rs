#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod build;
mod config;
mod context;
mod discovery;
mod effects;
mod install;
mod manifest;
mod orchestrate;
mod outcome;
mod process;
#[cfg(test)]
mod testing;
mod tree;

pub use crate::config::{Config, LEGACY_VERSIONS_ENV, MODERN_VERSIONS_ENV};
pub use crate::context::CommandContext;
pub use crate::effects::{
    CompileRequest, Compiler, Effects, InstallRequest, Installer, SharedEffects, SystemEffects,
    VersionLister,
};
pub use crate::orchestrate::{
    run_build_phase, run_clean, run_install_phase, run_versions, StageRequest,
};
pub use crate::outcome::{to_json_response, CommandStatus, ExecutionOutcome, StageUserError};
pub use crate::process::RunOutput;
