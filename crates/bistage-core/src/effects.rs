use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use which::which;

use bistage_domain::{RuntimeFamily, RuntimeVersion};

use crate::process::{run_command, run_command_streaming, RunOutput};

/// Inputs for one per-version compile invocation.
#[derive(Debug)]
pub struct CompileRequest<'a> {
    pub version: &'a RuntimeVersion,
    pub source_tree: &'a Path,
    pub build_base: &'a Path,
    pub purelib: &'a Path,
}

/// Inputs for one per-version install invocation. `skip_build` and
/// `layout` are fixed by the dispatcher; they are carried here so fakes
/// can observe what the collaborator was told.
#[derive(Debug)]
pub struct InstallRequest<'a> {
    pub version: &'a RuntimeVersion,
    pub source_tree: &'a Path,
    pub build_base: &'a Path,
    pub build_tree: &'a Path,
    pub dest_root: &'a Path,
    pub skip_build: bool,
    pub layout: &'a str,
}

pub trait VersionLister: Send + Sync {
    /// Raw version tokens for a family, in the host's order. A missing
    /// listing helper means the family is absent and yields an empty
    /// list, not an error.
    fn list(&self, family: RuntimeFamily) -> Result<Vec<String>>;
}

pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<RunOutput>;
}

pub trait Installer: Send + Sync {
    fn install(&self, request: &InstallRequest<'_>) -> Result<RunOutput>;
}

/// The capabilities a staging run needs from the outside world.
pub trait Effects: Send + Sync {
    fn lister(&self) -> &dyn VersionLister;
    fn compiler(&self) -> &dyn Compiler;
    fn installer(&self) -> &dyn Installer;
}

pub type SharedEffects = Arc<dyn Effects>;

/// Production wiring: shells out to the host's listing helpers and
/// interpreters.
pub struct SystemEffects {
    lister: SystemVersionLister,
    toolchain: SystemToolchain,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self::with_streaming(false)
    }

    /// Forward collaborator output to the operator instead of only
    /// capturing it.
    #[must_use]
    pub fn with_streaming(stream: bool) -> Self {
        Self {
            lister: SystemVersionLister,
            toolchain: SystemToolchain { stream },
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn lister(&self) -> &dyn VersionLister {
        &self.lister
    }

    fn compiler(&self) -> &dyn Compiler {
        &self.toolchain
    }

    fn installer(&self) -> &dyn Installer {
        &self.toolchain
    }
}

struct SystemVersionLister;

impl VersionLister for SystemVersionLister {
    fn list(&self, family: RuntimeFamily) -> Result<Vec<String>> {
        let helper = family.lister_command();
        let Ok(helper_path) = which(helper) else {
            debug!(family = %family, helper, "listing helper not on PATH; no versions");
            return Ok(Vec::new());
        };
        let helper_path = helper_path
            .into_os_string()
            .into_string()
            .map_err(|raw| anyhow::anyhow!("helper path is not valid UTF-8: {raw:?}"))?;
        let output = run_command(&helper_path, &["-i".to_string()], Path::new("."))?;
        if output.code != 0 {
            debug!(
                family = %family,
                helper,
                code = output.code,
                "listing helper reported no versions"
            );
            return Ok(Vec::new());
        }
        Ok(output
            .stdout
            .split_whitespace()
            .map(ToString::to_string)
            .collect())
    }
}

struct SystemToolchain {
    stream: bool,
}

impl SystemToolchain {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        debug!(program, args = ?args, cwd = %cwd.display(), "invoking collaborator");
        if self.stream {
            run_command_streaming(program, args, cwd)
        } else {
            run_command(program, args, cwd)
        }
    }
}

impl Compiler for SystemToolchain {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<RunOutput> {
        let args = vec![
            "setup.py".to_string(),
            "build".to_string(),
            "--build-base".to_string(),
            request.build_base.display().to_string(),
            "--build-purelib".to_string(),
            request.purelib.display().to_string(),
        ];
        self.run(&request.version.interpreter(), &args, request.source_tree)
    }
}

impl Installer for SystemToolchain {
    fn install(&self, request: &InstallRequest<'_>) -> Result<RunOutput> {
        // The leading build command only re-declares the paths that
        // --skip-build will reuse; nothing is rebuilt.
        let mut args = vec![
            "setup.py".to_string(),
            "build".to_string(),
            "--build-base".to_string(),
            request.build_base.display().to_string(),
            "--build-purelib".to_string(),
            request.build_tree.display().to_string(),
            "install".to_string(),
        ];
        if request.skip_build {
            args.push("--skip-build".to_string());
        }
        args.push(format!("--install-layout={}", request.layout));
        args.push(format!("--root={}", request.dest_root.display()));
        self.run(&request.version.interpreter(), &args, request.source_tree)
    }
}
