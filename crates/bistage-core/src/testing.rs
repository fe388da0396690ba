//! Shared fakes for exercising the staging phases without touching a
//! real Python toolchain.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;

use bistage_domain::{RuntimeFamily, StageLayout};

use crate::effects::{CompileRequest, Compiler, Effects, InstallRequest, Installer, VersionLister};
use crate::orchestrate::StageRequest;
use crate::process::RunOutput;

pub(crate) fn layout_in(root: &Path) -> StageLayout {
    StageLayout::new(
        root.join("src"),
        root.join("build"),
        root.join("dist").join("py2"),
        root.join("dist").join("py3"),
    )
    .unwrap()
}

pub(crate) fn request_in(root: &Path) -> StageRequest {
    let source_tree = root.join("src");
    fs::create_dir_all(&source_tree).unwrap();
    StageRequest {
        source_tree,
        build_base: root.join("build"),
        legacy_root: root.join("dist").join("py2"),
        modern_root: root.join("dist").join("py3"),
        artifact: None,
    }
}

fn ok_output() -> RunOutput {
    RunOutput {
        code: 0,
        stdout: String::new(),
        stderr: String::new(),
    }
}

fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[derive(Clone, Debug)]
pub(crate) struct CompileCall {
    pub(crate) channel: String,
    pub(crate) source_tree: PathBuf,
    pub(crate) build_base: PathBuf,
    pub(crate) purelib: PathBuf,
}

#[derive(Clone, Debug)]
pub(crate) struct InstallCall {
    pub(crate) channel: String,
    pub(crate) build_tree: PathBuf,
    pub(crate) dest_root: PathBuf,
    pub(crate) skip_build: bool,
    pub(crate) layout: String,
}

#[derive(Default)]
pub(crate) struct FakeLister {
    versions: HashMap<RuntimeFamily, Vec<String>>,
    errors: HashSet<RuntimeFamily>,
    calls: Mutex<usize>,
}

impl VersionLister for FakeLister {
    fn list(&self, family: RuntimeFamily) -> Result<Vec<String>> {
        *self.calls.lock().unwrap() += 1;
        if self.errors.contains(&family) {
            anyhow::bail!("listing helper exploded");
        }
        Ok(self.versions.get(&family).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub(crate) struct FakeCompiler {
    calls: Mutex<Vec<CompileCall>>,
    writes: Vec<(PathBuf, String)>,
    writes_for: Vec<(String, PathBuf, String)>,
    failures: HashMap<String, (i32, String)>,
}

impl Compiler for FakeCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<RunOutput> {
        let channel = request.version.channel().to_string();
        self.calls.lock().unwrap().push(CompileCall {
            channel: channel.clone(),
            source_tree: request.source_tree.to_path_buf(),
            build_base: request.build_base.to_path_buf(),
            purelib: request.purelib.to_path_buf(),
        });
        if let Some((code, stderr)) = self.failures.get(&channel) {
            return Ok(RunOutput {
                code: *code,
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }
        for (rel, contents) in &self.writes {
            write_file(&request.purelib.join(rel), contents);
        }
        for (for_channel, rel, contents) in &self.writes_for {
            if *for_channel == channel {
                write_file(&request.purelib.join(rel), contents);
            }
        }
        Ok(ok_output())
    }
}

#[derive(Default)]
pub(crate) struct FakeInstaller {
    calls: Mutex<Vec<InstallCall>>,
    failures: HashMap<String, (i32, String)>,
}

impl Installer for FakeInstaller {
    fn install(&self, request: &InstallRequest<'_>) -> Result<RunOutput> {
        let channel = request.version.channel().to_string();
        self.calls.lock().unwrap().push(InstallCall {
            channel: channel.clone(),
            build_tree: request.build_tree.to_path_buf(),
            dest_root: request.dest_root.to_path_buf(),
            skip_build: request.skip_build,
            layout: request.layout.to_string(),
        });
        if let Some((code, stderr)) = self.failures.get(&channel) {
            return Ok(RunOutput {
                code: *code,
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }
        Ok(ok_output())
    }
}

/// Recording stand-in for [`crate::effects::SystemEffects`]. Configure
/// with the builder methods, then inspect the recorded calls.
#[derive(Default)]
pub(crate) struct FakeEffects {
    lister: FakeLister,
    compiler: FakeCompiler,
    installer: FakeInstaller,
}

impl FakeEffects {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_versions(mut self, family: RuntimeFamily, tokens: &[&str]) -> Self {
        self.lister
            .versions
            .insert(family, tokens.iter().map(ToString::to_string).collect());
        self
    }

    pub(crate) fn with_lister_error(mut self, family: RuntimeFamily) -> Self {
        self.lister.errors.insert(family);
        self
    }

    /// Every compile writes `rel` (relative to the purelib tree).
    pub(crate) fn compile_writes(mut self, rel: &str, contents: &str) -> Self {
        self.compiler
            .writes
            .push((PathBuf::from(rel), contents.to_string()));
        self
    }

    /// Only compiles for `channel` write `rel`, for divergence scenarios.
    pub(crate) fn compile_writes_for(mut self, channel: &str, rel: &str, contents: &str) -> Self {
        self.compiler.writes_for.push((
            channel.to_string(),
            PathBuf::from(rel),
            contents.to_string(),
        ));
        self
    }

    pub(crate) fn compile_failure(mut self, channel: &str, code: i32, stderr: &str) -> Self {
        self.compiler
            .failures
            .insert(channel.to_string(), (code, stderr.to_string()));
        self
    }

    pub(crate) fn install_failure(mut self, channel: &str, code: i32, stderr: &str) -> Self {
        self.installer
            .failures
            .insert(channel.to_string(), (code, stderr.to_string()));
        self
    }

    pub(crate) fn compiler(&self) -> &dyn Compiler {
        &self.compiler
    }

    pub(crate) fn installer(&self) -> &dyn Installer {
        &self.installer
    }

    pub(crate) fn compile_calls(&self) -> Vec<CompileCall> {
        self.compiler.calls.lock().unwrap().clone()
    }

    pub(crate) fn install_calls(&self) -> Vec<InstallCall> {
        self.installer.calls.lock().unwrap().clone()
    }

    pub(crate) fn lister_calls(&self) -> usize {
        *self.lister.calls.lock().unwrap()
    }
}

impl Effects for FakeEffects {
    fn lister(&self) -> &dyn VersionLister {
        &self.lister
    }

    fn compiler(&self) -> &dyn Compiler {
        &self.compiler
    }

    fn installer(&self) -> &dyn Installer {
        &self.installer
    }
}
