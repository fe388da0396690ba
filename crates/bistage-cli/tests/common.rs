#![allow(dead_code)]

use std::fs;
use std::path::Path;

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use serde_json::Value;

pub fn bistage_cmd() -> Command {
    Command::cargo_bin("bistage").expect("bistage binary")
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn read_log(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Interpreter stand-in that mimics the two `setup.py` invocations the
/// stager issues. A plain `build` populates the purelib tree (including
/// the generated `pkg/__init__.py`); `install` copies the purelib tree
/// into the `--root=` destination. Every call is appended to
/// `$BISTAGE_TEST_LOG`.
#[cfg(unix)]
const SETUP_SHIM: &str = r#"#!/bin/sh
log="${BISTAGE_TEST_LOG:?}"
printf '%s %s\n' "$(basename "$0")" "$*" >> "$log"
purelib=""
root=""
mode=build
prev=""
for arg in "$@"; do
  case "$prev" in
    --build-purelib) purelib="$arg" ;;
  esac
  case "$arg" in
    install) mode=install ;;
    --root=*) root="${arg#--root=}" ;;
  esac
  prev="$arg"
done
if [ "$mode" = install ]; then
  mkdir -p "$root"
  cp -R "$purelib"/. "$root"/
else
  mkdir -p "$purelib/pkg"
  printf 'module\n' > "$purelib/pkg/mod.py"
  printf 'generated\n' > "$purelib/pkg/__init__.py"
fi
exit 0
"#;

#[cfg(unix)]
pub fn install_interpreter_shims(bin_dir: &Path, names: &[&str]) {
    for name in names {
        write_shim(bin_dir, name, SETUP_SHIM);
    }
}

#[cfg(unix)]
pub fn install_failing_shim(bin_dir: &Path, name: &str, code: i32, message: &str) {
    let script = format!(
        "#!/bin/sh\nlog=\"${{BISTAGE_TEST_LOG:?}}\"\nprintf '%s %s\\n' \"$(basename \"$0\")\" \"$*\" >> \"$log\"\necho '{message}' >&2\nexit {code}\n"
    );
    write_shim(bin_dir, name, &script);
}

#[cfg(unix)]
fn write_shim(bin_dir: &Path, name: &str, contents: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(bin_dir).expect("shim dir");
    let path = bin_dir.join(name);
    fs::write(&path, contents).expect("write shim");
    let mut perms = fs::metadata(&path).expect("shim metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod shim");
}

/// PATH that resolves the shims first but keeps the shell utilities the
/// shim scripts themselves rely on.
#[cfg(unix)]
pub fn shim_path_env(bin_dir: &Path) -> String {
    format!("{}:/usr/bin:/bin", bin_dir.display())
}
