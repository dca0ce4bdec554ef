#![cfg(unix)]
#![allow(dead_code)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

pub const ENV_NAME: &str = "health-ai";

pub const MANIFEST: &str = "\
name: health-ai
channels:
  - conda-forge
dependencies:
  - python=3.11
  - numpy
  - scikit-learn=1.2.0
  - pip:
      - fastapi
";

pub const CONDA_LIST: &str = r#"[
  {"name": "numpy", "version": "1.26.4", "build_string": "py311h64a7726_0", "channel": "conda-forge"},
  {"name": "python", "version": "3.11.8", "build_string": "hab00c5b_0", "channel": "conda-forge"},
  {"name": "scikit-learn", "version": "1.2.0", "build_string": "py311hc009520_1", "channel": "conda-forge"},
  {"name": "fastapi", "version": "0.110.0", "build_string": "pypi_0", "channel": "pypi"}
]"#;

pub const PIP_FREEZE: &str = "fastapi==0.110.0\nuvicorn==0.29.0\n";

/// A scratch project with a manifest and fake `conda` / `conda-lock`
/// executables that record every invocation.
pub struct Sandbox {
    _temp: TempDir,
    pub root: PathBuf,
    pub conda: PathBuf,
    pub conda_lock: PathBuf,
    pub calls: PathBuf,
}

impl Sandbox {
    pub fn new(manifest: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix("pin-versions")
            .tempdir()
            .expect("tempdir");
        let root = temp.path().to_path_buf();
        fs::write(root.join("environment.yml"), manifest).expect("write manifest");
        let calls = root.join("calls.log");
        let sandbox = Self {
            conda: root.join("bin").join("conda"),
            conda_lock: root.join("bin").join("conda-lock"),
            calls,
            root,
            _temp: temp,
        };
        sandbox.fake_conda(CONDA_LIST, Some(PIP_FREEZE));
        sandbox.fake_conda_lock(true);
        sandbox
    }

    /// `pip_freeze: None` makes `conda run ... pip freeze` fail like an
    /// environment without pip.
    pub fn fake_conda(&self, conda_list: &str, pip_freeze: Option<&str>) {
        let freeze = match pip_freeze {
            Some(output) => format!("cat <<'FREEZE'\n{output}FREEZE\n"),
            None => "echo '/usr/bin/python: No module named pip' >&2\nexit 1\n".to_string(),
        };
        let script = format!(
            r#"#!/bin/sh
echo "conda $*" >> "{calls}"
case "$1" in
  list)
    if [ "$3" != "{env}" ]; then
      echo '{{"exception_name": "EnvironmentLocationNotFound", "message": "Not a conda environment: '"$3"'"}}'
      exit 1
    fi
    cat <<'LIST'
{conda_list}
LIST
    ;;
  run)
{freeze}    ;;
  *)
    echo "unexpected conda invocation: $*" >&2
    exit 2
    ;;
esac
"#,
            calls = self.calls.display(),
            env = ENV_NAME,
        );
        write_executable(&self.conda, &script);
    }

    pub fn fake_conda_lock(&self, succeed: bool) {
        let body = if succeed {
            "for last; do :; done\nprintf '@EXPLICIT\\nhttps://conda.anaconda.org/conda-forge/linux-64/numpy-1.26.4.conda\\n' > \"$last\"\n"
        } else {
            "echo 'Could not solve for environment specs' >&2\nexit 1\n"
        };
        let script = format!(
            "#!/bin/sh\necho \"conda-lock $*\" >> \"{calls}\"\n{body}",
            calls = self.calls.display()
        );
        write_executable(&self.conda_lock, &script);
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path(name)).expect("read sandbox file")
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls)
            .map(|text| text.lines().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("pin-versions");
        cmd.current_dir(&self.root)
            .env("ENVPIN_CONDA", &self.conda)
            .env("ENVPIN_CONDA_LOCK", &self.conda_lock)
            .env("NO_COLOR", "1")
            .env_remove("CONDA_EXE")
            .env_remove("ENVPIN_MAX_CAPTURE_BYTES");
        cmd
    }
}

fn write_executable(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create bin dir");
    }
    fs::write(path, contents).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn stderr(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stderr.clone()).expect("utf8 stderr")
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("json envelope")
}
