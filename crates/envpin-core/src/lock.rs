use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::config::ToolConfig;
use crate::effects::LockGenerator;
use crate::error::PinError;
use crate::process::run_command;

/// Explicit lock generation through the `conda-lock` CLI.
pub struct CondaLock {
    tools: ToolConfig,
}

impl CondaLock {
    #[must_use]
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }
}

impl LockGenerator for CondaLock {
    fn generate(&self, manifest: &Path, platform: &str, dest: &Path) -> Result<(), PinError> {
        let conda_lock = self.tools.resolve_conda_lock()?;
        let parent = dest
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| lock_error(dest, &err))?;

        // conda-lock writes to the template path; the result only replaces
        // `dest` once it is known to be complete.
        let staged = tempfile::Builder::new()
            .prefix(".conda-lock.")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|err| lock_error(dest, &err))?
            .into_temp_path();

        let args = vec![
            "lock".to_string(),
            "--file".to_string(),
            manifest.display().to_string(),
            "--platform".to_string(),
            platform.to_string(),
            "--kind".to_string(),
            "explicit".to_string(),
            "--filename-template".to_string(),
            staged.display().to_string(),
        ];
        let start = Instant::now();
        let output = run_command(&conda_lock, &args, self.tools.max_capture_bytes).map_err(
            |err| PinError::LockGeneration {
                detail: format!("{err:#}"),
            },
        )?;
        if !output.success() {
            return Err(PinError::LockGeneration {
                detail: format!(
                    "conda-lock exited with status {}: {}",
                    output.code,
                    output.failure_detail()
                ),
            });
        }

        let written = fs::metadata(&staged).map(|meta| meta.len()).unwrap_or(0);
        if written == 0 {
            return Err(PinError::LockGeneration {
                detail: format!(
                    "conda-lock reported success but produced no lock for {platform}"
                ),
            });
        }
        staged.persist(dest).map_err(|err| lock_error(dest, &err.error))?;

        tracing::info!(
            platform,
            lock = %dest.display(),
            elapsed_ms = start.elapsed().as_millis(),
            "lock file written"
        );
        Ok(())
    }
}

fn lock_error(dest: &Path, err: &std::io::Error) -> PinError {
    PinError::LockGeneration {
        detail: format!("failed to write {}: {err}", dest.display()),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn tools_with_lock(script: &Path) -> ToolConfig {
        ToolConfig {
            conda_override: None,
            conda_exe: None,
            conda_lock_override: Some(script.to_path_buf()),
            max_capture_bytes: 1024 * 1024,
        }
    }

    fn write_script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("conda-lock");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .expect("read dir")
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.starts_with(".conda-lock."))
            .collect()
    }

    // The template path is the last argument.
    const WRITE_LOCK: &str = r#"for last; do :; done
printf '@EXPLICIT\nhttps://conda.anaconda.org/conda-forge/linux-64/numpy-1.26.4.conda\n' > "$last""#;

    #[test]
    fn writes_lock_on_success() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), WRITE_LOCK);
        let manifest = dir.path().join("environment.pinned.yml");
        fs::write(&manifest, "dependencies: [numpy=1.26.4]\n").expect("write manifest");
        let dest = dir.path().join("locks").join("conda-linux-64.lock");

        CondaLock::new(tools_with_lock(&script))
            .generate(&manifest, "linux-64", &dest)
            .expect("lock generated");

        let contents = fs::read_to_string(&dest).expect("read lock");
        assert!(contents.starts_with("@EXPLICIT"));
        assert!(leftovers(dest.parent().expect("parent")).is_empty());
    }

    #[test]
    fn failure_leaves_destination_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "echo 'solver exploded' >&2\nexit 1");
        let manifest = dir.path().join("environment.pinned.yml");
        fs::write(&manifest, "dependencies: []\n").expect("write manifest");
        let dest = dir.path().join("conda-linux-64.lock");

        let err = CondaLock::new(tools_with_lock(&script))
            .generate(&manifest, "linux-64", &dest)
            .expect_err("lock should fail");
        assert_eq!(err.exit_code(), 5);
        assert!(err.to_string().contains("solver exploded"));
        assert!(!dest.exists());
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn empty_output_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let script = write_script(dir.path(), "exit 0");
        let manifest = dir.path().join("environment.pinned.yml");
        fs::write(&manifest, "dependencies: []\n").expect("write manifest");
        let dest = dir.path().join("conda-linux-64.lock");

        let err = CondaLock::new(tools_with_lock(&script))
            .generate(&manifest, "linux-64", &dest)
            .expect_err("empty lock");
        assert!(matches!(err, PinError::LockGeneration { .. }));
        assert!(!dest.exists());
    }
}
