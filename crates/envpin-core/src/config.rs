use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::error::PinError;

const DEFAULT_MAX_CAPTURE_BYTES: usize = 64 * 1024 * 1024;
const CONDA_CANDIDATES: [&str; 3] = ["conda", "conda.exe", "conda.bat"];
const CONDA_LOCK_CANDIDATES: [&str; 2] = ["conda-lock", "conda-lock.exe"];

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) tools: ToolConfig,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            tools: ToolConfig {
                conda_override: snapshot.var("ENVPIN_CONDA").map(PathBuf::from),
                conda_exe: snapshot.var("CONDA_EXE").map(PathBuf::from),
                conda_lock_override: snapshot.var("ENVPIN_CONDA_LOCK").map(PathBuf::from),
                max_capture_bytes: snapshot
                    .var("ENVPIN_MAX_CAPTURE_BYTES")
                    .and_then(|raw| raw.trim().parse::<usize>().ok())
                    .filter(|value| *value > 0)
                    .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES),
            },
        }
    }

    #[must_use]
    pub fn tools(&self) -> &ToolConfig {
        &self.tools
    }
}

/// Where the external collaborators live.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// `ENVPIN_CONDA`; used as-is.
    pub conda_override: Option<PathBuf>,
    /// `CONDA_EXE`, exported by activated conda shells; used when it exists.
    pub conda_exe: Option<PathBuf>,
    /// `ENVPIN_CONDA_LOCK`; used as-is.
    pub conda_lock_override: Option<PathBuf>,
    pub max_capture_bytes: usize,
}

impl ToolConfig {
    pub fn resolve_conda(&self) -> Result<PathBuf, PinError> {
        if let Some(explicit) = &self.conda_override {
            return Ok(explicit.clone());
        }
        if let Some(conda_exe) = self.conda_exe.as_ref().filter(|path| path.exists()) {
            return Ok(conda_exe.clone());
        }
        CONDA_CANDIDATES
            .iter()
            .find_map(|candidate| which::which(candidate).ok())
            .ok_or(PinError::ManagerUnavailable)
    }

    pub fn resolve_conda_lock(&self) -> Result<PathBuf, PinError> {
        if let Some(explicit) = &self.conda_lock_override {
            return Ok(explicit.clone());
        }
        CONDA_LOCK_CANDIDATES
            .iter()
            .find_map(|candidate| which::which(candidate).ok())
            .ok_or_else(|| PinError::LockGeneration {
                detail: "conda-lock not found; install it with `pip install conda-lock`".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins() {
        let snapshot = EnvSnapshot::testing(&[
            ("ENVPIN_CONDA", "/opt/tools/conda"),
            ("CONDA_EXE", "/nonexistent/conda"),
        ]);
        let config = Config::from_snapshot(&snapshot);
        let conda = config.tools().resolve_conda().expect("resolve conda");
        assert_eq!(conda, PathBuf::from("/opt/tools/conda"));
    }

    #[test]
    fn conda_exe_used_only_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conda = dir.path().join("conda");
        std::fs::write(&conda, "").expect("write stub");
        let present = conda.to_string_lossy().to_string();
        let snapshot = EnvSnapshot::testing(&[("CONDA_EXE", present.as_str())]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.tools().resolve_conda().expect("resolve"), conda);
    }

    #[test]
    fn capture_limit_falls_back_on_garbage() {
        let snapshot = EnvSnapshot::testing(&[("ENVPIN_MAX_CAPTURE_BYTES", "lots")]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.tools().max_capture_bytes, DEFAULT_MAX_CAPTURE_BYTES);

        let snapshot = EnvSnapshot::testing(&[("ENVPIN_MAX_CAPTURE_BYTES", "4096")]);
        let config = Config::from_snapshot(&snapshot);
        assert_eq!(config.tools().max_capture_bytes, 4096);
    }

    #[test]
    fn empty_values_are_ignored() {
        let snapshot = EnvSnapshot::testing(&[("ENVPIN_CONDA_LOCK", "  ")]);
        let config = Config::from_snapshot(&snapshot);
        assert!(config.tools().conda_lock_override.is_none());
    }
}
