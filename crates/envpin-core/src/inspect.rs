//! Environment inspection through the conda CLI.

use std::path::Path;
use std::time::Instant;

use envpin_domain::{InstalledPackage, InstalledSet};
use serde::Deserialize;

use crate::config::ToolConfig;
use crate::effects::EnvironmentManager;
use crate::error::PinError;
use crate::process::{run_command, RunOutput};

const PYPI_CHANNEL: &str = "pypi";

const MISSING_ENV_MARKERS: [&str; 5] = [
    "environmentlocationnotfound",
    "environmentnamenotfound",
    "could not find conda environment",
    "not a conda environment",
    "does not exist",
];

pub struct CondaManager {
    tools: ToolConfig,
}

impl CondaManager {
    #[must_use]
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }
}

impl EnvironmentManager for CondaManager {
    fn list_packages(&self, env: &str) -> Result<InstalledSet, PinError> {
        let conda = self.tools.resolve_conda()?;
        let mut args = vec!["list".to_string()];
        args.extend(env_selector(env));
        args.push("--json".to_string());
        let command = render_command(&conda, &args);

        let start = Instant::now();
        let output = run_command(&conda, &args, self.tools.max_capture_bytes).map_err(|err| {
            PinError::ManagerFailed {
                command: command.clone(),
                detail: format!("{err:#}"),
            }
        })?;
        if !output.success() {
            if reports_missing_environment(&output) {
                return Err(PinError::EnvironmentNotFound {
                    env: env.to_string(),
                });
            }
            return Err(PinError::ManagerFailed {
                command,
                detail: output.failure_detail(),
            });
        }
        let packages = parse_conda_list(&output.stdout).map_err(|detail| {
            let detail = if output.truncated {
                format!("{detail} (output truncated; raise ENVPIN_MAX_CAPTURE_BYTES)")
            } else {
                detail
            };
            PinError::ManagerFailed {
                command: command.clone(),
                detail,
            }
        })?;
        if packages.is_empty() {
            tracing::warn!(env, "conda list reported no conda-installed packages");
        }
        tracing::info!(
            env,
            packages = packages.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "conda list complete"
        );
        Ok(packages)
    }

    fn freeze_secondary(&self, env: &str) -> Result<InstalledSet, PinError> {
        let conda = self.tools.resolve_conda()?;
        let mut args = vec!["run".to_string()];
        args.extend(env_selector(env));
        args.extend(["python", "-m", "pip", "freeze"].map(String::from));

        let start = Instant::now();
        let output = run_command(&conda, &args, self.tools.max_capture_bytes).map_err(|err| {
            PinError::SecondaryToolUnavailable {
                env: env.to_string(),
                detail: format!("{err:#}"),
            }
        })?;
        if !output.success() {
            return Err(PinError::SecondaryToolUnavailable {
                env: env.to_string(),
                detail: output.failure_detail(),
            });
        }
        let packages = parse_pip_freeze(&output.stdout);
        tracing::info!(
            env,
            packages = packages.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "pip freeze complete"
        );
        Ok(packages)
    }
}

/// `-p <path>` for prefix-style environments, `-n <name>` otherwise.
fn env_selector(env: &str) -> [String; 2] {
    let flag = if env.contains('/') || env.contains('\\') {
        "-p"
    } else {
        "-n"
    };
    [flag.to_string(), env.to_string()]
}

fn render_command(program: &Path, args: &[String]) -> String {
    let name = program
        .file_name()
        .map_or_else(|| program.display().to_string(), |name| name.to_string_lossy().to_string());
    format!("{name} {}", args.join(" "))
}

fn reports_missing_environment(output: &RunOutput) -> bool {
    let combined = format!("{}\n{}", output.stdout, output.stderr).to_ascii_lowercase();
    MISSING_ENV_MARKERS
        .iter()
        .any(|marker| combined.contains(marker))
}

#[derive(Deserialize)]
struct CondaListEntry {
    name: Option<String>,
    version: Option<String>,
    build_string: Option<String>,
    channel: Option<String>,
}

impl CondaListEntry {
    /// `conda list` also reports pip-installed packages; those belong to the
    /// `pip freeze` namespace.
    fn is_pip_installed(&self) -> bool {
        self.channel.as_deref() == Some(PYPI_CHANNEL)
            || self
                .build_string
                .as_deref()
                .is_some_and(|build| build.starts_with("pypi_"))
    }
}

/// Parse `conda list --json` output into conda-installed records. Entries
/// without a name or version and pip-installed entries are skipped.
pub fn parse_conda_list(stdout: &str) -> Result<InstalledSet, String> {
    let entries: Vec<CondaListEntry> = serde_json::from_str(stdout)
        .map_err(|err| format!("unexpected `conda list --json` output: {err}"))?;
    Ok(entries
        .into_iter()
        .filter(|entry| !entry.is_pip_installed())
        .filter_map(|entry| {
            let name = entry.name.filter(|name| !name.is_empty())?;
            let version = entry.version.filter(|version| !version.is_empty())?;
            Some(InstalledPackage {
                name,
                version,
                build: entry.build_string,
                channel: entry.channel,
            })
        })
        .collect())
}

/// Parse `pip freeze` output into `name==version` records.
///
/// Editable installs and direct references carry no version and are skipped.
pub fn parse_pip_freeze(stdout: &str) -> InstalledSet {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with("-e "))
        .filter(|line| !line.contains('@'))
        .filter_map(|line| {
            let (name, version) = line.split_once("==")?;
            // `name===version` is an arbitrary-equality pin.
            let version = version.strip_prefix('=').unwrap_or(version);
            Some(InstalledPackage::new(name.trim(), version.trim()))
        })
        .collect()
}
