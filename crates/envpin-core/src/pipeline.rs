use std::path::{Path, PathBuf};
use std::time::Instant;

use envpin_domain::{pin_manifest, read_manifest, write_manifest, PinOptions, PinReport};
use serde_json::{json, Value};

use crate::effects::Effects;
use crate::error::PinError;
use crate::outcome::ExecutionOutcome;

pub const DEFAULT_INPUT: &str = "environment.yml";
pub const DEFAULT_OUTPUT: &str = "environment.pinned.yml";
pub const DEFAULT_LOCK_OUTPUT: &str = "conda-linux-64.lock";
pub const DEFAULT_LOCK_PLATFORM: &str = "linux-64";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub platform: String,
    pub output: PathBuf,
}

impl Default for LockRequest {
    fn default() -> Self {
        Self {
            platform: DEFAULT_LOCK_PLATFORM.to_string(),
            output: PathBuf::from(DEFAULT_LOCK_OUTPUT),
        }
    }
}

/// Everything one run needs, as resolved from the command line.
#[derive(Debug, Clone)]
pub struct PinRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Overwrite `input` instead of writing `output`.
    pub inplace: bool,
    /// Overrides the manifest's `name:` field.
    pub env: Option<String>,
    pub pin_secondary: bool,
    pub options: PinOptions,
    pub lock: Option<LockRequest>,
}

impl Default for PinRequest {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            inplace: false,
            env: None,
            pin_secondary: false,
            options: PinOptions::default(),
            lock: None,
        }
    }
}

impl PinRequest {
    /// Where the pinned manifest lands.
    #[must_use]
    pub fn destination(&self) -> &Path {
        if self.inplace {
            &self.input
        } else {
            &self.output
        }
    }
}

#[derive(Debug, Clone)]
pub struct PinSummary {
    pub env: String,
    pub output: PathBuf,
    pub report: PinReport,
    pub lock: Option<PathBuf>,
    pub conda_packages: usize,
    pub pip_packages: Option<usize>,
}

impl PinSummary {
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "env": self.env,
            "output": self.output.display().to_string(),
            "lock": self.lock.as_ref().map(|path| path.display().to_string()),
            "installed": {
                "conda": self.conda_packages,
                "pip": self.pip_packages,
            },
            "report": self.report.to_json(),
            "warning": self.report.warning_summary(),
        })
    }
}

/// Read, inspect, rewrite, write and optionally lock.
///
/// Stages run strictly in order and the first failure aborts the rest. A
/// lock failure is reported after the pinned manifest has been written.
pub fn pin_environment(effects: &dyn Effects, request: &PinRequest) -> Result<PinSummary, PinError> {
    let start = Instant::now();
    let manifest = read_manifest(&request.input)?;
    tracing::info!(
        manifest = %request.input.display(),
        dependencies = manifest.dependencies().len(),
        "manifest loaded"
    );

    let env = request
        .env
        .as_deref()
        .or_else(|| manifest.name())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or(PinError::MissingEnvironmentName)?
        .to_string();

    let conda = effects.manager().list_packages(&env)?;
    let secondary = if request.pin_secondary {
        Some(effects.manager().freeze_secondary(&env)?)
    } else {
        None
    };

    let result = pin_manifest(&manifest, &conda, secondary.as_ref(), request.options);
    let output = request.destination().to_path_buf();
    write_manifest(&result.manifest, &output)?;
    tracing::info!(
        output = %output.display(),
        pinned = result.report.pinned.len(),
        unpinned = result.report.unpinned.len(),
        "pinned manifest written"
    );

    let lock = match &request.lock {
        Some(lock) => {
            effects
                .locker()
                .generate(&output, &lock.platform, &lock.output)?;
            Some(lock.output.clone())
        }
        None => None,
    };

    tracing::info!(elapsed_ms = start.elapsed().as_millis(), "pin run complete");
    Ok(PinSummary {
        env,
        output,
        report: result.report,
        lock,
        conda_packages: conda.len(),
        pip_packages: secondary.as_ref().map(envpin_domain::InstalledSet::len),
    })
}

/// Run the pipeline and fold the result into an outcome for the CLI.
pub fn execute(effects: &dyn Effects, request: &PinRequest) -> ExecutionOutcome {
    match pin_environment(effects, request) {
        Ok(summary) => {
            let message = format!(
                "pinned {} of environment '{}' into {}",
                plural(summary.report.pinned.len(), "entry", "entries"),
                summary.env,
                summary.output.display()
            );
            ExecutionOutcome::success(message, summary.to_json())
        }
        Err(err) => {
            let mut details = json!({
                "kind": err.kind(),
                "exit_code": err.exit_code(),
            });
            if matches!(err, PinError::LockGeneration { .. }) {
                details["output"] = json!(request.destination().display().to_string());
            }
            if err.is_user_error() {
                ExecutionOutcome::user_error(err.to_string(), details, err.exit_code())
            } else {
                ExecutionOutcome::failure(err.to_string(), details, err.exit_code())
            }
        }
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}
