use envpin_domain::ManifestError;

/// Failures that abort a pin run.
#[derive(Debug, thiserror::Error)]
pub enum PinError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error(
        "[EP104] could not determine environment name; pass --env or add 'name:' to the manifest"
    )]
    MissingEnvironmentName,
    #[error(
        "[EP201] conda executable not found; run inside a conda shell (CONDA_EXE), put conda on PATH, or set ENVPIN_CONDA"
    )]
    ManagerUnavailable,
    #[error("[EP202] `{command}` failed: {detail}")]
    ManagerFailed { command: String, detail: String },
    #[error("[EP203] conda environment '{env}' does not exist")]
    EnvironmentNotFound { env: String },
    #[error("[EP301] pip is not available in conda environment '{env}': {detail}")]
    SecondaryToolUnavailable { env: String, detail: String },
    #[error("[EP401] lock generation failed: {detail}")]
    LockGeneration { detail: String },
}

impl PinError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Manifest(ManifestError::Serialize(_) | ManifestError::Write { .. })
            | Self::ManagerUnavailable
            | Self::ManagerFailed { .. } => 1,
            Self::Manifest(_) | Self::MissingEnvironmentName => 2,
            Self::EnvironmentNotFound { .. } => 3,
            Self::SecondaryToolUnavailable { .. } => 4,
            Self::LockGeneration { .. } => 5,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Manifest(ManifestError::Serialize(_) | ManifestError::Write { .. }) => {
                "write-error"
            }
            Self::Manifest(_) | Self::MissingEnvironmentName => "parse-error",
            Self::ManagerUnavailable | Self::ManagerFailed { .. } => "manager-error",
            Self::EnvironmentNotFound { .. } => "environment-not-found",
            Self::SecondaryToolUnavailable { .. } => "secondary-tool-unavailable",
            Self::LockGeneration { .. } => "lock-generation-error",
        }
    }

    /// Errors the invoker fixes by editing input or flags rather than the
    /// machine.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self.exit_code(), 2 | 3)
    }
}
