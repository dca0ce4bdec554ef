#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod config;
mod effects;
mod error;
mod inspect;
mod lock;
mod outcome;
mod pipeline;
mod process;

pub use config::{Config, ToolConfig};
pub use effects::{Effects, EnvironmentManager, LockGenerator, SystemEffects};
pub use error::PinError;
pub use inspect::{parse_conda_list, parse_pip_freeze, CondaManager};
pub use lock::CondaLock;
pub use outcome::{to_json_response, CommandStatus, ExecutionOutcome};
pub use pipeline::{
    execute, pin_environment, LockRequest, PinRequest, PinSummary, DEFAULT_INPUT,
    DEFAULT_LOCK_OUTPUT, DEFAULT_LOCK_PLATFORM, DEFAULT_OUTPUT,
};
pub use process::RunOutput;

pub use envpin_domain::{PinOptions, PinReport, PinScope};
