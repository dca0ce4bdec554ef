use std::path::PathBuf;

use atty::Stream;
use clap::{ArgAction, Parser};
use color_eyre::Result;
use envpin_core::{
    CommandStatus, Config, ExecutionOutcome, LockRequest, PinOptions, PinRequest, SystemEffects,
    DEFAULT_INPUT, DEFAULT_LOCK_OUTPUT, DEFAULT_LOCK_PLATFORM, DEFAULT_OUTPUT,
};
use serde_json::Value;

mod style;

use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = PinCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let request = build_request(&cli);
    let config = Config::from_env();
    let effects = SystemEffects::new(&config);
    let outcome = envpin_core::execute(&effects, &request);
    let code = emit_output(&cli, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else {
        match (quiet, verbose) {
            (true, 0) => "error",
            (false, 0) => "warn",
            (_, 1) => "info",
            (_, 2) => "debug",
            _ => "trace",
        }
    };

    let filter = format!("envpin_core={level},envpin_domain={level},pin_versions={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn build_request(cli: &PinCli) -> PinRequest {
    let lock = cli
        .lock_platform
        .clone()
        .or_else(|| cli.lock_linux64.then(|| DEFAULT_LOCK_PLATFORM.to_string()))
        .map(|platform| LockRequest {
            platform,
            output: cli.lock_output.clone(),
        });
    PinRequest {
        input: cli.input.clone(),
        output: cli.output.clone(),
        inplace: cli.inplace,
        env: cli.env.clone(),
        pin_secondary: cli.pin_pip,
        options: PinOptions {
            keep_python_unpinned: cli.keep_python_unpinned,
            include_build: cli.include_build,
        },
        lock,
    }
}

fn emit_output(cli: &PinCli, outcome: &ExecutionOutcome) -> Result<i32> {
    if cli.json {
        let payload = envpin_core::to_json_response(outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(outcome.exit_code);
    }

    let style = Style::new(cli.no_color, atty::is(Stream::Stdout));
    match outcome.status {
        CommandStatus::Ok => {
            if !cli.quiet {
                println!("{}", style.status(outcome.status, &outcome.message));
                if let Some(lock) = detail_str(&outcome.details, "lock") {
                    println!("{}", style.info(&format!("lock written to {lock}")));
                }
                if cli.verbose > 0 {
                    for line in pinned_lines(&outcome.details) {
                        println!("{}", style.dimmed(&format!("  {line}")));
                    }
                }
            }
            if let Some(warning) = detail_str(&outcome.details, "warning") {
                eprintln!("{}", style.warning(warning));
            }
        }
        CommandStatus::UserError | CommandStatus::Failure => {
            let style = Style::new(cli.no_color, atty::is(Stream::Stderr));
            eprintln!("{}", style.status(outcome.status, &outcome.message));
            if let Some(output) = detail_str(&outcome.details, "output") {
                eprintln!("{}", style.info(&format!("pinned manifest kept at {output}")));
            }
        }
    }
    Ok(outcome.exit_code)
}

fn detail_str<'a>(details: &'a Value, key: &str) -> Option<&'a str> {
    details
        .as_object()
        .and_then(|map| map.get(key))
        .and_then(Value::as_str)
}

fn pinned_lines(details: &Value) -> Vec<String> {
    details
        .pointer("/report/pinned")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let from = entry.get("from")?.as_str()?;
                    let to = entry.get("to")?.as_str()?;
                    let scope = entry.get("scope")?.as_str()?;
                    Some(format!("{from} -> {to} ({scope})"))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Parser, Debug)]
#[command(
    name = "pin-versions",
    version,
    about = "Pin an environment.yml to the versions installed in a conda environment",
    long_about = "Reads a conda environment manifest, looks up the versions installed in the \
named environment, and writes a copy with every matched dependency pinned to its exact version.",
    after_help = "Examples:\n  pin-versions\n  pin-versions -i env.yml --inplace --pin-pip\n  pin-versions -n health-ai --lock-linux64 --json"
)]
#[allow(clippy::struct_excessive_bools)]
struct PinCli {
    #[arg(
        short,
        long,
        visible_alias = "manifest",
        value_name = "PATH",
        default_value = DEFAULT_INPUT,
        help = "Manifest to read"
    )]
    input: PathBuf,
    #[arg(
        short,
        long,
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT,
        conflicts_with = "inplace",
        help = "Where to write the pinned manifest"
    )]
    output: PathBuf,
    #[arg(long, help = "Overwrite the input manifest instead of writing --output")]
    inplace: bool,
    #[arg(
        short = 'n',
        long,
        value_name = "NAME",
        help = "Environment to inspect (defaults to the manifest's name:)"
    )]
    env: Option<String>,
    #[arg(
        long,
        visible_alias = "pin-secondary",
        help = "Also pin the pip: sub-list from `pip freeze` inside the environment"
    )]
    pin_pip: bool,
    #[arg(long, help = "Write python without a version")]
    keep_python_unpinned: bool,
    #[arg(long, help = "Append the installed build string to conda pins")]
    include_build: bool,
    #[arg(
        long,
        conflicts_with = "lock_platform",
        help = "Export an explicit linux-64 lock with conda-lock"
    )]
    lock_linux64: bool,
    #[arg(
        long,
        value_name = "TAG",
        help = "Export an explicit lock for the given platform with conda-lock"
    )]
    lock_platform: Option<String>,
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_LOCK_OUTPUT,
        help = "Where to write the lock file"
    )]
    lock_output: PathBuf,
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)"
    )]
    quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vvv reaches trace)")]
    verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q")]
    trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes")]
    json: bool,
    #[arg(long, help = "Disable colored human output")]
    no_color: bool,
}
