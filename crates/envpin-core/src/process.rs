use std::{
    io::Read,
    path::Path,
    process::{Command, Stdio},
    thread,
    time::Instant,
};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// First non-empty stderr line, or the exit status when stderr is silent.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit status {}", self.code)
        } else {
            stderr.to_string()
        }
    }
}

/// Execute a program and capture stdout/stderr.
///
/// Blocks until the program exits; there is no timeout. Output beyond
/// `max_capture_bytes` per stream is dropped and flagged as truncated.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(program: &Path, args: &[String], max_capture_bytes: usize) -> Result<RunOutput> {
    let program_display = program.display().to_string();
    tracing::debug!(program = %program_display, args = ?args, "spawning");
    let start = Instant::now();

    let mut command = Command::new(program);
    command.args(args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program_display}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program_display}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program_display}"))?;
    let stdout_handle = thread::spawn(move || read_to_string_limited(stdout, max_capture_bytes));
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr, max_capture_bytes));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program_display}"))?;
    let code = status.code().unwrap_or(-1);
    let (stdout, stdout_truncated) = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let (stderr, stderr_truncated) = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;

    tracing::debug!(
        program = %program_display,
        code,
        elapsed_ms = start.elapsed().as_millis(),
        stdout_bytes = stdout.len(),
        "process exited"
    );

    Ok(RunOutput {
        code,
        stdout,
        stderr,
        truncated: stdout_truncated || stderr_truncated,
    })
}

fn read_to_string_limited(mut reader: impl Read, limit: usize) -> Result<(String, bool)> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buffer.len());
        if read > remaining {
            truncated = true;
        }
        buffer.extend_from_slice(&chunk[..read.min(remaining)]);
    }
    Ok((String::from_utf8_lossy(&buffer).to_string(), truncated))
}
