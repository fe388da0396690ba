use std::{
    io::{self, Read, Write},
    path::Path,
    process::{Command, Stdio},
    thread,
};

use anyhow::{Context, Result};

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;

fn max_capture_bytes() -> usize {
    std::env::var("BISTAGE_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

/// Captured result of one collaborator invocation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// Short failure summary: the exit code plus the last non-empty line
    /// the collaborator wrote to stderr (or stdout when stderr is silent).
    #[must_use]
    pub fn failure_detail(&self) -> String {
        let last = last_line(&self.stderr).or_else(|| last_line(&self.stdout));
        match last {
            Some(line) => format!("exit status {}: {line}", self.code),
            None => format!("exit status {}", self.code),
        }
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

/// Execute a program with the parent's environment and capture
/// stdout/stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or its output
/// streams cannot be read entirely.
pub fn run_command(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    let mut command = configured_command(program, args, cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;
    let limit = max_capture_bytes();
    let stdout_handle = thread::spawn(move || capture_stream(stdout, limit));
    let stderr_handle = thread::spawn(move || capture_stream(stderr, limit));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let code = status.code().unwrap_or(-1);
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

/// Execute a program while forwarding its output to the parent process,
/// still keeping a bounded copy for reporting.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or its output
/// streams cannot be read.
pub fn run_command_streaming(program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
    let mut command = configured_command(program, args, cwd);
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;

    let limit = max_capture_bytes();
    let stdout_handle = thread::spawn(move || tee_stream(&mut stdout, io::stdout(), limit));
    let stderr_handle = thread::spawn(move || tee_stream(&mut stderr, io::stderr(), limit));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let code = status.code().unwrap_or(-1);
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;

    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

fn configured_command(program: &str, args: &[String], cwd: &Path) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    command.current_dir(cwd);
    command
}

/// Bounded capture buffer that keeps the tail of a stream once the limit
/// is reached.
struct TailBuffer {
    bytes: Vec<u8>,
    limit: usize,
    clipped: bool,
}

impl TailBuffer {
    fn new(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit,
            clipped: false,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        if self.limit == 0 {
            return;
        }
        if self.bytes.len().saturating_add(chunk.len()) <= self.limit {
            self.bytes.extend_from_slice(chunk);
            return;
        }
        self.clipped = true;
        if chunk.len() >= self.limit {
            self.bytes.clear();
            self.bytes.extend_from_slice(&chunk[chunk.len() - self.limit..]);
            return;
        }
        let excess = self.bytes.len() + chunk.len() - self.limit;
        self.bytes.drain(0..excess);
        self.bytes.extend_from_slice(chunk);
    }

    fn into_text(self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).to_string();
        if self.clipped {
            text.push_str("\n[...truncated...]\n");
        }
        text
    }
}

fn capture_stream(mut reader: impl Read, limit: usize) -> Result<String> {
    let mut buffer = TailBuffer::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        buffer.push(&chunk[..read]);
    }
    Ok(buffer.into_text())
}

fn tee_stream(reader: &mut dyn Read, mut writer: impl Write, limit: usize) -> Result<String> {
    let mut buffer = TailBuffer::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        writer.write_all(&chunk[..read])?;
        buffer.push(&chunk[..read]);
    }
    writer.flush().ok();
    Ok(buffer.into_text())
}
