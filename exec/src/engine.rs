//! Child process execution and output capture.
//!
//! [`run_command`] spawns a built vector, drains stdout and stderr on one
//! reader thread each, and hands every chunk to the calling thread in arrival
//! order. Depending on the [`CaptureMode`] the chunks are either buffered
//! and decoded once the process exits, or decoded line by line as they
//! arrive.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{ChildStderr, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use borg_command_core::CaptureMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::config::RunConfig;
use crate::decode::{LineDecoder, Record, decode_document, decode_lines};
use crate::error::{ExecError, ProcessFailedError, Result};
use crate::exit::{ExitClass, exit_code};

const READ_CHUNK_SIZE: usize = 8192;

/// How long output is still drained after a timed-out child was killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Output stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Result of one finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Exit code; `128+N` when killed by signal `N`.
    pub exit_code: i32,
    /// Decoded standard output.
    pub stdout_records: Vec<Record>,
    /// Decoded standard error.
    pub stderr_records: Vec<Record>,
}

impl ExecutionOutcome {
    /// Classifies the exit code.
    pub fn exit_class(&self) -> ExitClass {
        ExitClass::from_code(self.exit_code)
    }

    /// Returns `true` for success and warning.
    pub fn is_ok(&self) -> bool {
        self.exit_class().is_ok()
    }
}

enum Message {
    Chunk(Stream, Vec<u8>),
    Failed(Stream, std::io::Error),
}

#[derive(Default)]
struct StreamCapture {
    raw: Vec<u8>,
    decoder: LineDecoder,
    records: Vec<Record>,
}

impl StreamCapture {
    fn push(&mut self, mode: CaptureMode, chunk: &[u8]) {
        match mode {
            CaptureMode::Buffered => self.raw.extend_from_slice(chunk),
            CaptureMode::Streaming => self.decoder.feed(chunk, &mut self.records),
        }
    }
}

struct Capture {
    mode: CaptureMode,
    stdout: StreamCapture,
    stderr: StreamCapture,
}

impl Capture {
    fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            stdout: StreamCapture::default(),
            stderr: StreamCapture::default(),
        }
    }

    fn push(&mut self, stream: Stream, chunk: &[u8]) {
        match stream {
            Stream::Stdout => self.stdout.push(self.mode, chunk),
            Stream::Stderr => self.stderr.push(self.mode, chunk),
        }
    }

    fn finish(mut self, exit_code: i32) -> ExecutionOutcome {
        let (stdout_records, stderr_records) = match self.mode {
            CaptureMode::Buffered => (
                decode_document(&String::from_utf8_lossy(&self.stdout.raw)),
                decode_lines(&String::from_utf8_lossy(&self.stderr.raw)),
            ),
            CaptureMode::Streaming => {
                self.stdout.decoder.finish(&mut self.stdout.records);
                self.stderr.decoder.finish(&mut self.stderr.records);
                (self.stdout.records, self.stderr.records)
            }
        };
        ExecutionOutcome {
            exit_code,
            stdout_records,
            stderr_records,
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>, stream: Stream, tx: Sender<Message>) -> Option<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                match pipe.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(Message::Chunk(stream, buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Message::Failed(stream, e));
                        break;
                    }
                }
            }
        })
    })
}

/// Runs `argv` to completion.
///
/// `on_chunk` sees every raw chunk before it is captured, strictly in order
/// per stream. The outcome is returned whatever the exit code; see
/// [`run_command_strict`] for the variant that fails on errors.
///
/// When the configured timeout elapses the child is killed, so its exit code
/// surfaces as signaled (`137`). Output is drained for a short grace period
/// afterwards; pipes still held open by descendants of the child are then
/// abandoned.
///
/// # Errors
///
/// Returns [`ExecError::InvalidUsage`] for an empty vector,
/// [`ExecError::Spawn`] if the process cannot be started and
/// [`ExecError::Io`] if reading its output or waiting on it fails.
pub fn run_command(
    argv: &[String],
    mode: CaptureMode,
    config: &RunConfig,
    mut on_chunk: Option<&mut dyn FnMut(Stream, &[u8])>,
) -> Result<ExecutionOutcome> {
    let Some((first, args)) = argv.split_first() else {
        return Err(ExecError::InvalidUsage("empty command vector".to_string()));
    };
    let program = config
        .program
        .as_deref()
        .unwrap_or_else(|| Path::new(first));

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }
    for (key, value) in config.effective_env() {
        command.env(key, value);
    }

    debug!(command = ?argv, program = %program.display(), mode = ?mode, "Spawning borg");
    let mut child = command.spawn().map_err(|source| ExecError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let readers = [
        spawn_reader::<ChildStdout>(child.stdout.take(), Stream::Stdout, tx.clone()),
        spawn_reader::<ChildStderr>(child.stderr.take(), Stream::Stderr, tx),
    ];

    let deadline = config.timeout().map(|timeout| Instant::now() + timeout);
    let mut wait_until = deadline;
    let mut capture = Capture::new(mode);
    let mut read_error = None;
    let mut killed = false;
    let mut abandoned = false;

    loop {
        let received = match wait_until {
            Some(until) => rx.recv_timeout(until.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        let message = match received {
            Ok(message) => message,
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) if !killed => {
                warn!(
                    command = ?argv,
                    timeout_ms = config.timeout_ms.unwrap_or_default(),
                    "borg timed out, killing process"
                );
                let _ = child.kill();
                killed = true;
                wait_until = Some(Instant::now() + KILL_GRACE);
                continue;
            }
            Err(RecvTimeoutError::Timeout) => {
                // A descendant still holds a pipe open; its output is dropped.
                warn!(command = ?argv, "output pipes still open after kill, abandoning readers");
                abandoned = true;
                break;
            }
        };

        match message {
            Message::Chunk(stream, chunk) => {
                if let Some(handler) = on_chunk.as_deref_mut() {
                    handler(stream, &chunk);
                }
                capture.push(stream, &chunk);
            }
            Message::Failed(stream, err) => {
                debug!(command = ?argv, stream = ?stream, error = %err, "Failed to read output");
                read_error.get_or_insert(err);
            }
        }
    }

    if !abandoned {
        for reader in readers.into_iter().flatten() {
            let _ = reader.join();
        }
    }

    let status = match deadline {
        None => child.wait()?,
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match child.wait_timeout(remaining)? {
                Some(status) => status,
                None => {
                    if !killed {
                        warn!(command = ?argv, "borg outlived its output, killing process");
                    }
                    let _ = child.kill();
                    child.wait()?
                }
            }
        }
    };

    if let Some(err) = read_error {
        return Err(ExecError::Io(err));
    }

    let code = exit_code(status);
    let outcome = capture.finish(code);
    info!(
        command = ?argv,
        exit_code = code,
        class = %outcome.exit_class(),
        stdout_records = outcome.stdout_records.len(),
        stderr_records = outcome.stderr_records.len(),
        "borg exited"
    );
    Ok(outcome)
}

/// Runs `argv` and fails unless it exits with success or warning.
///
/// # Errors
///
/// Everything [`run_command`] returns, plus [`ExecError::ProcessFailed`]
/// carrying the full diagnostic context.
pub fn run_command_strict(
    argv: &[String],
    mode: CaptureMode,
    config: &RunConfig,
    on_chunk: Option<&mut dyn FnMut(Stream, &[u8])>,
) -> Result<ExecutionOutcome> {
    let outcome = run_command(argv, mode, config, on_chunk)?;
    ensure_ok(argv, config, outcome)
}

/// Passes a successful or warning outcome through, wraps anything else in
/// [`ExecError::ProcessFailed`].
pub fn ensure_ok(
    argv: &[String],
    config: &RunConfig,
    outcome: ExecutionOutcome,
) -> Result<ExecutionOutcome> {
    if outcome.is_ok() {
        return Ok(outcome);
    }
    let failure = ProcessFailedError::new(argv, config.working_dir.as_deref(), outcome)?;
    Err(failure.into())
}
