//! High-level handle pairing a built borg command with its run settings.

use borg_command_core::{
    BorgCommand, CommandKind, CommandSpec, MergeStrategy, OptionSchema, extract_paths,
    merge_schemas, shared_schema,
};

use crate::config::RunConfig;
use crate::engine::{ExecutionOutcome, Stream, run_command, run_command_strict};
use crate::error::{Result, command_line};

/// A validated borg invocation, ready to run.
///
/// Construction builds and validates the command vector, so an invalid
/// argument list never reaches a process spawn.
///
/// # Examples
///
/// ```
/// use borg_command_exec::{BorgProcess, RunConfig};
/// use borg_command_core::CommandKind;
///
/// let process = BorgProcess::new(
///     CommandKind::Info,
///     ["/srv/repo", "--last", "1"],
///     RunConfig::default(),
/// )
/// .unwrap();
/// assert_eq!(process.command_line(), "borg --log-json info --last 1 --json /srv/repo");
///
/// let invalid = BorgProcess::new(CommandKind::Info, ["--last", "x"], RunConfig::default());
/// assert!(invalid.is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BorgProcess {
    command: BorgCommand,
    options: OptionSchema,
    config: RunConfig,
}

impl BorgProcess {
    /// Builds a built-in command type from `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Validation`](crate::ExecError::Validation) if the
    /// arguments do not form a valid command.
    pub fn new<I, S>(kind: CommandKind, args: I, config: RunConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_spec(kind.spec(), args, config)
    }

    /// Builds a command from a custom spec against the shared schema.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Validation`](crate::ExecError::Validation) if the
    /// arguments do not form a valid command.
    pub fn with_spec<I, S>(spec: &CommandSpec, args: I, config: RunConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        let command = borg_command_core::build_command(args, shared_schema(), spec)?;
        Ok(Self {
            command,
            options: merge_schemas(shared_schema(), &spec.options, MergeStrategy::PreferOverlay),
            config,
        })
    }

    /// The built command.
    pub fn command(&self) -> &BorgCommand {
        &self.command
    }

    /// The full argument vector.
    pub fn argv(&self) -> &[String] {
        &self.command.argv
    }

    /// The argument vector rendered as one line.
    pub fn command_line(&self) -> String {
        command_line(&self.command.argv)
    }

    /// Run settings.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Path-like tokens of the vector, with `archive` marking the
    /// repository/archive token.
    pub fn paths(&self, archive: &str) -> Vec<String> {
        extract_paths(&self.command.argv, &self.options, &self.command.name, archive)
    }

    /// Runs the command and returns its outcome whatever the exit code.
    pub fn run(&self) -> Result<ExecutionOutcome> {
        run_command(&self.command.argv, self.command.capture_mode, &self.config, None)
    }

    /// Like [`run`](Self::run), also handing every output chunk to
    /// `on_chunk`.
    pub fn run_with<F>(&self, mut on_chunk: F) -> Result<ExecutionOutcome>
    where
        F: FnMut(Stream, &[u8]),
    {
        run_command(
            &self.command.argv,
            self.command.capture_mode,
            &self.config,
            Some(&mut on_chunk),
        )
    }

    /// Runs the command, failing unless it exits with success or warning.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::ProcessFailed`](crate::ExecError::ProcessFailed)
    /// for an error or signaled exit, besides spawn and I/O failures.
    pub fn must_run(&self) -> Result<ExecutionOutcome> {
        run_command_strict(&self.command.argv, self.command.capture_mode, &self.config, None)
    }

    /// Like [`must_run`](Self::must_run), also handing every output chunk to
    /// `on_chunk`.
    pub fn must_run_with<F>(&self, mut on_chunk: F) -> Result<ExecutionOutcome>
    where
        F: FnMut(Stream, &[u8]),
    {
        run_command_strict(
            &self.command.argv,
            self.command.capture_mode,
            &self.config,
            Some(&mut on_chunk),
        )
    }
}
