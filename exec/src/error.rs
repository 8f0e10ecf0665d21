//! Error types for command execution.

use std::fmt;
use std::path::{Path, PathBuf};

use borg_command_core::ValidationError;
use thiserror::Error;

use crate::decode::Record;
use crate::engine::ExecutionOutcome;
use crate::exit::ExitClass;

/// Errors that can occur while building or running a command.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The arguments did not produce a valid command; nothing was spawned.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The child process could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while talking to the child process or reading config.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The strict entry point saw an exit status other than success or
    /// warning.
    #[error(transparent)]
    ProcessFailed(Box<ProcessFailedError>),

    /// An API was used against its contract.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// Configuration could not be parsed or written.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for results with [`ExecError`].
pub type Result<T> = std::result::Result<T, ExecError>;

/// Diagnostic report of a failed borg run.
///
/// # Examples
///
/// ```
/// use borg_command_exec::{ExecutionOutcome, ProcessFailedError};
///
/// let argv = vec!["borg".to_string(), "--log-json".to_string(), "list".to_string()];
/// let outcome = ExecutionOutcome { exit_code: 2, stdout_records: vec![], stderr_records: vec![] };
///
/// let failure = ProcessFailedError::new(&argv, None, outcome).unwrap();
/// assert!(failure.to_string().starts_with("The command \"borg --log-json list\" failed."));
/// assert!(failure.to_string().contains("Exit Code: 2(Error)"));
/// ```
#[derive(Debug, Clone)]
pub struct ProcessFailedError {
    command_line: String,
    working_dir: Option<PathBuf>,
    outcome: ExecutionOutcome,
}

impl ProcessFailedError {
    /// Wraps a finished run.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::InvalidUsage`] if the outcome is a success.
    pub fn new(argv: &[String], working_dir: Option<&Path>, outcome: ExecutionOutcome) -> Result<Self> {
        if outcome.exit_class() == ExitClass::Success {
            return Err(ExecError::InvalidUsage(
                "Expected a failed process, but the given process was successful.".to_string(),
            ));
        }
        Ok(Self {
            command_line: command_line(argv),
            working_dir: working_dir.map(Path::to_path_buf),
            outcome,
        })
    }

    /// Rendered command line.
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    /// Working directory the command ran in, if one was configured.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// The failed run's outcome.
    pub fn outcome(&self) -> &ExecutionOutcome {
        &self.outcome
    }

    /// Numeric exit code.
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code
    }

    /// Classified exit status.
    pub fn exit_class(&self) -> ExitClass {
        self.outcome.exit_class()
    }
}

impl fmt::Display for ProcessFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let working_dir = self
            .working_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_default();
        write!(
            f,
            "The command \"{}\" failed.\n\nExit Code: {}({})\n\nWorking directory: {}",
            self.command_line,
            self.outcome.exit_code,
            self.exit_class(),
            working_dir
        )?;
        write!(
            f,
            "\n\nOutput:\n================\n{}\n\nError Output:\n================\n{}",
            render_records(&self.outcome.stdout_records),
            render_records(&self.outcome.stderr_records)
        )
    }
}

impl std::error::Error for ProcessFailedError {}

impl From<ProcessFailedError> for ExecError {
    fn from(err: ProcessFailedError) -> Self {
        Self::ProcessFailed(Box::new(err))
    }
}

/// Renders captured records for diagnostics: pretty JSON when anything is
/// structured, the raw lines otherwise.
fn render_records(records: &[Record]) -> String {
    if records.iter().all(|record| record.as_raw().is_some()) {
        return records
            .iter()
            .filter_map(Record::as_raw)
            .collect::<Vec<_>>()
            .join("\n");
    }
    serde_json::to_string_pretty(records).unwrap_or_default()
}

/// Renders `argv` as one line, single-quoting tokens that are empty or carry
/// whitespace or quotes. For display only.
pub fn command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            let plain = !arg.is_empty()
                && !arg
                    .chars()
                    .any(|ch| ch.is_whitespace() || matches!(ch, '\'' | '"'));
            if plain {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', "'\\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn outcome(exit_code: i32) -> ExecutionOutcome {
        ExecutionOutcome {
            exit_code,
            stdout_records: Vec::new(),
            stderr_records: Vec::new(),
        }
    }

    #[test]
    fn test_success_outcome_is_invalid_usage() {
        let err = ProcessFailedError::new(&["borg".into()], None, outcome(0)).unwrap_err();

        assert!(matches!(err, ExecError::InvalidUsage(_)));
    }

    #[test]
    fn test_warning_outcome_can_be_wrapped() {
        let failure = ProcessFailedError::new(&["borg".into()], None, outcome(1)).unwrap();

        assert_eq!(failure.exit_class(), ExitClass::Warning);
    }

    #[test]
    fn test_message_carries_full_context() {
        let argv: Vec<String> = ["borg", "--log-json", "create", "--comment", "two words", "/repo::a"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let outcome = ExecutionOutcome {
            exit_code: 137,
            stdout_records: vec![Record::Raw("partial".into())],
            stderr_records: vec![Record::Json(json!({"levelname": "ERROR"}))],
        };

        let failure = ProcessFailedError::new(&argv, Some(Path::new("/srv")), outcome).unwrap();
        let message = failure.to_string();

        assert!(message.starts_with(
            "The command \"borg --log-json create --comment 'two words' /repo::a\" failed."
        ));
        assert!(message.contains("Exit Code: 137(Killed by signal 9)"));
        assert!(message.contains("Working directory: /srv"));
        assert!(message.contains("Output:\n================\npartial"));
        assert!(message.contains("\"levelname\": \"ERROR\""));
    }

    #[test]
    fn test_command_line_quotes_special_tokens() {
        let argv = vec!["borg".to_string(), String::new(), "it's".to_string()];

        assert_eq!(command_line(&argv), "borg '' 'it'\\''s'");
    }
}
