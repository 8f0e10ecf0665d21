//! Command vector assembly.
//!
//! [`build_command`] turns an order-independent argument list into the
//! vector `borg <shared options> --log-json <command> <command options>
//! [--json] <positionals>`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::{
    CommandKind, CommandSpec, EXECUTABLE, JSON_FLAG, JSON_LINES_FLAG, LOG_JSON_FLAG,
    shared_schema,
};
use crate::error::ValidationError;
use crate::extract::{extract_options, normalize_tokens};
use crate::schema::OptionSchema;

/// How the output of a command is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Capture everything, decode stdout as one JSON document at exit.
    #[default]
    Buffered,
    /// Decode every output line as it arrives.
    Streaming,
}

/// A fully validated command vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorgCommand {
    /// Resolved command name, e.g. `export-tar`.
    pub name: String,
    /// Complete argument vector, executable first.
    pub argv: Vec<String>,
    /// Capture mode selected by the command options.
    pub capture_mode: CaptureMode,
    /// Index of the first positional argument in `argv`.
    pub positional_start: usize,
}

impl BorgCommand {
    /// Positional arguments at the tail of the vector.
    pub fn positionals(&self) -> &[String] {
        &self.argv[self.positional_start.min(self.argv.len())..]
    }
}

/// Builds the command vector for `spec` from `raw_args`.
///
/// Repeated bare flags collapse to their first occurrence; valued options
/// keep every occurrence. `--log-json` is always present exactly once, and
/// `--json` is added when the command supports it and no token already
/// mentions it.
///
/// # Errors
///
/// Fails with the first [`ValidationError`] raised by option extraction or
/// by the command's mandatory validator. No partial vector is returned.
///
/// # Examples
///
/// ```
/// use borg_command_core::{CommandKind, CaptureMode, build_command, shared_schema};
///
/// let args = vec!["/srv/repo".to_string(), "--last".to_string(), "2".to_string()];
/// let command = build_command(args, shared_schema(), CommandKind::List.spec()).unwrap();
///
/// assert_eq!(
///     command.argv,
///     vec!["borg", "--log-json", "list", "--last", "2", "--json", "/srv/repo"]
/// );
/// assert_eq!(command.capture_mode, CaptureMode::Buffered);
/// ```
pub fn build_command(
    raw_args: Vec<String>,
    shared: &OptionSchema,
    spec: &CommandSpec,
) -> Result<BorgCommand, ValidationError> {
    let mut remaining = raw_args;
    let mut argv = vec![EXECUTABLE.to_string()];

    let shared_options = extract_options(&mut remaining, shared)?;
    append_options(&mut argv, shared_options, shared);

    if !argv.iter().any(|token| token == LOG_JSON_FLAG) {
        argv.push(LOG_JSON_FLAG.to_string());
    }

    let name = spec.command_name().into_owned();
    argv.push(name.clone());

    let command_options = extract_options(&mut remaining, &spec.options)?;
    let capture_mode = if command_options.iter().any(|token| token == JSON_LINES_FLAG) {
        CaptureMode::Streaming
    } else {
        CaptureMode::Buffered
    };
    append_options(&mut argv, command_options, &spec.options);

    if spec.options.supports(JSON_FLAG) && !argv.iter().any(|token| token.contains(JSON_FLAG)) {
        argv.push(JSON_FLAG.to_string());
    }

    normalize_tokens(&mut remaining);
    let positional_start = argv.len();
    argv.extend(remaining.into_iter().filter(|token| {
        !shared.contains(token) && !spec.options.contains(token) && token != EXECUTABLE
    }));

    spec.validate_mandatory(&argv)?;

    debug!(command = ?argv, mode = ?capture_mode, "Built borg command");
    Ok(BorgCommand {
        name,
        argv,
        capture_mode,
        positional_start,
    })
}

/// Appends extracted options, keeping only the first occurrence of each
/// bare flag.
fn append_options(argv: &mut Vec<String>, options: Vec<String>, schema: &OptionSchema) {
    let mut seen = HashSet::new();
    let mut options = options.into_iter();
    while let Some(token) = options.next() {
        match schema.rule(&token) {
            Some(rule) if rule.takes_value() => {
                argv.push(token);
                argv.extend(options.next());
            }
            _ => {
                if seen.insert(token.clone()) {
                    argv.push(token);
                }
            }
        }
    }
}

impl CommandKind {
    /// Builds this command type from `args` against the shared schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use borg_command_core::CommandKind;
    ///
    /// let command = CommandKind::Init
    ///     .build(["--encryption", "repokey", "/srv/repo"])
    ///     .unwrap();
    /// assert_eq!(
    ///     command.argv,
    ///     vec!["borg", "--log-json", "init", "--encryption", "repokey", "/srv/repo"]
    /// );
    ///
    /// assert!(CommandKind::Init.build(["/srv/repo"]).is_err());
    /// ```
    pub fn build<I, S>(self, args: I) -> Result<BorgCommand, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = args.into_iter().map(Into::into).collect();
        build_command(args, shared_schema(), self.spec())
    }
}
