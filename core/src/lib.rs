//! Option schemas and command vector building for the borg backup CLI.
//!
//! This crate turns an order-independent mix of flags, valued options and
//! positional arguments into a validated, correctly ordered borg invocation:
//!
//! - [`OptionSchema`]: mapping from option token to a [`ParamRule`].
//! - [`extract_options`]: pulls schema options (and their validated
//!   parameters) out of a token list.
//! - [`build_command`]: assembles the final vector, forcing `--log-json`
//!   and `--json`, and runs the command's mandatory-option gate.
//! - [`CommandKind`] / [`CommandSpec`]: built-in command types and their
//!   option tables.
//! - [`extract_paths`]: recovers path-like tokens from a built vector.
//!
//! Linting ([`lint_schema`], [`lint_pair`]) catches malformed option tables.
//!
//! # Example
//!
//! ```
//! use borg_command_core::*;
//!
//! let command = CommandKind::Create
//!     .build(["/srv/repo::monday", "/home", "--stats", "--lock-wait", "10"])
//!     .unwrap();
//!
//! assert_eq!(
//!     command.argv,
//!     vec![
//!         "borg", "--lock-wait", "10", "--log-json", "create", "--stats", "--json",
//!         "/srv/repo::monday", "/home",
//!     ]
//! );
//! assert_eq!(command.capture_mode, CaptureMode::Buffered);
//! ```

mod build;
mod commands;
mod error;
mod extract;
mod merge;
mod paths;
mod schema;
mod validate;

pub use build::{BorgCommand, CaptureMode, build_command};
pub use commands::{
    CommandKind, CommandSpec, EXECUTABLE, JSON_FLAG, JSON_LINES_FLAG, LOG_JSON_FLAG,
    MandatoryValidator, derive_command_name, require_any_of, shared_schema,
};
pub use error::ValidationError;
pub use extract::{extract_options, normalize_tokens};
pub use merge::{MergeStrategy, merge_schemas};
pub use paths::extract_paths;
pub use schema::{OptionEntry, OptionSchema, ParamRule};
pub use validate::{SchemaIssue, lint_pair, lint_schema};
