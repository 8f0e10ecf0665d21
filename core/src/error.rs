//! Error type for command construction.
//!
//! Every variant is raised before any process is spawned and can be fixed by
//! correcting the caller's arguments.

use thiserror::Error;

/// Errors raised while extracting options or assembling a command vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A valued option is missing its parameter, or the parameter does not
    /// match the option's pattern.
    #[error(
        "Option {option} does not match expected parameter expression. Expecting {expected} but got {}.",
        .actual.as_deref().unwrap_or("nothing")
    )]
    ParameterMismatch {
        option: String,
        expected: String,
        actual: Option<String>,
    },

    /// None of a set of mandatory options appears in the command.
    #[error("Neither {} are passed to the command.", quote_join(.options))]
    MissingMandatory { options: Vec<String> },

    /// A schema pattern failed to compile.
    #[error("Option {option} has an invalid parameter expression {pattern}: {reason}")]
    InvalidPattern {
        option: String,
        pattern: String,
        reason: String,
    },
}

fn quote_join(options: &[String]) -> String {
    options
        .iter()
        .map(|option| format!("'{option}'"))
        .collect::<Vec<_>>()
        .join(" nor ")
}
