//! Option schema linting.
//!
//! Catches structural problems in option tables before they surface as
//! confusing extraction failures: malformed option tokens, parameter
//! patterns that do not compile, and tokens claimed by both the shared and a
//! command schema.
//!
//! # Examples
//!
//! ```
//! use borg_command_core::*;
//!
//! let schema = OptionSchema::new().flag("--stats").valued("--last", "[0-9]+");
//! assert!(lint_schema(&schema).is_empty());
//!
//! // Invalid: option token missing its leading dash
//! let bad = OptionSchema::new().flag("stats");
//! assert!(!lint_schema(&bad).is_empty());
//! ```

use thiserror::Error;

use crate::schema::{OptionSchema, anchored_regex};

/// Structural problems found in an option schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    /// Short option does not look like `-x`.
    #[error("invalid short option format: {0}")]
    InvalidShortOption(String),
    /// Long option does not start with `--` or is too short.
    #[error("invalid long option format: {0}")]
    InvalidLongOption(String),
    /// Parameter pattern does not compile.
    #[error("invalid parameter pattern for {option}: {pattern}")]
    InvalidPattern { option: String, pattern: String },
    /// Token is a key of both the shared and the command schema.
    #[error("option defined in shared and command schema: {0}")]
    SharedConflict(String),
}

/// Lints a single option schema.
pub fn lint_schema(schema: &OptionSchema) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    for entry in schema.entries() {
        let token = entry.token.as_str();
        if token.starts_with("--") {
            if token.len() < 3 {
                issues.push(SchemaIssue::InvalidLongOption(token.to_string()));
            }
        } else if !token.starts_with('-') || token.len() != 2 {
            issues.push(SchemaIssue::InvalidShortOption(token.to_string()));
        }

        if let Some(pattern) = entry.rule.as_pattern() {
            if anchored_regex(pattern).is_err() {
                issues.push(SchemaIssue::InvalidPattern {
                    option: token.to_string(),
                    pattern: pattern.to_string(),
                });
            }
        }
    }

    issues
}

/// Lints a shared schema together with one command schema.
///
/// Reports the issues of both schemas plus every token defined in both.
pub fn lint_pair(shared: &OptionSchema, command: &OptionSchema) -> Vec<SchemaIssue> {
    let mut issues = lint_schema(shared);
    issues.extend(lint_schema(command));
    issues.extend(
        command
            .keys()
            .filter(|key| shared.contains(key))
            .map(|key| SchemaIssue::SharedConflict(key.to_string())),
    );
    issues
}
