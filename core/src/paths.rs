//! Recovery of path-like positional tokens from a built vector.
//!
//! This is a heuristic: any token containing an option key as a substring is
//! treated as an option, so a path such as `/data/--stats` is not reported.

use crate::commands::{CommandSpec, EXECUTABLE};
use crate::merge::{MergeStrategy, merge_schemas};
use crate::schema::OptionSchema;

/// Returns `true` if `token` may be a filesystem path.
fn is_possibly_path(
    token: &str,
    options: &OptionSchema,
    command_name: &str,
    discriminator: &str,
) -> bool {
    if token.contains(EXECUTABLE) || token.contains(command_name) {
        return false;
    }
    if !discriminator.is_empty() && token.contains(discriminator) {
        return false;
    }
    !options.contains(token) && !options.keys().any(|key| token.contains(key))
}

/// Extracts the tokens of `command` that look like paths.
///
/// `options` is the combined shared and command schema, `command_name` the
/// resolved command name and `discriminator` a string that marks the
/// repository/archive token (e.g. the archive name). Non-path tokens are
/// dropped; a valued option also drops its parameter unless its value is
/// attached with `=`.
///
/// # Examples
///
/// ```
/// use borg_command_core::{OptionSchema, extract_paths};
///
/// let options = OptionSchema::new().flag("--stats").valued("--comment", ".*");
/// let command: Vec<String> = [
///     "borg", "create", "--stats", "--comment", "nightly", "/srv/repo::nightly", "/home", "/etc",
/// ]
/// .iter()
/// .map(|t| t.to_string())
/// .collect();
///
/// let paths = extract_paths(&command, &options, "create", "nightly");
/// assert_eq!(paths, vec!["/home", "/etc"]);
/// ```
pub fn extract_paths(
    command: &[String],
    options: &OptionSchema,
    command_name: &str,
    discriminator: &str,
) -> Vec<String> {
    let mut paths = Vec::new();
    let mut i = 0;

    while i < command.len() {
        let token = command[i].as_str();
        if is_possibly_path(token, options, command_name, discriminator) {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                paths.push(trimmed.to_string());
            }
            i += 1;
            continue;
        }

        match options.rule(token) {
            Some(rule) if rule.takes_value() && !rule.is_attached() => i += 2,
            _ => i += 1,
        }
    }

    paths
}

impl CommandSpec {
    /// Extracts path-like tokens from a vector built for this command,
    /// using `archive` as the discriminator.
    pub fn paths_from_command(
        &self,
        command: &[String],
        shared: &OptionSchema,
        archive: &str,
    ) -> Vec<String> {
        let options = merge_schemas(shared, &self.options, MergeStrategy::PreferOverlay);
        extract_paths(command, &options, &self.command_name(), archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandKind, shared_schema};

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_paths_from_built_create_command() {
        let command = CommandKind::Create
            .build([
                "/backups/repo::home-2024",
                "--exclude",
                "*.cache",
                "/home/alice",
                "--compression",
                "zstd,10",
                "--stats",
                "/etc",
                "--lock-wait",
                "30",
            ])
            .unwrap();

        let paths = CommandKind::Create.spec().paths_from_command(
            &command.argv,
            shared_schema(),
            "home-2024",
        );

        assert_eq!(paths, tokens(&["/home/alice", "/etc"]));
    }

    #[test]
    fn test_attached_value_drops_single_token() {
        let options = OptionSchema::new().valued("--opt", "--opt=.*");
        let command = tokens(&["borg", "create", "--opt", "/data", "/srv"]);

        let paths = extract_paths(&command, &options, "create", "archive");

        assert_eq!(paths, tokens(&["/data", "/srv"]));
    }

    #[test]
    fn test_tokens_containing_keys_are_not_paths() {
        let options = OptionSchema::new().flag("--stats");
        let command = tokens(&["/data/--stats", "/srv"]);

        let paths = extract_paths(&command, &options, "create", "");

        assert_eq!(paths, tokens(&["/srv"]));
    }

    #[test]
    fn test_tokens_mentioning_executable_are_dropped() {
        let options = OptionSchema::new();
        let command = tokens(&["borg", "/var/lib/borg/cache", "/srv"]);

        let paths = extract_paths(&command, &options, "create", "");

        assert_eq!(paths, tokens(&["/srv"]));
    }
}
