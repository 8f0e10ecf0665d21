//! Built-in borg command types and their option tables.
//!
//! Each [`CommandKind`] resolves to a static [`CommandSpec`] holding the
//! command-specific [`OptionSchema`]. All command types share
//! [`shared_schema`].

use std::borrow::Cow;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::OptionSchema;

/// Name of the wrapped executable.
pub const EXECUTABLE: &str = "borg";

/// Flag forcing JSON log lines on stderr.
pub const LOG_JSON_FLAG: &str = "--log-json";

/// Flag requesting a JSON document on stdout.
pub const JSON_FLAG: &str = "--json";

/// Flag requesting one JSON object per stdout line.
pub const JSON_LINES_FLAG: &str = "--json-lines";

const COMMAND_SUFFIX: &str = "Command";

/// Checks a fully built command vector before it is executed.
pub type MandatoryValidator = fn(&[String]) -> Result<(), ValidationError>;

/// Descriptor of one command type.
///
/// # Examples
///
/// ```
/// use borg_command_core::{CommandSpec, OptionSchema};
///
/// let spec = CommandSpec::new("PruneCommand", OptionSchema::new().flag("--dry-run"));
/// assert_eq!(spec.command_name(), "prune");
///
/// let spec = spec.with_name("prune-all");
/// assert_eq!(spec.command_name(), "prune-all");
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Identity of the command type, e.g. `CreateCommand`.
    pub ident: String,
    /// Explicit command name, bypassing derivation from `ident`.
    pub name: Option<String>,
    /// Command-specific options.
    pub options: OptionSchema,
    /// Gate run over the finished vector.
    pub mandatory: Option<MandatoryValidator>,
}

impl CommandSpec {
    /// Creates a spec with no name override and no mandatory validator.
    pub fn new(ident: &str, options: OptionSchema) -> Self {
        Self {
            ident: ident.to_string(),
            name: None,
            options,
            mandatory: None,
        }
    }

    /// Sets an explicit command name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the mandatory-option validator.
    pub fn with_mandatory(mut self, validator: MandatoryValidator) -> Self {
        self.mandatory = Some(validator);
        self
    }

    /// Resolves the command name as it appears in the vector.
    pub fn command_name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(derive_command_name(&self.ident)),
        }
    }

    /// Runs the mandatory validator, if any.
    pub fn validate_mandatory(&self, command: &[String]) -> Result<(), ValidationError> {
        match self.mandatory {
            Some(validator) => validator(command),
            None => Ok(()),
        }
    }
}

/// Derives a command name from a type identity: any path prefix and the
/// `Command` suffix are dropped and the rest is lower-cased.
///
/// # Examples
///
/// ```
/// use borg_command_core::derive_command_name;
///
/// assert_eq!(derive_command_name("CreateCommand"), "create");
/// assert_eq!(derive_command_name("borg::ListCommand"), "list");
/// assert_eq!(derive_command_name("Check"), "check");
/// ```
pub fn derive_command_name(ident: &str) -> String {
    let base = ident.rsplit("::").next().unwrap_or(ident);
    let base = base.strip_suffix(COMMAND_SUFFIX).unwrap_or(base);
    base.to_lowercase()
}

/// Fails unless at least one of `options` appears as a token of `command`.
///
/// `labels` name the options in the error message.
pub fn require_any_of(
    command: &[String],
    options: &[&str],
    labels: &[&str],
) -> Result<(), ValidationError> {
    if command
        .iter()
        .any(|token| options.contains(&token.as_str()))
    {
        return Ok(());
    }
    Err(ValidationError::MissingMandatory {
        options: labels.iter().map(|label| label.to_string()).collect(),
    })
}

fn require_encryption(command: &[String]) -> Result<(), ValidationError> {
    require_any_of(
        command,
        &["-e", "--encryption"],
        &["-e MODE", "--encryption MODE"],
    )
}

const SHARED_OPTIONS: &[(&str, Option<&str>)] = &[
    ("-h", None),
    ("--help", None),
    ("--critical", None),
    ("--error", None),
    ("--warning", None),
    ("--info", None),
    ("-v", None),
    ("--verbose", None),
    ("--debug", None),
    ("--debug-topic", Some(".*")),
    ("-p", None),
    ("--progress", None),
    ("--log-json", None),
    ("--lock-wait", Some("[0-9]+")),
    ("--bypass-lock", None),
    ("--show-version", None),
    ("--show-rc", None),
    ("--umask", Some("0[0-7]{1}[0-7]{1}[0-7]{1}")),
    ("--remote-path", Some(".*")),
    ("--remote-ratelimit", Some("[0-9]+")),
    ("--consider-part-files", None),
    ("--debug-profile", Some(".*")),
    ("--rsh", Some(".*")),
];

const INIT_OPTIONS: &[(&str, Option<&str>)] = &[
    ("-e", Some(".*")),
    ("--encryption", Some(".*")),
    ("--append-only", None),
    ("--storage-quota", Some(".*")),
    ("--make-parent-dirs", None),
];

const CREATE_OPTIONS: &[(&str, Option<&str>)] = &[
    ("-n", None),
    ("--dry-run", None),
    ("-s", None),
    ("--stats", None),
    ("--list", None),
    ("--filter", Some(".*")),
    ("--json", None),
    ("--no-cache-sync", None),
    ("--no-files-cache", None),
    ("--stdin-name", Some(".*")),
    ("--stdin-user", Some(".*")),
    ("--stdin-group", Some(".*")),
    ("--stdin-mode", Some("0[0-7]{1}[0-7]{1}[0-7]{1}")),
    ("-e", Some(".*")),
    ("--exclude", Some(".*")),
    ("--exclude-from", Some(".*")),
    ("--pattern", Some(".*")),
    ("--patterns-from", Some(".*")),
    ("--exclude-caches", None),
    ("--exclude-if-present", Some(".*")),
    ("--keep-exclude-tags", None),
    ("--keep-tag-files", None),
    ("--exclude-nodump", None),
    ("-X", None),
    ("--one-file-system", None),
    ("--numeric-owner", None),
    ("--noatime", None),
    ("--noctime", None),
    ("--nobirthtime", None),
    ("--nobsdflags", None),
    ("--ignore-inode", None),
    ("--files-cache", Some(".*")),
    ("--read-special", None),
    ("--comment", Some(".*")),
    ("--timestamp", Some(".*")),
    ("-c", Some("[0-9]+")),
    ("--checkpoint-interval", Some("[0-9]+")),
    ("--chunker-params", Some(".*")),
    ("-C", Some(".*")),
    ("--compression", Some(".*")),
];

const LIST_OPTIONS: &[(&str, Option<&str>)] = &[
    ("--short", None),
    ("--format", Some(".*")),
    ("--list-format", Some(".*")),
    ("--json", None),
    ("--json-lines", None),
    ("-P", Some(".*")),
    ("--prefix", Some(".*")),
    ("-a", Some(".*")),
    ("--glob-archives", Some(".*")),
    ("--sort-by", Some(".*")),
    ("--first", Some("[0-9]+")),
    ("--last", Some("[0-9]+")),
    ("-e", Some(".*")),
    ("--exclude", Some(".*")),
    ("--exclude-from", Some(".*")),
    ("--pattern", Some(".*")),
    ("--patterns-from", Some(".*")),
];

const INFO_OPTIONS: &[(&str, Option<&str>)] = &[
    ("--json", None),
    ("-P", Some(".*")),
    ("--prefix", Some(".*")),
    ("-a", Some(".*")),
    ("--glob-archives", Some(".*")),
    ("--sort-by", Some(".*")),
    ("--first", Some("[0-9]+")),
    ("--last", Some("[0-9]+")),
];

const CONFIG_OPTIONS: &[(&str, Option<&str>)] = &[
    ("-c", None),
    ("--cache", None),
    ("-d", None),
    ("--delete", None),
    ("-l", None),
    ("--list", None),
];

const EXPORT_TAR_OPTIONS: &[(&str, Option<&str>)] = &[
    ("--tar-filter", Some(".*")),
    ("--list", Some(".*")),
    ("-e", Some(".*")),
    ("--exclude", Some(".*")),
    ("--exclude-from", Some(".*")),
    ("--pattern", Some(".*")),
    ("--patterns-from", Some(".*")),
    ("--strip-components", Some("[0-9]+")),
];

static SHARED: LazyLock<OptionSchema> = LazyLock::new(|| OptionSchema::from_table(SHARED_OPTIONS));

static INIT: LazyLock<CommandSpec> = LazyLock::new(|| {
    CommandSpec::new("InitCommand", OptionSchema::from_table(INIT_OPTIONS))
        .with_mandatory(require_encryption)
});
static CREATE: LazyLock<CommandSpec> = LazyLock::new(|| {
    CommandSpec::new("CreateCommand", OptionSchema::from_table(CREATE_OPTIONS))
});
static LIST: LazyLock<CommandSpec> =
    LazyLock::new(|| CommandSpec::new("ListCommand", OptionSchema::from_table(LIST_OPTIONS)));
static INFO: LazyLock<CommandSpec> =
    LazyLock::new(|| CommandSpec::new("InfoCommand", OptionSchema::from_table(INFO_OPTIONS)));
static CONFIG: LazyLock<CommandSpec> =
    LazyLock::new(|| CommandSpec::new("ConfigCommand", OptionSchema::from_table(CONFIG_OPTIONS)));
static EXPORT_TAR: LazyLock<CommandSpec> = LazyLock::new(|| {
    CommandSpec::new("ExportTarCommand", OptionSchema::from_table(EXPORT_TAR_OPTIONS))
        .with_name("export-tar")
});

/// Options accepted by every borg command.
pub fn shared_schema() -> &'static OptionSchema {
    &SHARED
}

/// Built-in command types.
///
/// # Examples
///
/// ```
/// use borg_command_core::CommandKind;
///
/// let kind: CommandKind = "export-tar".parse().unwrap();
/// assert_eq!(kind, CommandKind::ExportTar);
/// assert_eq!(kind.spec().command_name(), "export-tar");
/// assert!(CommandKind::Init.spec().mandatory.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    Init,
    Create,
    List,
    Info,
    Config,
    ExportTar,
}

impl CommandKind {
    /// Every built-in command type.
    pub const ALL: [CommandKind; 6] = [
        Self::Init,
        Self::Create,
        Self::List,
        Self::Info,
        Self::Config,
        Self::ExportTar,
    ];

    /// Returns the static descriptor of this command type.
    pub fn spec(self) -> &'static CommandSpec {
        match self {
            Self::Init => &INIT,
            Self::Create => &CREATE,
            Self::List => &LIST,
            Self::Info => &INFO,
            Self::Config => &CONFIG,
            Self::ExportTar => &EXPORT_TAR,
        }
    }

    /// Looks a command type up by its command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.spec().command_name() == name)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec().command_name())
    }
}

impl std::str::FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown borg command: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_command_names() {
        let names: Vec<String> = CommandKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec!["init", "create", "list", "info", "config", "export-tar"]
        );
    }

    #[test]
    fn test_from_name_round_trips_every_kind() {
        for kind in CommandKind::ALL {
            assert_eq!(CommandKind::from_name(&kind.to_string()), Some(kind));
        }
        assert_eq!(CommandKind::from_name("exporttar"), None);
    }

    #[test]
    fn test_init_requires_encryption() {
        let spec = CommandKind::Init.spec();

        let missing = spec.validate_mandatory(&tokens(&["borg", "--log-json", "init", "/repo"]));
        assert!(matches!(missing, Err(ValidationError::MissingMandatory { .. })));

        let short = tokens(&["borg", "--log-json", "init", "-e", "none", "/repo"]);
        assert!(spec.validate_mandatory(&short).is_ok());

        let long = tokens(&["borg", "--log-json", "init", "--encryption", "repokey", "/repo"]);
        assert!(spec.validate_mandatory(&long).is_ok());
    }

    #[test]
    fn test_commands_without_validator_always_pass() {
        assert!(
            CommandKind::List
                .spec()
                .validate_mandatory(&[])
                .is_ok()
        );
    }

    #[test]
    fn test_json_support_matches_tables() {
        let supports: Vec<bool> = CommandKind::ALL
            .iter()
            .map(|kind| kind.spec().options.supports(JSON_FLAG))
            .collect();
        assert_eq!(supports, vec![false, true, true, true, false, false]);
        assert!(CommandKind::List.spec().options.supports(JSON_LINES_FLAG));
        assert!(shared_schema().supports(LOG_JSON_FLAG));
    }
}
