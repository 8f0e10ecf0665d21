//! Option schema definitions.
//!
//! An [`OptionSchema`] maps option tokens (e.g. `--lock-wait`) to a
//! [`ParamRule`] describing whether the option consumes the following token
//! as its parameter and which pattern that parameter must match.

use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Parameter rule for one option token.
///
/// # Examples
///
/// ```
/// use borg_command_core::ParamRule;
///
/// let rule = ParamRule::pattern("[0-9]+");
/// assert!(rule.takes_value());
/// assert!(!ParamRule::None.takes_value());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParamRule {
    /// Bare flag, consumes no parameter.
    #[default]
    None,
    /// Consumes the next token, which must fully match the pattern.
    Pattern(String),
}

impl ParamRule {
    /// Creates a pattern rule.
    pub fn pattern(pattern: &str) -> Self {
        Self::Pattern(pattern.to_string())
    }

    /// Returns `true` if the option consumes a parameter token.
    pub fn takes_value(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }

    /// Returns the raw pattern, if any.
    pub fn as_pattern(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Pattern(pattern) => Some(pattern.as_str()),
        }
    }

    /// Returns `true` when the value is written into the option token itself
    /// (`--opt=value`), signalled by a `=` inside the pattern.
    pub fn is_attached(&self) -> bool {
        self.as_pattern().is_some_and(|pattern| pattern.contains('='))
    }

    /// Checks `value` against the rule's pattern as a full match.
    ///
    /// `option` is only used to label the error when the pattern itself does
    /// not compile. A [`ParamRule::None`] accepts nothing.
    pub fn accepts(&self, option: &str, value: &str) -> Result<bool, ValidationError> {
        let Some(pattern) = self.as_pattern() else {
            return Ok(false);
        };
        let regex = compiled_regex(pattern).map_err(|err| ValidationError::InvalidPattern {
            option: option.to_string(),
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(regex.is_match(value))
    }
}

impl fmt::Display for ParamRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "<none>"),
            Self::Pattern(pattern) => write!(f, "{pattern}"),
        }
    }
}

/// Anchored regexes compiled so far, keyed by their unanchored pattern.
static COMPILED_PATTERNS: LazyLock<Mutex<HashMap<String, Regex>>> = LazyLock::new(Default::default);

/// Compiles `pattern` so it must match the whole input.
pub(crate) fn anchored_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Like [`anchored_regex`], compiling each distinct pattern only once.
fn compiled_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut cache = COMPILED_PATTERNS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(regex) = cache.get(pattern) {
        return Ok(regex.clone());
    }
    let regex = anchored_regex(pattern)?;
    cache.insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// One entry of an [`OptionSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionEntry {
    /// Option token as it appears on the command line.
    pub token: String,
    /// Parameter rule.
    pub rule: ParamRule,
}

/// Immutable mapping from option token to [`ParamRule`].
///
/// Keys are unique and kept in insertion order, so schemas serialize and
/// list deterministically. Inserting an existing key replaces its rule in
/// place.
///
/// # Examples
///
/// ```
/// use borg_command_core::{OptionSchema, ParamRule};
///
/// let schema = OptionSchema::new()
///     .flag("--stats")
///     .valued("--lock-wait", "[0-9]+");
///
/// assert!(schema.contains("--stats"));
/// assert_eq!(schema.rule("--lock-wait"), Some(&ParamRule::pattern("[0-9]+")));
/// assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["--stats", "--lock-wait"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSchema {
    entries: Vec<OptionEntry>,
}

impl OptionSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from a static `(token, pattern)` table.
    ///
    /// # Examples
    ///
    /// ```
    /// use borg_command_core::OptionSchema;
    ///
    /// let schema = OptionSchema::from_table(&[("-n", None), ("--first", Some("[0-9]+"))]);
    /// assert_eq!(schema.len(), 2);
    /// assert!(schema.rule("--first").unwrap().takes_value());
    /// ```
    pub fn from_table(table: &[(&str, Option<&str>)]) -> Self {
        let mut schema = Self::new();
        for (token, pattern) in table {
            let rule = pattern.map(ParamRule::pattern).unwrap_or_default();
            schema.insert(token, rule);
        }
        schema
    }

    /// Adds a bare flag.
    pub fn flag(mut self, token: &str) -> Self {
        self.insert(token, ParamRule::None);
        self
    }

    /// Adds an option whose parameter must match `pattern`.
    pub fn valued(mut self, token: &str, pattern: &str) -> Self {
        self.insert(token, ParamRule::pattern(pattern));
        self
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, token: &str, rule: ParamRule) {
        match self.entries.iter_mut().find(|entry| entry.token == token) {
            Some(entry) => entry.rule = rule,
            None => self.entries.push(OptionEntry {
                token: token.to_string(),
                rule,
            }),
        }
    }

    /// Returns the rule for `token` if it is a key of this schema.
    pub fn rule(&self, token: &str) -> Option<&ParamRule> {
        self.entries
            .iter()
            .find(|entry| entry.token == token)
            .map(|entry| &entry.rule)
    }

    /// Returns `true` if `token` is a key of this schema.
    pub fn contains(&self, token: &str) -> bool {
        self.rule(token).is_some()
    }

    /// Returns `true` if the schema recognizes `flag`; used to detect support
    /// for output-shaping flags such as `--json`.
    pub fn supports(&self, flag: &str) -> bool {
        self.contains(flag)
    }

    /// Iterates option tokens in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.token.as_str())
    }

    /// Iterates entries in insertion order.
    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    /// Returns the number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the schema has no options.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_rule_in_place() {
        let mut schema = OptionSchema::new().flag("-a").flag("-b");
        schema.insert("-a", ParamRule::pattern(".*"));

        assert_eq!(schema.keys().collect::<Vec<_>>(), vec!["-a", "-b"]);
        assert!(schema.rule("-a").unwrap().takes_value());
    }

    #[test]
    fn test_accepts_requires_full_match() {
        let rule = ParamRule::pattern("[0-9]+");

        assert!(rule.accepts("--last", "42").unwrap());
        assert!(!rule.accepts("--last", "42x").unwrap());
        assert!(!rule.accepts("--last", "").unwrap());
    }

    #[test]
    fn test_accepts_umask_pattern() {
        let rule = ParamRule::pattern("0[0-7]{1}[0-7]{1}[0-7]{1}");

        assert!(rule.accepts("--umask", "0077").unwrap());
        assert!(!rule.accepts("--umask", "077").unwrap());
        assert!(!rule.accepts("--umask", "0089").unwrap());
    }

    #[test]
    fn test_accepts_reports_broken_pattern() {
        let rule = ParamRule::pattern("([0-9");

        let err = rule.accepts("--bad", "1").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { ref option, .. } if option == "--bad"));
    }

    #[test]
    fn test_accepted_pattern_is_compiled_once() {
        let rule = ParamRule::pattern("[a-f]{3}-cached");

        assert!(rule.accepts("--id", "abc-cached").unwrap());
        assert!(!rule.accepts("--id", "xyz-cached").unwrap());

        let cache = COMPILED_PATTERNS.lock().unwrap();
        assert_eq!(
            cache.get("[a-f]{3}-cached").map(Regex::as_str),
            Some("^(?:[a-f]{3}-cached)$")
        );
    }

    #[test]
    fn test_broken_pattern_is_not_cached() {
        let rule = ParamRule::pattern("([a-z");

        assert!(rule.accepts("--bad", "a").is_err());
        assert!(!COMPILED_PATTERNS.lock().unwrap().contains_key("([a-z"));
    }

    #[test]
    fn test_attached_rule_detection() {
        assert!(ParamRule::pattern("--opt=.*").is_attached());
        assert!(!ParamRule::pattern(".*").is_attached());
        assert!(!ParamRule::None.is_attached());
    }
}
