//! Option schema merging with configurable conflict resolution.
//!
//! The path heuristic works against the union of the shared and the command
//! schema; [`merge_schemas`] builds that union.
//!
//! # Example
//!
//! ```
//! use borg_command_core::*;
//!
//! let shared = OptionSchema::new().flag("-v").valued("--lock-wait", "[0-9]+");
//! let command = OptionSchema::new().valued("--lock-wait", ".*").flag("--stats");
//!
//! let merged = merge_schemas(&shared, &command, MergeStrategy::PreferOverlay);
//! assert_eq!(merged.len(), 3);
//! assert_eq!(merged.rule("--lock-wait"), Some(&ParamRule::pattern(".*")));
//! ```

use crate::schema::OptionSchema;

/// Schema merge behavior.
///
/// Controls which rule survives when both schemas define the same token.
///
/// # Examples
///
/// ```
/// use borg_command_core::*;
///
/// let base = OptionSchema::new().valued("-c", "[0-9]+");
/// let overlay = OptionSchema::new().flag("-c");
///
/// let m1 = merge_schemas(&base, &overlay, MergeStrategy::PreferBase);
/// assert!(m1.rule("-c").unwrap().takes_value());
///
/// let m2 = merge_schemas(&base, &overlay, MergeStrategy::PreferOverlay);
/// assert!(!m2.rule("-c").unwrap().takes_value());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Keep base rules when conflicts occur.
    PreferBase,
    /// Keep overlay rules when conflicts occur (last wins).
    PreferOverlay,
}

/// Merges two option schemas into one.
///
/// Base keys come first, followed by overlay keys not already present, each
/// in insertion order.
pub fn merge_schemas(
    base: &OptionSchema,
    overlay: &OptionSchema,
    strategy: MergeStrategy,
) -> OptionSchema {
    let mut merged = base.clone();

    for entry in overlay.entries() {
        let conflict = merged.contains(&entry.token);
        if !conflict || strategy == MergeStrategy::PreferOverlay {
            merged.insert(&entry.token, entry.rule.clone());
        }
    }

    merged
}
