//! Schema-driven option extraction.
//!
//! [`extract_options`] pulls every option a schema recognizes out of a token
//! list, validating parameters as it goes, and leaves the unrecognized
//! residue behind in its original order.

use crate::error::ValidationError;
use crate::schema::{OptionSchema, ParamRule};

/// Trims every token and drops the ones left empty.
pub fn normalize_tokens(tokens: &mut Vec<String>) {
    let normalized: Vec<String> = tokens
        .iter()
        .map(|token| token.trim())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    *tokens = normalized;
}

/// Extracts the options of `schema` from `tokens`.
///
/// Scans once from left to right. A bare flag is moved to the result; a
/// valued option is moved together with the following token, which must
/// exist, must not itself be a key of `schema`, and must fully match the
/// option's pattern. Every occurrence is extracted, in encountered order.
/// Whatever is not extracted stays in `tokens`.
///
/// # Errors
///
/// Returns [`ValidationError::ParameterMismatch`] for a missing or invalid
/// parameter, and [`ValidationError::InvalidPattern`] if the schema pattern
/// does not compile. On error `tokens` is left normalized but otherwise
/// untouched.
///
/// # Examples
///
/// ```
/// use borg_command_core::{OptionSchema, extract_options};
///
/// let schema = OptionSchema::new().flag("--stats").valued("--last", "[0-9]+");
/// let mut tokens: Vec<String> = ["repo", "--last", "3", "--stats", "path"]
///     .iter()
///     .map(|t| t.to_string())
///     .collect();
///
/// let options = extract_options(&mut tokens, &schema).unwrap();
/// assert_eq!(options, vec!["--last", "3", "--stats"]);
/// assert_eq!(tokens, vec!["repo", "path"]);
/// ```
pub fn extract_options(
    tokens: &mut Vec<String>,
    schema: &OptionSchema,
) -> Result<Vec<String>, ValidationError> {
    normalize_tokens(tokens);

    let mut matched = Vec::new();
    let mut residue = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        let Some(rule) = schema.rule(token) else {
            residue.push(token.clone());
            i += 1;
            continue;
        };

        match rule {
            ParamRule::None => {
                matched.push(token.clone());
                i += 1;
            }
            ParamRule::Pattern(pattern) => {
                let next = tokens.get(i + 1);
                let valid = match next {
                    // A following key counts as a missing parameter.
                    Some(value) if !schema.contains(value) => rule.accepts(token, value)?,
                    _ => false,
                };
                if !valid {
                    return Err(ValidationError::ParameterMismatch {
                        option: token.clone(),
                        expected: pattern.clone(),
                        actual: next.cloned(),
                    });
                }
                matched.push(token.clone());
                matched.extend(next.cloned());
                i += 2;
            }
        }
    }

    *tokens = residue;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn schema() -> OptionSchema {
        OptionSchema::new()
            .flag("-v")
            .flag("--stats")
            .valued("-x", ".*")
            .valued("--last", "[0-9]+")
    }

    #[test]
    fn test_extract_keeps_positional_order() {
        let mut input = tokens(&["alpha", "-x", "val", "beta"]);

        let options = extract_options(&mut input, &schema()).unwrap();

        assert_eq!(options, tokens(&["-x", "val"]));
        assert_eq!(input, tokens(&["alpha", "beta"]));
    }

    #[test]
    fn test_extract_collects_duplicates_in_order() {
        let mut input = tokens(&["-v", "a", "-x", "1", "-v", "-x", "2"]);

        let options = extract_options(&mut input, &schema()).unwrap();

        assert_eq!(options, tokens(&["-v", "-x", "1", "-v", "-x", "2"]));
        assert_eq!(input, tokens(&["a"]));
    }

    #[test]
    fn test_extract_rejects_non_matching_parameter() {
        let mut input = tokens(&["--last", "many"]);

        let err = extract_options(&mut input, &schema()).unwrap_err();

        assert_eq!(
            err,
            ValidationError::ParameterMismatch {
                option: "--last".into(),
                expected: "[0-9]+".into(),
                actual: Some("many".into()),
            }
        );
    }

    #[test]
    fn test_extract_rejects_trailing_valued_option() {
        let mut input = tokens(&["repo", "--last"]);

        let err = extract_options(&mut input, &schema()).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::ParameterMismatch { actual: None, .. }
        ));
    }

    #[test]
    fn test_extract_treats_following_key_as_missing_parameter() {
        let mut input = tokens(&["-x", "--stats"]);

        let err = extract_options(&mut input, &schema()).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::ParameterMismatch { ref actual, .. } if actual.as_deref() == Some("--stats")
        ));
    }

    #[test]
    fn test_extract_drops_blank_tokens_and_trims() {
        let mut input = tokens(&["  ", " --stats ", "", " repo "]);

        let options = extract_options(&mut input, &schema()).unwrap();

        assert_eq!(options, tokens(&["--stats"]));
        assert_eq!(input, tokens(&["repo"]));
    }

    #[test]
    fn test_second_pass_sees_only_residue() {
        let shared = OptionSchema::new().flag("--debug");
        let command = OptionSchema::new().valued("--comment", ".*");
        let mut input = tokens(&["--comment", "hi", "--debug", "repo"]);

        let first = extract_options(&mut input, &shared).unwrap();
        let second = extract_options(&mut input, &command).unwrap();

        assert_eq!(first, tokens(&["--debug"]));
        assert_eq!(second, tokens(&["--comment", "hi"]));
        assert_eq!(input, tokens(&["repo"]));
    }
}
