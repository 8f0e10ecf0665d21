//! borg exit code classification.
//!
//! borg documents its return codes as `0` success, `1` warning (the
//! operation reached its normal end with warnings), `2` error and `128+N`
//! killed by signal `N`.

use std::fmt;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Classified exit status.
///
/// # Examples
///
/// ```
/// use borg_command_exec::ExitClass;
///
/// assert_eq!(ExitClass::from_code(137), ExitClass::Signaled(9));
/// assert!(ExitClass::from_code(1).is_ok());
/// assert!(!ExitClass::from_code(2).is_ok());
/// assert_eq!(ExitClass::from_code(137).to_string(), "Killed by signal 9");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "class", content = "value")]
pub enum ExitClass {
    Success,
    Warning,
    Error,
    /// Terminated by the contained signal number.
    Signaled(i32),
    /// Any code outside the documented contract.
    Unknown(i32),
}

impl ExitClass {
    /// Classifies a numeric exit code.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::Warning,
            2 => Self::Error,
            129..=255 => Self::Signaled(code - 128),
            other => Self::Unknown(other),
        }
    }

    /// Returns `true` for success and warning, the outcomes a strict caller
    /// accepts.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Success | Self::Warning)
    }
}

impl fmt::Display for ExitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Warning => write!(f, "Warning"),
            Self::Error => write!(f, "Error"),
            Self::Signaled(signal) => write!(f, "Killed by signal {signal}"),
            Self::Unknown(_) => write!(f, "Unknown error"),
        }
    }
}

/// Converts a process status into a numeric exit code, mapping termination
/// by signal `N` to `128+N`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    signal_code(status).unwrap_or(-1)
}

#[cfg(unix)]
fn signal_code(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;

    status.signal().map(|signal| 128 + signal)
}

#[cfg(not(unix))]
fn signal_code(_status: ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_codes() {
        assert_eq!(ExitClass::from_code(0), ExitClass::Success);
        assert_eq!(ExitClass::from_code(1), ExitClass::Warning);
        assert_eq!(ExitClass::from_code(2), ExitClass::Error);
        assert_eq!(ExitClass::from_code(130), ExitClass::Signaled(2));
        assert_eq!(ExitClass::from_code(137), ExitClass::Signaled(9));
    }

    #[test]
    fn test_out_of_contract_codes() {
        assert_eq!(ExitClass::from_code(3), ExitClass::Unknown(3));
        assert_eq!(ExitClass::from_code(128), ExitClass::Unknown(128));
        assert_eq!(ExitClass::from_code(-1), ExitClass::Unknown(-1));
        assert!(!ExitClass::from_code(3).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_from_signal_status() {
        use std::os::unix::process::ExitStatusExt;

        // Raw wait status: low 7 bits carry the terminating signal.
        let killed = ExitStatus::from_raw(9);
        assert_eq!(exit_code(killed), 137);

        let exited = ExitStatus::from_raw(2 << 8);
        assert_eq!(exit_code(exited), 2);
    }
}
