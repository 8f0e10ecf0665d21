//! Run configuration for borg invocations.
//!
//! Defines the YAML-serializable settings applied when a command vector is
//! spawned: which binary to run, the working directory, extra environment
//! variables and an optional timeout.
//!
//! # Example YAML
//!
//! ```yaml
//! program: /usr/local/bin/borg
//! working_dir: /var/backups
//! env:
//!   BORG_PASSPHRASE: hunter2
//!   BORG_RSH: ssh -i /root/.ssh/backup
//! timeout_ms: 3600000
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ExecError, Result};

/// Environment variable borg uses as base for its config and cache dirs.
pub const BASE_DIR_VAR: &str = "BORG_BASE_DIR";

/// Locale variable seeded before spawning.
pub const LOCALE_VAR: &str = "LANG";

/// Locale used when the caller sets none.
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";

/// Settings applied when spawning a command.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use borg_command_exec::RunConfig;
///
/// let config = RunConfig::default()
///     .with_working_dir("/var/backups")
///     .with_env("BORG_PASSPHRASE", "secret")
///     .with_timeout(Duration::from_secs(60));
///
/// let env = config.effective_env();
/// assert_eq!(env["BORG_BASE_DIR"], "/var/backups");
/// assert_eq!(env["LANG"], "en_US.UTF-8");
/// assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Binary spawned in place of the vector's first token.
    pub program: Option<PathBuf>,
    /// Working directory of the child process.
    pub working_dir: Option<PathBuf>,
    /// Variables set on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// Milliseconds before the child is killed.
    pub timeout_ms: Option<u64>,
}

impl RunConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Io`] if the file cannot be read, or
    /// [`ExecError::Config`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|err| ExecError::Config(err.to_string()))
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Io`] if the file cannot be written, or
    /// [`ExecError::Config`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self).map_err(|err| ExecError::Config(err.to_string()))
    }

    /// Sets the binary to spawn.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Sets the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds one environment variable.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the timeout, rounded up to whole milliseconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let mut millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        if Duration::from_millis(millis) < timeout {
            millis = millis.saturating_add(1);
        }
        self.timeout_ms = Some(millis);
        self
    }

    /// Returns the timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns the caller's variables plus the borg defaults.
    ///
    /// `BORG_BASE_DIR` is seeded from the working directory and `LANG` with
    /// a UTF-8 English locale, each only when the caller left it unset or
    /// empty.
    pub fn effective_env(&self) -> BTreeMap<String, String> {
        let mut env = self.env.clone();
        if let Some(dir) = &self.working_dir {
            if is_unset(&env, BASE_DIR_VAR) {
                env.insert(BASE_DIR_VAR.to_string(), dir.display().to_string());
            }
        }
        if is_unset(&env, LOCALE_VAR) {
            env.insert(LOCALE_VAR.to_string(), DEFAULT_LOCALE.to_string());
        }
        env
    }
}

fn is_unset(env: &BTreeMap<String, String>, key: &str) -> bool {
    env.get(key).is_none_or(|value| value.is_empty())
}
