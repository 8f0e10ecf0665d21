//! Execution and output decoding for borg commands.
//!
//! This crate runs command vectors built by [`borg_command_core`] and turns
//! borg's output into [`Record`]s:
//!
//! - [`BorgProcess`]: validated command plus [`RunConfig`], with lenient
//!   ([`run`](BorgProcess::run)) and strict
//!   ([`must_run`](BorgProcess::must_run)) entry points.
//! - [`engine::run_command`]: the underlying engine: buffered capture with
//!   whole-document decoding, or streaming JSON-lines decoding.
//! - [`ExitClass`]: borg's exit code contract (`0` success, `1` warning,
//!   `2` error, `128+N` signal `N`).
//! - [`ProcessFailedError`]: diagnostic report raised by the strict entry
//!   point.
//!
//! # Example
//!
//! ```no_run
//! use borg_command_core::CommandKind;
//! use borg_command_exec::{BorgProcess, RunConfig};
//!
//! let config = RunConfig::default().with_env("BORG_PASSPHRASE", "secret");
//! let process = BorgProcess::new(CommandKind::List, ["/srv/repo"], config).unwrap();
//!
//! let outcome = process.must_run().unwrap();
//! for record in &outcome.stdout_records {
//!     println!("{record:?}");
//! }
//! ```

pub mod config;
pub mod decode;
pub mod engine;
mod error;
mod exit;
mod process;

pub use config::RunConfig;
pub use decode::Record;
pub use engine::{ExecutionOutcome, Stream};
pub use error::{ExecError, ProcessFailedError, Result, command_line};
pub use exit::{ExitClass, exit_code};
pub use process::BorgProcess;
