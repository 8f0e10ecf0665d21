use std::path::PathBuf;
use std::time::Duration;

use borg_command_core::{CommandKind, OptionSchema, shared_schema};
use borg_command_exec::{BorgProcess, ExecutionOutcome, RunConfig};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific command kind enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliCommandKind {
    Init,
    Create,
    List,
    Info,
    Config,
    ExportTar,
}

impl From<CliCommandKind> for CommandKind {
    fn from(kind: CliCommandKind) -> Self {
        match kind {
            CliCommandKind::Init => Self::Init,
            CliCommandKind::Create => Self::Create,
            CliCommandKind::List => Self::List,
            CliCommandKind::Info => Self::Info,
            CliCommandKind::Config => Self::Config,
            CliCommandKind::ExportTar => Self::ExportTar,
        }
    }
}

/// Output format for printed documents.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "borg-command")]
#[command(about = "Build, validate and run borg commands")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the supported borg commands and their option schemas.
    Commands(CommandsArgs),
    /// Validate arguments and print the resulting command vector.
    Build(BuildArgs),
    /// Print the path-like arguments of a built command.
    Paths(PathsArgs),
    /// Build a command, run it and print the decoded output.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct CommandsArgs {
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct BuildArgs {
    /// Borg command to build.
    command: CliCommandKind,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
    /// Command arguments, passed after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct PathsArgs {
    /// Borg command to build.
    command: CliCommandKind,
    /// Archive name marking the repository token to skip.
    #[arg(long)]
    archive: String,
    /// Command arguments, passed after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Borg command to run.
    command: CliCommandKind,
    /// YAML run configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Working directory of the borg process.
    #[arg(long)]
    cwd: Option<PathBuf>,
    /// Seconds before the borg process is killed.
    #[arg(long)]
    timeout: Option<u64>,
    /// Borg binary to run instead of `borg` on PATH.
    #[arg(long)]
    program: Option<PathBuf>,
    /// Extra environment variable as KEY=VALUE (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE")]
    env: Vec<String>,
    /// Fail unless borg exits with success or warning.
    #[arg(long)]
    strict: bool,
    /// Command arguments, passed after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Commands(args) => run_commands(args).map(|()| 0),
        Command::Build(args) => run_build(args).map(|()| 0),
        Command::Paths(args) => run_paths(args).map(|()| 0),
        Command::Run(args) => run_borg(args),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_document<T: Serialize>(value: &T, format: CliOutputFormat) -> Result<(), String> {
    let rendered = match format {
        CliOutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("Failed to serialize output: {e}"))?,
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("Failed to serialize output: {e}"))?
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

// ---------------------------------------------------------------------------
// commands
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CommandListing<'a> {
    name: String,
    mandatory: bool,
    options: &'a OptionSchema,
}

#[derive(Serialize)]
struct CommandsOutput<'a> {
    shared: &'a OptionSchema,
    commands: Vec<CommandListing<'a>>,
}

fn run_commands(args: CommandsArgs) -> Result<(), String> {
    let commands = CommandKind::ALL
        .iter()
        .map(|kind| {
            let spec = kind.spec();
            CommandListing {
                name: spec.command_name().into_owned(),
                mandatory: spec.mandatory.is_some(),
                options: &spec.options,
            }
        })
        .collect();
    let output = CommandsOutput {
        shared: shared_schema(),
        commands,
    };
    print_document(&output, args.format)
}

// ---------------------------------------------------------------------------
// build / paths
// ---------------------------------------------------------------------------

fn run_build(args: BuildArgs) -> Result<(), String> {
    let kind = CommandKind::from(args.command);
    let command = kind.build(args.args).map_err(|e| e.to_string())?;
    print_document(&command, args.format)
}

fn run_paths(args: PathsArgs) -> Result<(), String> {
    let kind = CommandKind::from(args.command);
    let process =
        BorgProcess::new(kind, args.args, RunConfig::default()).map_err(|e| e.to_string())?;
    for path in process.paths(&args.archive) {
        println!("{path}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_borg(args: RunArgs) -> Result<i32, String> {
    let config = resolve_config(&args)?;
    let kind = CommandKind::from(args.command);
    let process = BorgProcess::new(kind, args.args, config).map_err(|e| e.to_string())?;
    debug!(command = %process.command_line(), strict = args.strict, "running borg");

    let outcome = if args.strict {
        process.must_run().map_err(|e| e.to_string())?
    } else {
        process.run().map_err(|e| e.to_string())?
    };
    print_outcome(&outcome)?;

    if args.strict {
        Ok(0)
    } else {
        Ok(outcome.exit_code)
    }
}

fn resolve_config(args: &RunArgs) -> Result<RunConfig, String> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)
            .map_err(|e| format!("Failed to load run config '{}': {e}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(program) = &args.program {
        config = config.with_program(program);
    }
    if let Some(cwd) = &args.cwd {
        config = config.with_working_dir(cwd);
    }
    if let Some(secs) = args.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    for pair in &args.env {
        let (key, value) = parse_env_pair(pair)?;
        config = config.with_env(key, value);
    }
    Ok(config)
}

fn parse_env_pair(pair: &str) -> Result<(&str, &str), String> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(format!("Invalid --env value '{pair}', expected KEY=VALUE")),
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    exit_class: String,
    #[serde(flatten)]
    outcome: &'a ExecutionOutcome,
}

fn print_outcome(outcome: &ExecutionOutcome) -> Result<(), String> {
    let output = RunOutput {
        exit_class: outcome.exit_class().to_string(),
        outcome,
    };
    print_document(&output, CliOutputFormat::Json)
}
