// crates/upgrade-gate-cli/src/main.rs
// ============================================================================
// Module: Upgrade Gate CLI Entry Point
// Description: Command dispatcher for upgrade plan execution and inspection.
// Purpose: Provide a safe, localized CLI for rehearsing schema upgrades.
// Dependencies: clap, upgrade-gate-config, upgrade-gate-core, serde_json, thiserror.
// ============================================================================

//! ## Overview
//! The Upgrade Gate CLI validates and inspects upgrade plans and applies them
//! to a file-backed state document through the same executor an embedding
//! service uses. All user-facing strings are routed through the i18n catalog.
//! Inputs are untrusted: plan reads are size-limited and plans are validated
//! before execution.
//!
//! The `upgrade` command runs every step to completion or to the first
//! failure. It does not install a signal handler, so the executor's
//! cancellation token is never triggered here; cancelling between steps is
//! available to library callers through `UpgradeExecutor::with_cancellation`.
//! Steps persisted before an interrupted process exits stay applied.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;
use upgrade_gate_cli::state::FileStateRunner;
use upgrade_gate_cli::t;
use upgrade_gate_config::UpgradeGateConfig;
use upgrade_gate_core::RunnerError;
use upgrade_gate_core::Schema;
use upgrade_gate_core::SchemaName;
use upgrade_gate_core::SchemaUniverse;
use upgrade_gate_core::UpgradeExecutor;
use upgrade_gate_core::UpgradePlan;
use upgrade_gate_core::Version;
use upgrade_gate_core::compare_versions;
use upgrade_gate_core::format_migration_ids;
use upgrade_gate_core::runtime::FileAuditSink;
use upgrade_gate_core::runtime::NoopAuditSink;
use upgrade_gate_core::runtime::StderrAuditSink;
use upgrade_gate_core::runtime::UpgradeAuditSink;
use upgrade_gate_core::runtime::step_options;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "upgrade-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply an upgrade plan to a state file.
    Upgrade(UpgradeCommand),
    /// Upgrade plan inspection utilities.
    Plan {
        /// Selected plan subcommand.
        #[command(subcommand)]
        command: PlanCommand,
    },
    /// Version utilities.
    Version {
        /// Selected version subcommand.
        #[command(subcommand)]
        command: VersionCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Plan subcommands.
#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Validate an upgrade plan and print its fingerprint.
    Validate(PlanArgs),
    /// Print each step's operations in dispatch order.
    Show(PlanArgs),
}

/// Version subcommands.
#[derive(Subcommand, Debug)]
enum VersionCommand {
    /// Compare two versions at release granularity.
    Compare(VersionCompareCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for the upgrade command.
#[derive(Args, Debug)]
struct UpgradeCommand {
    /// Path to the upgrade plan JSON file.
    #[arg(long, value_name = "PATH")]
    plan: PathBuf,
    /// Path to the upgrade state JSON file.
    #[arg(long, value_name = "PATH")]
    state: PathBuf,
    /// Optional config file path (defaults to upgrade-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Skip the installed version check.
    #[arg(long, action = ArgAction::SetTrue)]
    skip_version_check: bool,
}

/// Arguments shared by plan subcommands.
#[derive(Args, Debug)]
struct PlanArgs {
    /// Path to the upgrade plan JSON file.
    #[arg(long, value_name = "PATH")]
    plan: PathBuf,
    /// Optional config file path (defaults to upgrade-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for version comparison.
#[derive(Args, Debug)]
struct VersionCompareCommand {
    /// Left-hand version.
    left: String,
    /// Right-hand version.
    right: String,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to upgrade-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Upgrade(command) => command_upgrade(&command),
        Commands::Plan {
            command,
        } => command_plan(&command),
        Commands::Version {
            command,
        } => command_version(&command),
        Commands::Config {
            command,
        } => command_config(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Upgrade Command
// ============================================================================

/// Executes the `upgrade` command.
fn command_upgrade(command: &UpgradeCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let universe = config_universe(&config)?;
    let plan = load_plan(&command.plan, &config, &universe)?;
    let audit = build_audit_sink(&config)?;

    if command.skip_version_check {
        write_stderr_line(&t!("upgrade.warn.version_check_skipped", from = plan.from))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    let state_path = command.state.clone();
    let factory = move |names: Vec<SchemaName>, schemas: Vec<Schema>| {
        FileStateRunner::open(&state_path, names, schemas)
            .map_err(|err| RunnerError::Construction(err.to_string()))
    };
    let executor =
        UpgradeExecutor::new(universe, config.service_name()).with_audit_sink(audit);
    let outcome = executor
        .run(factory, &plan, command.skip_version_check)
        .map_err(|err| CliError::new(t!("upgrade.failed", error = err)))?;

    write_stdout_line(&t!(
        "upgrade.ok",
        steps = outcome.steps_applied,
        from = plan.from,
        to = plan.to
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Selects the audit sink described by the configuration.
fn build_audit_sink(config: &UpgradeGateConfig) -> CliResult<Arc<dyn UpgradeAuditSink>> {
    if !config.audit.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.audit.path {
        Some(path) => {
            let path = Path::new(path.trim());
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(t!("audit.open_failed", path = path.display(), error = err))
            })?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Plan Commands
// ============================================================================

/// Dispatches plan subcommands.
fn command_plan(command: &PlanCommand) -> CliResult<ExitCode> {
    match command {
        PlanCommand::Validate(args) => command_plan_validate(args),
        PlanCommand::Show(args) => command_plan_show(args),
    }
}

/// Executes the plan validation command.
fn command_plan_validate(args: &PlanArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let universe = config_universe(&config)?;
    let plan = load_plan(&args.plan, &config, &universe)?;
    let hash = plan
        .canonical_hash()
        .map_err(|err| CliError::new(t!("plan.hash_failed", error = err)))?;

    write_stdout_line(&t!(
        "plan.validate.ok",
        steps = plan.steps.len(),
        from = plan.from,
        to = plan.to
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&t!("plan.hash", hash = hash))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the plan show command.
fn command_plan_show(args: &PlanArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let universe = config_universe(&config)?;
    let plan = load_plan(&args.plan, &config, &universe)?;
    let hash = plan
        .canonical_hash()
        .map_err(|err| CliError::new(t!("plan.hash_failed", error = err)))?;
    let output = render_plan(&plan, &hash.to_string());
    write_stdout_bytes(output.as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Renders a plan as operator-readable text in dispatch order.
fn render_plan(plan: &UpgradePlan, hash: &str) -> String {
    let mut output = t!("plan.show.header", from = plan.from, to = plan.to, hash = hash);
    output.push('\n');
    for (index, step) in plan.steps.iter().enumerate() {
        output.push_str(&t!("plan.show.step", step = index, version = step.version));
        output.push('\n');
        let options = step_options(step);
        if options.operations.is_empty() {
            output.push_str(&t!("plan.show.no_operations"));
            output.push('\n');
        }
        for operation in &options.operations {
            output.push_str(&t!(
                "plan.show.operation",
                schema = operation.schema_name,
                kind = operation.kind,
                targets = format_migration_ids(&operation.target_versions)
            ));
            output.push('\n');
        }
        if !step.out_of_band_migration_ids.is_empty() {
            output.push_str(&t!(
                "plan.show.out_of_band",
                ids = format_migration_ids(&step.out_of_band_migration_ids)
            ));
            output.push('\n');
        }
    }
    output
}

// ============================================================================
// SECTION: Version Commands
// ============================================================================

/// Dispatches version subcommands.
fn command_version(command: &VersionCommand) -> CliResult<ExitCode> {
    match command {
        VersionCommand::Compare(args) => command_version_compare(args),
    }
}

/// Executes the version comparison command.
fn command_version_compare(args: &VersionCompareCommand) -> CliResult<ExitCode> {
    let left = parse_version(&args.left)?;
    let right = parse_version(&args.right)?;
    let label = match compare_versions(left, right) {
        Ordering::Less => t!("version.compare.less"),
        Ordering::Equal => t!("version.compare.equal"),
        Ordering::Greater => t!("version.compare.greater"),
    };
    write_stdout_line(&label).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Parses a version argument.
fn parse_version(raw: &str) -> CliResult<Version> {
    Version::parse(raw).map_err(|err| CliError::new(t!("version.parse_failed", error = err)))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = UpgradeGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let universe = config_universe(&config)?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line(&t!("config.validate.service", service = config.service_name()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    for slot in universe.slots() {
        write_stdout_line(&t!(
            "config.validate.schema",
            schema = slot.name,
            table = slot.migrations_table
        ))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Loads configuration, falling back to defaults when no file is present.
fn load_config(path: Option<&Path>) -> CliResult<UpgradeGateConfig> {
    UpgradeGateConfig::load_or_default(path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Builds the schema universe from configuration.
fn config_universe(config: &UpgradeGateConfig) -> CliResult<SchemaUniverse> {
    config.universe().map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Reads, parses, and validates an upgrade plan.
fn load_plan(
    path: &Path,
    config: &UpgradeGateConfig,
    universe: &SchemaUniverse,
) -> CliResult<UpgradePlan> {
    let bytes =
        read_bytes_with_limit(path, config.limits.max_plan_bytes).map_err(|err| match err {
            ReadLimitError::Io(err) => {
                CliError::new(t!("plan.read_failed", path = path.display(), error = err))
            }
            ReadLimitError::TooLarge {
                size,
                limit,
            } => CliError::new(t!(
                "input.read_too_large",
                kind = t!("input.kind.plan"),
                path = path.display(),
                size = size,
                limit = limit
            )),
        })?;
    let plan: UpgradePlan = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(t!("plan.parse_failed", path = path.display(), error = err)))?;
    plan.validate(universe)
        .map_err(|err| CliError::new(t!("plan.invalid", path = path.display(), error = err)))?;
    Ok(plan)
}

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
