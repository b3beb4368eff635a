use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use consulkv_core::{
    probe, ConfigProvider, EnvConfig, EnvVars, GlobalSettings, KvOperation, KvRunner, Outcome,
    RequestMode, UreqTransport,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "consulkv", version, about = "Read, write or delete Consul K/V pairs")]
struct Cli {
    /// JSON file with global settings, layered over CONSULKV_* variables.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Append injected variables to this file as KEY=value lines.
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a key and emit it as KEY=value.
    Read(ReadArgs),
    /// Write a value to a key.
    Write(WriteArgs),
    /// Delete a key.
    Delete(DeleteArgs),
    /// Run a JSON array of operations in order.
    Batch(BatchArgs),
    /// Check that the Consul agent answers.
    Probe(ProbeArgs),
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    key: String,
    #[arg(long)]
    host_url: Option<String>,
    #[arg(long)]
    api_uri: Option<String>,
    /// ACL token, or a ${NAME} reference to an environment variable.
    #[arg(long)]
    token: Option<String>,
    /// Connect timeout in milliseconds.
    #[arg(long)]
    timeout_connect: Option<u64>,
    /// Response timeout in milliseconds.
    #[arg(long)]
    timeout_response: Option<u64>,
    /// Log the resolved URL, response headers and raw body.
    #[arg(long)]
    debug: bool,
    #[arg(long)]
    ignore_global_settings: bool,
}

impl Target {
    fn into_operation(self, mode: RequestMode) -> KvOperation {
        KvOperation {
            key: self.key,
            mode,
            host_url: self.host_url,
            api_uri: self.api_uri,
            acl_token: self.token,
            timeout_connect_ms: self.timeout_connect,
            timeout_response_ms: self.timeout_response,
            debug: self.debug.then_some(true),
            ignore_global_settings: self.ignore_global_settings,
            ..KvOperation::default()
        }
    }
}

#[derive(Args)]
struct ReadArgs {
    #[command(flatten)]
    target: Target,
    /// Variable name for the value; `.` and `/` become `_`. Defaults to the key.
    #[arg(long)]
    env_key: Option<String>,
}

#[derive(Args)]
struct WriteArgs {
    #[command(flatten)]
    target: Target,
    #[arg(long)]
    value: String,
}

#[derive(Args)]
struct DeleteArgs {
    #[command(flatten)]
    target: Target,
}

#[derive(Args)]
struct BatchArgs {
    /// JSON array of operations, e.g. [{"key":"app/db","envKey":"DB_URL"}].
    #[arg(long)]
    file: PathBuf,
}

#[derive(Args)]
struct ProbeArgs {
    #[arg(long)]
    host_url: Option<String>,
    /// Path to probe, default /v1/status/leader.
    #[arg(long)]
    test_uri: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let global = load_settings(cli.settings.as_deref())?;
    let mut env: EnvVars = std::env::vars().collect();

    match cli.command {
        Command::Read(args) => {
            let mut op = args.target.into_operation(RequestMode::Read);
            op.env_key = args.env_key;
            let runner = KvRunner::new(&global, UreqTransport);
            let outcome = runner
                .run(&op, &mut env)
                .with_context(|| format!("consul read of `{}` failed", op.key))?;
            emit(&outcome, cli.env_file.as_deref())?;
        }
        Command::Write(args) => {
            let mut op = args.target.into_operation(RequestMode::Write);
            op.value = Some(args.value);
            let runner = KvRunner::new(&global, UreqTransport);
            let outcome = runner
                .run(&op, &mut env)
                .with_context(|| format!("consul write of `{}` failed", op.key))?;
            emit(&outcome, cli.env_file.as_deref())?;
        }
        Command::Delete(args) => {
            let op = args.target.into_operation(RequestMode::Delete);
            let runner = KvRunner::new(&global, UreqTransport);
            let outcome = runner
                .run(&op, &mut env)
                .with_context(|| format!("consul delete of `{}` failed", op.key))?;
            emit(&outcome, cli.env_file.as_deref())?;
        }
        Command::Batch(args) => {
            let raw = fs::read_to_string(&args.file)
                .with_context(|| format!("failed to read batch file {}", args.file.display()))?;
            let ops: Vec<KvOperation> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid batch file {}", args.file.display()))?;
            let runner = KvRunner::new(&global, UreqTransport);
            let results = runner.run_batch(&ops, &mut env);

            let mut failed = 0;
            for result in &results {
                match result {
                    Ok(outcome) => emit(outcome, cli.env_file.as_deref())?,
                    Err(_) => failed += 1,
                }
            }
            if failed > 0 {
                bail!("{failed} of {} consul operations failed", results.len());
            }
        }
        Command::Probe(args) => {
            let host = args
                .host_url
                .or_else(|| global.host_url.clone())
                .context("no consul host url configured")?;
            let test_uri = args.test_uri.or_else(|| global.test_uri.clone());
            let status = probe(&UreqTransport, &host, test_uri.as_deref(), global.timeouts())
                .with_context(|| format!("unable to connect to consul at {host}"))?;
            println!("{status}");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `CONSULKV_*` variables, overlaid by the settings file when one is given.
fn load_settings(path: Option<&Path>) -> Result<GlobalSettings> {
    let from_env = EnvConfig::from_process()
        .global_settings()
        .unwrap_or_default();
    let Some(path) = path else {
        return Ok(from_env);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let from_file: GlobalSettings = serde_json::from_str(&raw)
        .with_context(|| format!("invalid settings file {}", path.display()))?;
    Ok(from_env.overlay(from_file))
}

/// Print the outcome on stdout; READ results are also appended to `env_file`.
///
/// Values spanning several lines cannot be expressed as one `KEY=value` line
/// and are rejected.
fn emit(outcome: &Outcome, env_file: Option<&Path>) -> Result<()> {
    let (Some(env_key), Some(value)) = (&outcome.env_key, &outcome.value) else {
        println!("{}", outcome.body.trim());
        return Ok(());
    };
    if value.contains(['\n', '\r']) {
        bail!("value of `{env_key}` spans multiple lines and cannot be written as {env_key}=value");
    }

    println!("{env_key}={value}");
    if let Some(path) = env_file {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open env file {}", path.display()))?;
        writeln!(file, "{env_key}={value}")
            .with_context(|| format!("failed to write env file {}", path.display()))?;
        info!(env_key = %env_key, file = %path.display(), "stored env variable");
    }
    Ok(())
}
