use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use dbc_core::manifest::{CallOutcome, CompiledManifest, ExecutionResult};
use dbc_core::{Error, Manifest, Value, ViolationPolicy};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// DBC — design-by-contract runner
///
/// Validate, fingerprint, and run JSON contract manifests.
#[derive(Parser)]
#[command(name = "dbc", version, about, long_about = None)]
struct Cli {
    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a manifest (structure + expressions)
    Validate {
        /// Path to manifest .json file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a manifest's guarded target
    Run {
        /// Path to manifest .json file
        file: PathBuf,
        /// Arguments for one call, as a JSON array (repeat for more calls)
        #[arg(long = "args", value_name = "JSON")]
        args: Vec<String>,
        /// Override the manifest's violation policy
        #[arg(long, value_parser = parse_policy)]
        on_violation: Option<ViolationPolicy>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the SHA-256 fingerprint of a manifest
    Hash {
        /// Path to manifest .json file
        file: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match cli.command {
        Commands::Validate { file, json } => cmd_validate(&file, json, cli.quiet),
        Commands::Run {
            file,
            args,
            on_violation,
            json,
        } => cmd_run(&file, &args, on_violation, json, cli.quiet),
        Commands::Hash { file } => cmd_hash(&file),
        Commands::Version => {
            println!("dbc {} (dbc-core {})", env!("CARGO_PKG_VERSION"), env!("CARGO_PKG_VERSION"));
            0
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_policy(s: &str) -> Result<ViolationPolicy, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

// ── Loading ───────────────────────────────────────────────

enum LoadError {
    /// The file could not be read (exit 2)
    Unreadable(String),
    /// The file is not a manifest (exit 1)
    Invalid(Error),
}

impl LoadError {
    /// Print to stderr and return the exit code
    fn report(&self) -> i32 {
        match self {
            LoadError::Unreadable(message) => {
                eprintln!("{} {}", "error:".red().bold(), message);
                2
            }
            LoadError::Invalid(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                1
            }
        }
    }
}

fn load(file: &Path) -> Result<Manifest, LoadError> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| LoadError::Unreadable(format!("cannot read {}: {}", file.display(), e)))?;
    Manifest::from_json(&text).map_err(LoadError::Invalid)
}

fn parse_call_args(raw: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => Ok(items.iter().map(Value::from_json).collect()),
        Ok(other) => Err(format!("--args must be a JSON array, found {}", other)),
        Err(e) => Err(format!("--args is not valid JSON: {}", e)),
    }
}

// ── Commands ──────────────────────────────────────────────

fn cmd_validate(file: &Path, json: bool, quiet: bool) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(err) => {
            if let (LoadError::Invalid(e), true) = (&err, json) {
                print_validation(false, Some(e));
            }
            return err.report();
        }
    };

    match manifest.validate() {
        Ok(()) => {
            if json {
                print_validation(true, None);
            } else if !quiet {
                println!("{} {} is valid", "✓".green().bold(), file.display());
            }
            0
        }
        Err(e) => {
            if json {
                print_validation(false, Some(&e));
            }
            eprintln!("{} {}", "error:".red().bold(), e);
            1
        }
    }
}

fn print_validation(valid: bool, error: Option<&Error>) {
    let messages: Vec<String> = error.map(|e| e.to_string()).into_iter().collect();
    let report = serde_json::json!({
        "valid": valid,
        "errors": if valid { 0 } else { 1 },
        "messages": messages,
    });
    println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
}

fn cmd_run(
    file: &Path,
    raw_args: &[String],
    policy: Option<ViolationPolicy>,
    json: bool,
    quiet: bool,
) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(err) => return err.report(),
    };

    let mut calls = Vec::with_capacity(raw_args.len().max(1));
    for raw in raw_args {
        match parse_call_args(raw) {
            Ok(args) => calls.push(args),
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                return 2;
            }
        }
    }
    if calls.is_empty() {
        calls.push(Vec::new());
    }

    let compiled = match manifest.compile() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return 1;
        }
    };
    let compiled = match policy {
        Some(policy) => compiled.with_policy(policy),
        None => compiled,
    };

    let result = if compiled.is_async() {
        run_async(&compiled, &calls, raw_args.is_empty())
    } else {
        compiled.execute(&calls)
    };

    match result {
        Ok(result) => {
            if json {
                match serde_json::to_string_pretty(&result) {
                    Ok(text) => println!("{}", text),
                    Err(e) => {
                        eprintln!("{} {}", "error:".red().bold(), e);
                        return 2;
                    }
                }
            } else if !quiet {
                print_result(&result);
            }
            if let Some(error) = &result.error {
                eprintln!("{} {}", "error:".red().bold(), error);
            }
            if result.success {
                0
            } else {
                1
            }
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            2
        }
    }
}

fn run_async(
    compiled: &CompiledManifest,
    calls: &[Vec<Value>],
    no_args: bool,
) -> dbc_core::Result<ExecutionResult> {
    if !no_args {
        tracing::warn!("asynchronous manifests call with their async_args; --args values only set the call count");
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|e| Error::ExecutionError(format!("Failed to start runtime: {}", e)))?;
    runtime.block_on(compiled.execute_async(calls.len()))
}

fn cmd_hash(file: &Path) -> i32 {
    let manifest = match load(file) {
        Ok(m) => m,
        Err(err) => return err.report(),
    };
    match manifest.fingerprint() {
        Ok(hash) => {
            println!("{}", hash);
            0
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            2
        }
    }
}

fn print_result(result: &ExecutionResult) {
    let name = if result.name.is_empty() {
        "manifest"
    } else {
        result.name.as_str()
    };
    println!("{} {}", "Running".bold(), name);

    for call in &result.calls {
        let args: Vec<String> = call.args.iter().map(Value::to_string).collect();
        let label = format!("call #{} ({})", call.index, args.join(", "));
        match &call.outcome {
            CallOutcome::Returned { value } => {
                println!("  {} {} → {}", "✓".green(), label, value);
            }
            CallOutcome::Violated(v) => {
                println!("  {} {} → {} violated: {}", "✗".yellow(), label, v.kind, v.message);
            }
            CallOutcome::Failed { error } => {
                println!("  {} {} → failed: {}", "✗".red(), label, error);
            }
        }
        for change in &call.changes {
            println!(
                "      {} {} → {}",
                change.field.cyan(),
                change.old_value,
                change.new_value
            );
        }
    }

    let state: Vec<String> = result
        .final_state
        .iter()
        .map(|(k, v)| format!("{} = {}", k, v))
        .collect();
    println!("{} {{{}}}", "State".bold(), state.join(", "));
}
