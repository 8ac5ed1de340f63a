//! Kinetics CLI Application
//!
//! Command-line companion to the kinetics-bindings library:
//! - `info` prints version and build information (queries the native solver
//!   when built with the `native` feature)
//! - `selftest` exercises the logging bridge end to end by driving the raw
//!   callback the way the native library would

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use kinetics_bindings::application;
use kinetics_bindings::ffi::log_callback;
use kinetics_bindings::{KineticsError, LogLevel, LogMessage};
use std::ffi::CString;
use std::sync::{Arc, Mutex};

/// Kinetics CLI - inspect and exercise the native solver bindings
#[derive(Parser, Debug)]
#[command(name = "kinetics-cli")]
#[command(about = "Inspect and exercise the kinetics solver bindings", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print version and build information
    Info {
        /// Emit machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Exercise the logging bridge without a solver installed
    Selftest,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Info { json } => info(json),
        Command::Selftest => selftest(),
    }
}

fn info(json: bool) -> Result<()> {
    let native = cfg!(feature = "native");

    #[cfg(feature = "native")]
    let (solver_version, git_commit) = (
        Some(application::version()?),
        Some(application::git_commit()?),
    );
    #[cfg(not(feature = "native"))]
    let (solver_version, git_commit): (Option<String>, Option<String>) = (None, None);

    if json {
        let payload = serde_json::json!({
            "bindings_version": kinetics_bindings::VERSION,
            "native": native,
            "solver_version": solver_version,
            "solver_git_commit": git_commit,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("kinetics-bindings {}", kinetics_bindings::VERSION);
    match (solver_version, git_commit) {
        (Some(version), Some(commit)) => {
            println!("native solver:  {version} ({commit})");

            #[cfg(feature = "native")]
            for dir in application::data_directories()? {
                println!("data directory: {}", dir.display());
            }
        }
        _ => println!("native solver:  not compiled in (build with --features native)"),
    }

    Ok(())
}

/// Drive the raw logging callback with synthetic events and verify the
/// bridge's dispatch and deferred-error behavior.
fn selftest() -> Result<()> {
    log::info!("running logging bridge selftest");

    let seen: Arc<Mutex<Vec<LogMessage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let id = application::register_log_observer(Box::new(move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    }));

    application::add_console_logging();

    emit(LogLevel::Info, "Selftest", "bridge dispatch check")?;
    emit(LogLevel::Warning, "Selftest", "unicode check: Δ温度 ✓")?;

    application::remove_console_logging();
    application::unregister_log_observer(id);
    application::check_callback_errors()?;

    let delivered = seen.lock().unwrap().len();
    if delivered != 2 {
        bail!("expected 2 deliveries, observed {delivered}");
    }

    // A failing observer must not fail the emitting call; its error has to
    // surface at the next check point instead.
    let id = application::register_log_observer(Box::new(|_| Err("deliberate failure".into())));
    emit(LogLevel::Error, "Selftest", "deferred error check")?;
    application::unregister_log_observer(id);

    match application::check_callback_errors() {
        Err(KineticsError::Callback { source }) => {
            log::debug!("deferred error surfaced as expected: {source}");
        }
        Err(other) => bail!("expected a callback error, got: {other}"),
        Ok(()) => bail!("observer error was lost"),
    }

    println!("selftest passed");
    Ok(())
}

fn emit(level: LogLevel, category: &str, message: &str) -> Result<()> {
    let category = CString::new(category)?;
    let message = CString::new(message)?;
    log_callback(level.code(), category.as_ptr(), message.as_ptr());
    Ok(())
}
