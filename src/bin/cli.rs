//! Vcomm CLI - console front-end
//!
//! Brings the virtual null modem up, smoke-tests it, then holds the link
//! until the process is interrupted. Exit codes distinguish each failure
//! class for automation.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vcomm_core::cli::{print_exit_codes, remediation_hints, CliResult, ExitCodes};
use vcomm_core::config::AppConfig;
use vcomm_core::core::capture::{CaptureConfig, CaptureFormat};
use vcomm_core::core::link::LinkManager;

/// Capture record format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaptureFormatArg {
    /// Timestamp, direction, hex bytes
    Hex,
    /// Timestamp, direction, lossy text
    Text,
}

impl From<CaptureFormatArg> for CaptureFormat {
    fn from(arg: CaptureFormatArg) -> Self {
        match arg {
            CaptureFormatArg::Hex => CaptureFormat::Hex,
            CaptureFormatArg::Text => CaptureFormat::Text,
        }
    }
}

/// Vcomm CLI
#[derive(Parser, Debug)]
#[command(
    name = "vcomm-cli",
    author = "Vcomm Team",
    version,
    about = "Virtual null modem manager",
    long_about = None
)]
struct Cli {
    /// First endpoint path
    #[arg(short = 'a', long)]
    device_a: Option<String>,

    /// Second endpoint path
    #[arg(short = 'b', long)]
    device_b: Option<String>,

    /// Baud rate for the loopback test
    #[arg(long)]
    baud: Option<u32>,

    /// Octal permission mode applied to both endpoints (e.g. 666)
    #[arg(long)]
    permissions: Option<String>,

    /// Skip the loopback smoke test after startup
    #[arg(long)]
    no_test: bool,

    /// Capture relayed traffic to a file
    #[arg(long)]
    capture: bool,

    /// Capture record format
    #[arg(long, value_enum, default_value_t = CaptureFormatArg::Hex)]
    capture_format: CaptureFormatArg,

    /// Capture file path (timestamped file in the scratch dir by default)
    #[arg(long)]
    capture_file: Option<PathBuf>,

    /// Print a machine-readable session summary after startup
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Print the exit code table and exit
    #[arg(long)]
    exit_codes: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        tracing::Level::ERROR
    } else if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if cli.exit_codes {
        print_exit_codes();
        return Ok(ExitCode::SUCCESS);
    }

    let result = run(&cli)?;
    if let Some(msg) = result.message() {
        if result.is_success() {
            println!("{msg}");
        } else {
            eprintln!("Error: {msg}");
        }
    }
    Ok(result.to_exit_code())
}

fn run(cli: &Cli) -> anyhow::Result<CliResult> {
    let mut config = AppConfig::load().unwrap_or_default();
    if let Some(device_a) = &cli.device_a {
        config.device_a = device_a.clone();
    }
    if let Some(device_b) = &cli.device_b {
        config.device_b = device_b.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if let Some(permissions) = &cli.permissions {
        if u32::from_str_radix(permissions.trim(), 8).is_err() {
            return Ok(CliResult::error(
                ExitCodes::INVALID_ARGS,
                format!("invalid octal permission mode: {permissions}"),
            ));
        }
        config.permissions = permissions.clone();
    }
    if cli.capture {
        config.capture = CaptureConfig {
            enabled: true,
            format: cli.capture_format.into(),
            path: cli.capture_file.clone(),
        };
    }

    let mut link = LinkManager::new(config.link_config());

    // Stop on SIGINT/SIGTERM so no orphaned multiplexer or stale device
    // nodes are left behind.
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })?;
    }

    if !cli.quiet {
        eprintln!("Creating null modem...");
    }

    if let Err(e) = link.start() {
        // main prints the error line itself; only the hints go here.
        let hints = remediation_hints(&e);
        if !hints.is_empty() {
            eprintln!("\nTroubleshooting:");
            for hint in hints {
                eprintln!("  - {hint}");
            }
        }
        return Ok(CliResult::from(&e));
    }

    let (device_a, device_b) = {
        let (a, b) = link.devices();
        (a.to_string(), b.to_string())
    };

    let test_passed = if cli.no_test {
        None
    } else {
        let passed = link.test_link();
        if !passed {
            link.stop();
            return Ok(CliResult::error(
                ExitCodes::TEST_FAILED,
                "loopback test failed",
            ));
        }
        Some(passed)
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "device_a": device_a,
                "device_b": device_b,
                "test_passed": test_passed,
            })
        );
    } else if !cli.quiet {
        println!("Devices created:");
        println!("  {device_a}");
        println!("  {device_b}");
        println!();
        println!("Point both of your serial programs at the paths above;");
        println!("data written to one endpoint appears on the other.");
        println!();
        println!("Press Ctrl+C to stop...");
    }

    // Hold the link up; is_active() self-corrects within one interval when
    // the multiplexer dies out-of-band.
    while running.load(Ordering::SeqCst) && link.is_active() {
        std::thread::sleep(Duration::from_secs(1));
    }

    let interrupted = !running.load(Ordering::SeqCst);
    link.stop();

    if interrupted {
        Ok(CliResult::success_with_message("Stopped."))
    } else {
        Ok(CliResult::error(
            ExitCodes::LINK_LOST,
            "link lost: multiplexer exited or devices disappeared",
        ))
    }
}
