//! WebTransport interop browser client
//!
//! Drives a real browser through WebDriver to run one WebTransport interop
//! test case against a server, then writes what the page reports to disk
//! for the interop runner to check.
//!
//! ## Inputs
//!
//! - `TESTCASE`: handshake, transfer, transfer-unidirectional-receive,
//!   transfer-bidirectional-receive or transfer-datagram-receive
//! - `REQUESTS`: whitespace-separated request URLs
//! - `PROTOCOLS`: offered application protocols
//! - `CERTHASH`: server certificate hash
//!
//! ## Usage
//!
//! ```bash
//! # Run the test case named by TESTCASE in headless Chrome
//! wt-interop-browser run
//!
//! # Use Firefox through an already running geckodriver
//! wt-interop-browser run --browser firefox --webdriver-url http://127.0.0.1:4444
//!
//! # Validate the environment without starting a browser
//! wt-interop-browser check --env
//!
//! # Compare downloads with the served files
//! wt-interop-browser verify --endpoint files
//! ```
//!
//! Unsupported test cases exit with code 127, every other failure with 1.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::error;

mod browser;
mod cli;
mod config;
mod executor;
mod files;
mod models;
mod request;
mod results;
mod utils;
mod webdriver;

use browser::{BrowserKind, BrowserSessions, LaunchOptions};
use cli::{Args, CheckArgs, Command, ListArgs, RunArgs, VerifyArgs};
use config::{Config, EnvConfig, HarnessSettings, EXIT_FAILURE};
use executor::{Harness, DEFAULT_SCRIPT_TIMEOUT};
use models::TestCase;
use results::ResultPersister;
use utils::{init_logger, LogLevel};

/// Page exposing the test entry points
const DEFAULT_PAGE_URL: &str = "file:///index.html";

const DEFAULT_QUIT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Local bound on the remote call, on top of the browser-side script timeout
const INVOKE_SLACK: Duration = Duration::from_secs(60);

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logger(LogLevel::resolve(args.log_level, args.verbose));

    let code = match args.command {
        Command::Run(run_args) => run(run_args).await,
        Command::Check(check_args) => check(check_args),
        Command::Verify(verify_args) => verify(verify_args),
        Command::List(list_args) => {
            list_testcases(list_args);
            0
        }
    };

    // Exit without waiting on anything the browser may have left behind
    std::process::exit(code);
}

/// Timeouts after CLI and settings-file overrides
struct Timeouts {
    script: Duration,
    quit: Duration,
    startup: Duration,
}

impl Timeouts {
    fn resolve(args: &RunArgs, settings: &HarnessSettings) -> Self {
        let pick = |cli: Option<u64>, file: Option<u64>, default: Duration| {
            cli.or(file).map(Duration::from_secs).unwrap_or(default)
        };
        Self {
            script: pick(
                args.script_timeout,
                settings.script_timeout_secs,
                DEFAULT_SCRIPT_TIMEOUT,
            ),
            quit: pick(
                args.quit_timeout,
                settings.quit_timeout_secs,
                DEFAULT_QUIT_TIMEOUT,
            ),
            startup: pick(
                args.startup_timeout,
                settings.startup_timeout_secs,
                DEFAULT_STARTUP_TIMEOUT,
            ),
        }
    }
}

async fn run(args: RunArgs) -> i32 {
    let vars = EnvConfig::load();

    // Unsupported test cases exit before the settings file is even read
    if let Err(e) = config::check_testcase(&vars) {
        error!("{}", e);
        return e.exit_code();
    }

    let settings = match HarnessSettings::load_or_default(args.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{:#}", e);
            return EXIT_FAILURE;
        }
    };

    let timeouts = Timeouts::resolve(&args, &settings);
    let page_url = args
        .page_url
        .clone()
        .or_else(|| settings.page_url.clone())
        .unwrap_or_else(|| DEFAULT_PAGE_URL.to_string());

    let mut sessions = BrowserSessions::new(launch_options(&args, &settings), page_url)
        .with_webdriver_url(args.webdriver_url.clone())
        .with_script_timeout(timeouts.script)
        .with_startup_timeout(timeouts.startup)
        .with_quit_timeout(timeouts.quit);

    let code = Harness::new(
        &args.paths.www_root,
        ResultPersister::new(&args.paths.downloads_root),
    )
    .with_timeout(timeouts.script + INVOKE_SLACK)
    .run(&vars, &mut sessions)
    .await;

    sessions.shutdown().await;
    code
}

/// Built-in defaults, then the settings file, then CLI flags
fn launch_options(args: &RunArgs, settings: &HarnessSettings) -> LaunchOptions {
    let browser_settings = match args.browser {
        BrowserKind::Chrome => &settings.chrome,
        BrowserKind::Firefox => &settings.firefox,
    };

    let mut options = LaunchOptions::new(args.browser, browser_settings);
    if let Some(path) = &args.driver_path {
        options = options.with_driver_path(path);
    }
    if let Some(path) = &args.browser_binary {
        options = options.with_binary(path);
    }
    options
}

fn check(args: CheckArgs) -> i32 {
    let vars = EnvConfig::load();
    if args.env {
        vars.print_summary();
        println!();
    }

    match Config::resolve(&vars, &args.www_root) {
        Ok(config) => {
            config.print_summary();
            0
        }
        Err(e) => {
            error!("{}", e);
            println!();
            config::print_env_help();
            e.exit_code()
        }
    }
}

fn verify(args: VerifyArgs) -> i32 {
    match verify_inner(&args) {
        Ok(true) => 0,
        Ok(false) => EXIT_FAILURE,
        Err(e) => {
            error!("{:#}", e);
            EXIT_FAILURE
        }
    }
}

fn verify_inner(args: &VerifyArgs) -> Result<bool> {
    let vars = EnvConfig::load();
    let endpoint = args
        .endpoint
        .clone()
        .or_else(|| {
            vars.requests
                .as_deref()
                .and_then(request::resolve_endpoint)
        })
        .context("No endpoint: pass --endpoint or set REQUESTS")?;
    let protocols = vars
        .protocols
        .as_deref()
        .map(config::parse_protocols)
        .unwrap_or_default();

    let report = results::verify_downloads(
        &args.paths.www_root,
        &args.paths.downloads_root,
        &endpoint,
        &protocols,
    )?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to encode report")?
        );
    } else {
        report.print();
    }
    Ok(report.passed())
}

fn list_testcases(args: ListArgs) {
    println!("\nWebTransport Interop Test Cases\n");

    for testcase in TestCase::all() {
        let kind = if testcase.is_receive() {
            "receive"
        } else if testcase.requires_endpoint() {
            "send"
        } else {
            "session"
        };

        if args.detailed {
            println!(
                "  {:34} {:8} {}()",
                testcase.name(),
                kind,
                testcase.entry_point()
            );
        } else {
            println!("  {}", testcase.name());
        }
    }
    println!();
}
