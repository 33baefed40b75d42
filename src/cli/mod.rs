//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::browser::BrowserKind;
use crate::files::DEFAULT_WWW_ROOT;
use crate::results::DEFAULT_DOWNLOADS_ROOT;
use crate::utils::LogLevel;

/// Browser-driven WebTransport interop client
#[derive(Parser, Debug)]
#[command(name = "wt-interop-browser")]
#[command(version)]
#[command(about = "Run WebTransport interop test cases in a browser")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (overrides --verbose)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the test case named by TESTCASE in a browser
    Run(RunArgs),

    /// Validate the environment and print the resolved configuration
    Check(CheckArgs),

    /// Compare downloaded files with the served ones
    Verify(VerifyArgs),

    /// List supported test cases
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Browser to drive
    #[arg(short, long, value_enum, default_value_t = BrowserKind::Chrome)]
    pub browser: BrowserKind,

    /// Use an already running WebDriver server instead of spawning one
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// WebDriver executable
    #[arg(long)]
    pub driver_path: Option<PathBuf>,

    /// Browser executable
    #[arg(long)]
    pub browser_binary: Option<PathBuf>,

    /// Page exposing the test entry points
    #[arg(long)]
    pub page_url: Option<String>,

    /// Remote call timeout in seconds
    #[arg(long)]
    pub script_timeout: Option<u64>,

    /// Session teardown timeout in seconds
    #[arg(long)]
    pub quit_timeout: Option<u64>,

    /// Driver startup timeout in seconds
    #[arg(long)]
    pub startup_timeout: Option<u64>,

    /// Settings file (YAML or JSON)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    #[command(flatten)]
    pub paths: PathArgs,
}

/// Filesystem roots shared by several commands
#[derive(clap::Args, Debug, Clone)]
pub struct PathArgs {
    /// Directory holding one subdirectory of send files per endpoint
    #[arg(long, default_value = DEFAULT_WWW_ROOT)]
    pub www_root: PathBuf,

    /// Directory results are written to
    #[arg(long, default_value = DEFAULT_DOWNLOADS_ROOT)]
    pub downloads_root: PathBuf,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Directory holding one subdirectory of send files per endpoint
    #[arg(long, default_value = DEFAULT_WWW_ROOT)]
    pub www_root: PathBuf,

    /// Also print the raw environment
    #[arg(long)]
    pub env: bool,
}

/// Arguments for the verify command
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Endpoint to check (default: first path segment of REQUESTS)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Output the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show the page entry point of each test case
    #[arg(short, long)]
    pub detailed: bool,
}
