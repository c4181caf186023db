//! uiregress - cross-browser login regression suite entry point
//!
//! Exit codes: 0 when every scenario passed, 1 when any scenario failed,
//! 2 on setup errors (unreadable config, server startup failure).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use uiregress_harness::runner::RunnerConfig;
use uiregress_harness::scenario::Scenario;
use uiregress_harness::server::ServerConfig;
use uiregress_harness::{Browser, Config, HarnessResult, LaunchOptions, TestRunner, WaitPolicy};

#[derive(Parser, Debug)]
#[command(name = "uiregress")]
#[command(version, about = "Cross-browser UI regression suite for the login screen")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "uiregress.toml")]
    config: PathBuf,

    /// Browser kind to include (repeatable; default: chromium and firefox)
    #[arg(short, long = "browser", value_name = "BROWSER")]
    browsers: Vec<Browser>,

    /// Run browsers with a visible display, overriding the config file
    #[arg(long)]
    headed: bool,

    /// Directory for failure screenshots
    #[arg(long, default_value = "test-results/artifacts")]
    artifact_dir: PathBuf,

    /// Directory for the JSON report
    #[arg(short, long, default_value = "test-results")]
    report_dir: PathBuf,

    /// Target an already-running server instead of spawning the bundled one
    #[arg(long)]
    no_server: bool,

    /// Path to the static server binary
    #[arg(long, default_value = "target/debug/uiregress-web")]
    server_binary: PathBuf,

    /// Directory with the page under test
    #[arg(long, default_value = "crates/web/static")]
    static_dir: PathBuf,

    /// Port for the spawned server (0 = pick a free one)
    #[arg(long, default_value = "0")]
    port: u16,

    /// Per-wait budget in seconds
    #[arg(long, default_value = "10")]
    wait_timeout: u64,

    /// Print the scenario matrix and exit
    #[arg(long)]
    list: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create runtime: {e}");
            std::process::exit(2);
        }
    };

    match rt.block_on(run(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

async fn run(args: Args) -> HarnessResult<bool> {
    let settings = Config::load(&args.config)?;

    let browsers = if args.browsers.is_empty() {
        vec![Browser::Chromium, Browser::Firefox]
    } else {
        args.browsers.clone()
    };

    if args.list {
        for scenario in Scenario::matrix(&settings, &browsers) {
            println!("{}", scenario.slug());
        }
        return Ok(true);
    }

    let launch = LaunchOptions {
        headless: settings.headless && !args.headed,
        ..Default::default()
    };

    let mut runner = TestRunner::new(RunnerConfig {
        settings,
        browsers,
        launch,
        wait: WaitPolicy::with_timeout(Duration::from_secs(args.wait_timeout)),
        artifact_dir: args.artifact_dir,
        report_dir: args.report_dir,
    });

    if !args.no_server {
        runner
            .start_server(ServerConfig {
                binary_path: args.server_binary,
                static_dir: args.static_dir,
                port: if args.port == 0 { None } else { Some(args.port) },
                ..Default::default()
            })
            .await?;
    }

    let result = runner.run_all().await?;
    runner.write_report(&result)?;

    Ok(result.all_passed())
}
