//! supstat - Munin multigraph plugin for supervisord process statistics.
//!
//! Invoked by munin-node with no argument (fetch values), `config`
//! (declare graphs) or `autoconf`. `dump` prints one collection cycle as
//! JSON for debugging. All logging goes to stderr; stdout carries only the
//! munin protocol.

use std::error::Error;

use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_os = "linux"))]
use supstat::collector::MockFs;
#[cfg(target_os = "linux")]
use supstat::collector::RealFs;
use supstat::collector::StatsCollector;
use supstat::config::Config;
use supstat::munin;
use supstat::supervisor::{ProcessDirectory, SupervisorClient};

#[cfg(target_os = "linux")]
type PluginFs = RealFs;
#[cfg(not(target_os = "linux"))]
type PluginFs = MockFs;

/// Munin plugin reporting per-process supervisord statistics.
#[derive(Parser)]
#[command(
    name = "supstat",
    about = "Munin plugin reporting supervisord process statistics",
    version
)]
struct Args {
    /// Munin plugin command: `config`, `autoconf` or `dump`.
    /// Fetches values when omitted.
    command: Option<String>,

    /// Supervisord XML-RPC endpoint (overrides env `url`).
    #[arg(long)]
    url: Option<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, value_name = "PATH")]
    proc_path: Option<String>,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber on stderr with the appropriate level.
/// Default is WARN so a munin poll stays silent unless something is wrong.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("supstat={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn new_collector(config: &Config) -> StatsCollector<PluginFs> {
    StatsCollector::new(PluginFs::new(), &config.proc_path, config.graphs.clone())
        .with_cpu_window(config.cpu_samples, config.cpu_interval)
}

/// `config`: declare the enabled graphs for the current running set.
fn run_config(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = SupervisorClient::new(&config.url)?;
    let processes = client.list_running()?;
    print!("{}", munin::render_config(&processes, &config.graphs));
    Ok(())
}

/// Fetch: run one collection cycle and print the values.
fn run_fetch(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = SupervisorClient::new(&config.url)?;
    let processes = client.list_running()?;
    let result = new_collector(config).collect_from(&processes);
    print!("{}", munin::render_values(&processes, &result));
    Ok(())
}

/// `dump`: one collection cycle as JSON, for debugging.
fn run_dump(config: &Config) -> Result<(), Box<dyn Error>> {
    let client = SupervisorClient::new(&config.url)?;
    let result = new_collector(config).collect(&client)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut config = Config::from_env();
    if let Some(url) = args.url {
        config.url = url;
    }
    if let Some(path) = args.proc_path {
        config.proc_path = path;
    }

    let outcome = match args.command.as_deref() {
        Some("autoconf") => {
            // Never auto-configures; the endpoint must come from plugin-conf.
            println!("no");
            Ok(())
        }
        Some("config") => run_config(&config),
        Some("dump") => run_dump(&config),
        None | Some("fetch") => run_fetch(&config),
        Some(other) => {
            error!("unknown command {:?}", other);
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
}
