mod config;
mod data_aquisition;
mod network;
mod parsers;
mod render;
mod topology;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Config;
use topology::{
    BmcSource, CorrelationEngine, Poller, SwitchSource,
    source::{Unavailable, bmc_source, switch_source},
};

/// How long blocking device I/O may outlive the run before the process exits anyway.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Maps Nexus switch ports to the servers, switches and unknown devices behind them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Base name of the output files
    #[arg(short, long, default_value = "network_diagram")]
    output: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write the topology as JSON
    #[arg(long)]
    json: bool,

    /// Write a starter configuration to --config and exit
    #[arg(long)]
    init: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if args.init {
        Config::write_default(&args.config)
            .with_context(|| format!("cannot create {}", args.config.display()))?;
        info!(path = %args.config.display(), "default configuration written, edit it and run again");
        return Ok(());
    }

    let config = Config::load(&args.config).context("cannot start without a valid configuration")?;

    let runtime = tokio::runtime::Runtime::new().context("cannot start the async runtime")?;
    let result = runtime.block_on(run(config, args));
    // an SSH job still stuck on a device must not keep the process alive
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

async fn run(config: Config, args: Args) -> anyhow::Result<()> {
    let switches: Vec<Arc<dyn SwitchSource>> = config
        .switches
        .iter()
        .map(|switch| match switch_source(switch, config.polling.timeout) {
            Ok(source) => Arc::from(source),
            Err(e) => {
                warn!(switch = %switch.hostname, error = %e, "cannot build client");
                Arc::new(Unavailable::new(&switch.hostname, &e)) as Arc<dyn SwitchSource>
            }
        })
        .collect();
    let bmcs: Vec<Arc<dyn BmcSource>> = config
        .bmcs
        .iter()
        .map(|bmc| match bmc_source(bmc) {
            Ok(source) => Arc::from(source),
            Err(e) => {
                warn!(bmc = %bmc.ip, error = %e, "cannot build client");
                Arc::new(Unavailable::new(&bmc.ip, &e)) as Arc<dyn BmcSource>
            }
        })
        .collect();

    let store = Poller::new(&config.polling).poll(switches, bmcs).await;
    let topology = CorrelationEngine::new(config.known_switches()).correlate(store.into_correlation_input());

    render::write_outputs(&topology, &args.output, args.json).context("cannot write outputs")?;

    info!(
        switches = topology.switches().count(),
        links = topology.switch_links().len(),
        servers = topology.server_edges().len(),
        unknown = topology.unknown_edges().len(),
        warnings = topology.warnings().len(),
        "discovery finished"
    );
    Ok(())
}
