use std::fs::File;
use std::io::BufReader;
use std::time::Instant;
use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};
use log::info;
use cachepolicy::cache::CacheTrait;
use cachepolicy::config::SimulationConfig;
use cachepolicy::io::get_reader;
use cachepolicy::simulator::Simulator;

#[derive(Parser, Debug)]
#[command(about = String::from("Set-associative cache simulator comparing LRU, LFU and ARC replacement"))]
struct Args {
    /// JSON file listing the caches to simulate
    config: String,
    /// Trace of `[pc] <L|S> <address>` lines
    trace: String,

    #[arg(short, long)]
    performance: bool,

    /// Logs progress, and prints the configuration and how much of each cache was never filled
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,
}

fn main() -> Result<()> {
    let start = Instant::now();
    let args = Args::parse();
    if args.debug {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }

    let config_file = File::open(&args.config).with_context(|| format!("Couldn't open the config file at path {}", args.config))?;
    let config = SimulationConfig::from_reader(BufReader::new(config_file)).context("Invalid configuration")?;
    let mut simulator = Simulator::new(&config).context("Couldn't build the caches")?;
    info!("simulating {} caches", config.caches.len());

    let trace_file = File::open(&args.trace).with_context(|| format!("Couldn't open the trace file at path {}", args.trace))?;
    let trace_reader = get_reader(trace_file).map_err(|e| anyhow!(e))?;
    let report = simulator.simulate(trace_reader).with_context(|| format!("Couldn't simulate {}", args.trace))?;
    println!("{}", serde_json::to_string_pretty(report).context("Couldn't serialise the output")?);

    if args.performance {
        let simulation_time = simulator.get_execution_time();
        let total_time = start.elapsed();
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!("Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9)
    }
    if args.debug {
        eprintln!("{config:#?}");
        let caches = config.caches.iter().zip(simulator.caches());
        for ((cache, built), invalid) in caches.zip(simulator.get_invalid_block_counts()) {
            eprintln!("{}: {invalid} of {} blocks never filled", cache.name, built.geometry().num_blocks());
        }
    }
    Ok(())
}
