use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use dv_netsim::{Network, Scenario, SimulationConfig};

#[derive(Parser)]
#[command(name = "dv-netsim", about = "Distance-vector routing simulator")]
struct Cli {
    /// JSON file with routers, links and packets
    #[arg(long)]
    scenario: PathBuf,

    /// JSON simulation settings
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_hops: Option<usize>,

    /// Relax the table to a fixed point before sending packets
    #[arg(long)]
    converge: bool,

    /// After transmission, converge and compare the table with shortest paths
    #[arg(long)]
    verify: bool,

    /// Print the routing table once the packets are sent
    #[arg(long)]
    show_table: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(max_hops) = cli.max_hops {
        config.max_hops = max_hops;
    }
    if cli.converge {
        config.converge_on_start = true;
    }

    let scenario = Scenario::load(&cli.scenario)?;
    info!(
        "Loaded {} routers and {} packets from {}",
        scenario.topology.routers.len(),
        scenario.packets.len(),
        cli.scenario.display()
    );

    let mut network = Network::with_config(&scenario.topology, config)?;
    let mut packets = scenario.packets();
    let report = network.begin_packet_transmission(&mut packets);

    for packet in &packets {
        println!(
            "packet {} ({} -> {}): {:?} {:?}",
            packet.id(),
            packet.source(),
            packet.destination(),
            packet.state(),
            packet.path()
        );
    }
    for (id, err) in &report.failures {
        println!("packet {} failed: {}", id, err);
    }

    if cli.show_table {
        print!("{}", network.routing_table());
    }

    if cli.verify {
        let passes = network.converge()?;
        let gaps = network.optimality_gaps()?;
        if gaps.is_empty() {
            println!("table matches shortest paths after {} passes", passes);
        } else {
            for gap in &gaps {
                println!(
                    "route {} -> {}: table {:?}, shortest {:?}",
                    gap.from, gap.to, gap.table, gap.reference
                );
            }
        }
    }

    Ok(())
}
