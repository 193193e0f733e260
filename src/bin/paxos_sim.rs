use std::error::Error;

use single_decree_paxos::{
    config::TransportConfigBuilder,
    simulation::{Simulation, SimulationConfig},
};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOSS_RATE: f64 = 0.1;

/// Two proposers race for 10 and 20 against four acceptors and one learner.
///
/// Usage: `paxos-sim [loss_rate]`. Set `RUST_LOG=debug` to see every received message.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let loss_rate = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<f64>()?,
        None => DEFAULT_LOSS_RATE,
    };
    let transport = TransportConfigBuilder::new()
        .with_loss_rate(loss_rate)
        .build()?;

    let config = SimulationConfig::new(transport)
        .with_proposer("proposer1", 10u64)
        .with_proposer("proposer2", 20u64)
        .with_acceptors(4)
        .with_learner("learner1");

    let simulation = Simulation::start(config)?;
    let resolution = simulation.wait_for_resolution().await;
    let stats = simulation.transport().stats();
    println!(
        "Resolved value {} with proposal {} ({} messages delivered, {} dropped)",
        resolution.value, resolution.proposal_id, stats.messages_sent, stats.messages_dropped
    );

    simulation.shutdown().await;
    Ok(())
}
