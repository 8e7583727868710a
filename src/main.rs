//! WolfElect - Primary Election over Group Membership
//!
//! Command line tool for configuring, inspecting and simulating nodes
//! that take part in primary election.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rand::Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wolfelect::config::ElectorConfig;
use wolfelect::election::{ElectionCoordinator, LoggingListener};
use wolfelect::error::Result;
use wolfelect::membership::{GroupProtocol, LocalGroup, RoundSummary};
use wolfelect::protocol::{Identity, PROTOCOL_TYPE, SUBPROTOCOL_V0};

type SimNode = ElectionCoordinator<LoggingListener>;

/// WolfElect - Primary Election over Group Membership
#[derive(Parser)]
#[command(name = "wolfelect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "wolfelect.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "wolfelect.toml")]
        output: PathBuf,

        /// Node ID
        #[arg(long, default_value = "node-1")]
        node_id: String,
    },

    /// Validate configuration file
    Validate,

    /// Show the identity this node advertises
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Simulate a fleet of nodes in-process
    Simulate {
        /// Rounds to run (0 = until Ctrl-C)
        #[arg(short, long, default_value_t = 5)]
        rounds: u64,

        /// Randomly drop and restore a peer before each round
        #[arg(long)]
        churn: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Init { output, node_id } => run_init(output, node_id),
        Commands::Validate => run_validate(cli.config),
        Commands::Info { json } => run_info(cli.config, json),
        Commands::Simulate { rounds, churn } => run_simulate(cli.config, rounds, churn).await,
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Write a starter configuration file
fn run_init(output: PathBuf, node_id: String) -> Result<()> {
    let config_content = format!(r#"# WolfElect Configuration
# Generated configuration file

[node]
id = "{node_id}"
# Address other nodes use to reach this one
host = "{node_id}.internal"
port = 8081
# Set to false for nodes that must never become primary
eligible = true

[group]
group_id = "wolfelect"
session_timeout_ms = 10000
rebalance_timeout_ms = 300000
heartbeat_interval_ms = 3000
retry_backoff_ms = 100

[logging]
level = "info"

# Peers for `wolfelect simulate`
# [[simulation.peers]]
# id = "node-2"
# host = "node-2.internal"
# port = 8081
# eligible = false
"#);

    std::fs::write(&output, config_content)?;
    println!("Configuration written to {:?}", output);
    Ok(())
}

/// Validate configuration file
fn run_validate(config_path: PathBuf) -> Result<()> {
    match ElectorConfig::from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Node ID: {}", config.node.id);
            println!("  Address: {}:{}", config.node.host, config.node.port);
            println!("  Eligible: {}", config.node.eligible);
            println!("  Group: {}", config.group.group_id);
            println!("  Simulated Peers: {}", config.simulation.peers.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show node information
fn run_info(config_path: PathBuf, json: bool) -> Result<()> {
    let config = ElectorConfig::from_file(&config_path)?;
    let identity = config.identity()?;
    let metadata = identity.encode()?;
    let metadata_hex: String = metadata.iter().map(|b| format!("{:02x}", b)).collect();

    if json {
        let info = serde_json::json!({
            "node_id": config.node.id,
            "identity": identity,
            "protocol_type": PROTOCOL_TYPE,
            "sub_protocol": SUBPROTOCOL_V0,
            "metadata": metadata_hex,
            "group_id": config.group.group_id,
        });
        println!("{}", info);
        return Ok(());
    }

    println!("WolfElect Node Information");
    println!("==========================");
    println!();
    println!("Node ID:          {}", config.node.id);
    println!("Address:          {}", identity);
    println!("Eligible:         {}", identity.eligible());
    println!();
    println!("Protocol:         {}/{}", PROTOCOL_TYPE, SUBPROTOCOL_V0);
    println!("Join Metadata:    {} ({} bytes)", metadata_hex, metadata.len());
    println!();
    println!("Group Configuration:");
    println!("  Group ID:       {}", config.group.group_id);
    println!("  Session:        {} ms", config.session_timeout().as_millis());
    println!("  Rebalance:      {} ms", config.rebalance_timeout().as_millis());
    println!("  Heartbeat:      {} ms", config.heartbeat_interval().as_millis());
    println!("  Retry Backoff:  {} ms", config.retry_backoff().as_millis());

    Ok(())
}

/// A simulated peer and its current membership
struct SimPeer {
    client_id: String,
    identity: Identity,
    member_id: Option<String>,
}

/// Run rounds over the node and its configured peers
async fn run_simulate(config_path: PathBuf, rounds: u64, churn: bool) -> Result<()> {
    let config = ElectorConfig::from_file(&config_path)?;

    let mut group: LocalGroup<SimNode> =
        LocalGroup::new(config.group.group_id.clone(), PROTOCOL_TYPE);

    let self_id = group.join(
        &config.node.id,
        ElectionCoordinator::new(config.identity()?, LoggingListener),
    )?;

    let mut peers = Vec::new();
    for (client_id, identity) in config.peer_identities()? {
        let member_id = group.join(
            &client_id,
            ElectionCoordinator::new(identity.clone(), LoggingListener),
        )?;
        peers.push(SimPeer {
            client_id,
            identity,
            member_id: Some(member_id),
        });
    }

    tracing::info!(
        "Simulating group {} with {} nodes (local member {})",
        group.group_id(),
        group.len(),
        self_id
    );

    let mut ticker = tokio::time::interval(config.heartbeat_interval());
    let mut completed = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping simulation");
                break;
            }
        }

        if churn && !peers.is_empty() {
            churn_peer(&mut group, &mut peers)?;
        } else {
            group.request_rejoin();
        }

        match group.poll() {
            Ok(Some(summary)) => {
                print_round(&group, &summary, &self_id);
                completed += 1;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Round failed: {}", e);
                tokio::time::sleep(config.retry_backoff()).await;
            }
        }

        if rounds > 0 && completed >= rounds {
            break;
        }
    }

    if let Some(local) = group.member(&self_id) {
        println!("{}", serde_json::to_string_pretty(&local.status())?);
    }

    Ok(())
}

/// Drop a random present peer, or bring back a missing one
fn churn_peer(group: &mut LocalGroup<SimNode>, peers: &mut [SimPeer]) -> Result<()> {
    let index = rand::thread_rng().gen_range(0..peers.len());
    let peer = &mut peers[index];

    match peer.member_id.take() {
        Some(member_id) => {
            group.expire(&member_id)?;
        }
        None => {
            let member_id = group.join(
                &peer.client_id,
                ElectionCoordinator::new(peer.identity.clone(), LoggingListener),
            )?;
            peer.member_id = Some(member_id);
        }
    }
    Ok(())
}

fn print_round(group: &LocalGroup<SimNode>, summary: &RoundSummary, self_id: &str) {
    println!(
        "Generation {} (round leader {})",
        summary.generation, summary.leader_id
    );

    for member_id in &summary.members {
        let Some(node) = group.member(member_id) else {
            continue;
        };

        let marker = if member_id == self_id { "*" } else { " " };
        let outcome = node
            .last_outcome()
            .map(|o| o.to_string())
            .unwrap_or_else(|| "no assignment".to_string());
        let rejoin = if node.need_rejoin() { " (rejoin pending)" } else { "" };

        println!("  {} {:<48} {}{}", marker, member_id, outcome, rejoin);
    }
}
