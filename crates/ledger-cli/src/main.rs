use std::{thread, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, GENESIS_DATA},
    pow, Block, Ledger, LedgerConfig, Miner,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "Mine, inspect and validate a proof-of-work ledger")]
struct Cli {
    /// Leading hex zeros required of each proof
    #[arg(long, global = true, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Payload of the genesis block
    #[arg(long, global = true, default_value = GENESIS_DATA)]
    genesis_data: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine "Transaction A" and "Transaction B", then print and validate the chain
    Demo,
    /// Mine one block per payload
    Mine {
        /// Block payloads, mined in order
        #[arg(required = true)]
        data: Vec<String>,
        /// Search nonces on all cores
        #[arg(long)]
        parallel: bool,
        /// Cancel a block's proof search after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the chain as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the first proof valid against PREVIOUS
    FindProof { previous: String },
    /// Check whether PROOF is valid against PREVIOUS
    CheckProof { proof: String, previous: String },
    /// Print the digest of a block given as a JSON object
    Digest { block: String },
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig {
        difficulty: cli.difficulty,
        genesis_data: cli.genesis_data,
    };

    match cli.cmd {
        Command::Demo => {
            let mut ledger = Ledger::with_config(config);
            ledger.mine_block("Transaction A");
            ledger.mine_block("Transaction B");
            print_chain(&ledger);
            print_validity(&ledger);
        }
        Command::Mine {
            data,
            parallel,
            timeout_secs,
            json,
        } => {
            let mut ledger = Ledger::with_config(config);
            for payload in data {
                let miner = Miner::new(ledger.difficulty()).parallel(parallel);
                if let Some(secs) = timeout_secs {
                    let token = miner.cancel_token().clone();
                    thread::spawn(move || {
                        thread::sleep(Duration::from_secs(secs));
                        token.cancel();
                    });
                }
                let block = ledger
                    .mine_block_with(&miner, payload)
                    .with_context(|| format!("mining block {}", ledger.len()))?;
                info!(index = block.index, proof = %block.proof, "mined");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(ledger.blocks())?);
            } else {
                print_chain(&ledger);
            }
            print_validity(&ledger);
        }
        Command::FindProof { previous } => {
            println!("{}", pow::find_proof(&previous, config.difficulty));
        }
        Command::CheckProof { proof, previous } => {
            let valid = pow::valid_proof(&proof, &previous, config.difficulty);
            println!("{}", if valid { "valid" } else { "invalid" });
        }
        Command::Digest { block } => {
            let block: Block = serde_json::from_str(&block).context("parsing block JSON")?;
            println!("{}", block.digest());
        }
    }
    Ok(())
}

fn print_chain(ledger: &Ledger) {
    println!("Blockchain:");
    for (index, block) in ledger.blocks().iter().enumerate() {
        println!("Block {index}: {}", block.digest());
        println!("{block}");
        println!();
    }
}

fn print_validity(ledger: &Ledger) {
    match ledger.verify_chain(ledger.difficulty()) {
        Ok(()) => println!("Blockchain is valid"),
        Err(violation) => println!("Blockchain is invalid: {violation}"),
    }
}
