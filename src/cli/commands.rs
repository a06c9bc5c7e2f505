use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "prov-ledger")]
pub struct Opt {
    #[arg(
        long = "config",
        global = true,
        help = "TOML config file (defaults come from LEDGER_* variables)"
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        name = "mine",
        about = "Submit demo transactions and mine them in the background"
    )]
    Mine {
        #[arg(long = "count", default_value_t = 10, help = "Number of transactions to submit")]
        count: u64,
        #[arg(
            long = "difficulty-bits",
            help = "Require this many leading zero bits instead of the configured target"
        )]
        difficulty_bits: Option<u32>,
        #[arg(long = "capacity", help = "Transactions per block")]
        capacity: Option<usize>,
        #[arg(long = "persist", help = "Write each mined block to the chains directory")]
        persist: bool,
    },
    #[command(name = "printchain", about = "Print all blocks of a persisted chain")]
    Printchain {
        #[arg(long = "network-id", help = "Network id of the chain to print")]
        network_id: Option<u64>,
    },
}
