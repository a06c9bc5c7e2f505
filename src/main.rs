// Demo binary: submits generated transactions, mines them on a background
// thread and optionally persists the chain as JSON files.
use clap::Parser;
use log::{error, info, LevelFilter};
use prov_ledger::{
    Block, ChainStore, Command, Config, Difficulty, Miner, Opt, PersistenceListener, Registry,
    Transaction, GLOBAL_CONFIG,
};
use rand::Rng;
use std::path::Path;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PROGRESS_POLL: Duration = Duration::from_millis(100);
const MAX_DEMO_FEE: u32 = 100;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> prov_ledger::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(GLOBAL_CONFIG.clone()),
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(opt.config.as_deref())?;

    match opt.command {
        Command::Mine {
            count,
            difficulty_bits,
            capacity,
            persist,
        } => {
            if let Some(bits) = difficulty_bits {
                config.difficulty = Difficulty::from_leading_zero_bits(bits)?;
            }
            if let Some(capacity) = capacity {
                config.block_capacity = capacity;
            }
            config.validate()?;

            let registry = Arc::new(Registry::new(config.clone()));
            let ledger = registry.get_blockchain();
            let pool = registry.get_pending_pool();
            let miner = Arc::new(Miner::new(Arc::clone(&registry)));

            if persist {
                let store = ChainStore::from_config(&config);
                store.write_chain(&ledger.chain_snapshot())?;
                miner.register_listener(PersistenceListener::new(store, config.network_id));
            }
            miner.register_listener(|block: &Block| {
                if let Ok(hash) = block.block_hash() {
                    info!(
                        "New block mined - Block Hash: {hash} ({} transactions)",
                        block.get_transaction_count()
                    );
                }
            });

            info!("Mining with difficulty {}", config.difficulty);
            let handle = miner.spawn()?;

            let mut rng = rand::thread_rng();
            let mut submitted = Vec::new();
            for i in 0..count {
                let fee = rng.gen_range(0..MAX_DEMO_FEE) as f64;
                let tx = Transaction::new(
                    format!("testSender{i}").into_bytes(),
                    format!("testReceiver{i}").into_bytes(),
                    i as f64 * 1.1,
                    i,
                    fee,
                    10.0,
                    None,
                )?;
                submitted.push(*tx.get_id());
                pool.add(tx)?;
            }
            info!("Amount of transactions in queue: {}", pool.len());

            while !submitted
                .iter()
                .all(|txid| ledger.get_transaction(txid).is_some())
            {
                if handle.is_finished() {
                    break;
                }
                thread::sleep(PROGRESS_POLL);
            }

            miner.stop_mining();
            handle.join().map_err(|_| "miner thread panicked")??;

            println!("Blockchain length: {}", ledger.size());
            println!("Latest block hash: {}", ledger.get_previous_hash()?);
        }
        Command::Printchain { network_id } => {
            let network_id = network_id.unwrap_or(config.network_id);
            let chain = ChainStore::from_config(&config).read_chain(network_id)?;

            for (height, block) in chain.iter().enumerate() {
                let header = block.get_header();
                println!("Height: {height}");
                println!("Pre block hash: {}", header.get_previous_hash());
                println!("Cur block hash: {}", block.block_hash()?);
                println!("Timestamp: {}", header.get_timestamp());
                println!("Nonce: {}", header.get_nonce());
                for tx in block.get_transactions() {
                    println!(
                        "- Transaction {} fee = {}, amount = {}",
                        tx.get_id_hex(),
                        tx.get_fee_base_price(),
                        tx.get_amount()
                    );
                }
                println!()
            }
        }
    }
    Ok(())
}
