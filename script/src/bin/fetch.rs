//! Dumps the proofs for one token to JSON, for proving offline with
//! `prover --bundle`.

use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use clap::Parser;
use ownership_script::rpc::{fetch_bundle, FetchRequest};
use ownership_script::write_json;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "RPC_URL", default_value = "https://eth-mainnet.g.alchemy.com/v2/demo")]
    rpc_url: Url,

    #[arg(long, env = "CONTRACT", default_value = "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D")]
    contract: Address,

    #[arg(long, env = "TOKEN_ID")]
    token_id: U256,

    #[arg(long, env = "OWNER_SLOT", default_value_t = 0)]
    slot: u64,

    #[arg(long)]
    block: Option<u64>,

    #[arg(long, short, default_value = "bundle.json")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    ownership_script::setup_logger();
    dotenv::dotenv().ok();
    let args = Args::parse();

    let bundle = fetch_bundle(&FetchRequest {
        rpc_url: args.rpc_url,
        contract: args.contract,
        token_id: args.token_id,
        slot_index: args.slot,
        block: args.block,
    })
    .await?;
    write_json(&args.out, &bundle)?;

    println!("Block {}: owner of token {} is {}", bundle.block_number, bundle.token_id, bundle.owner());
    println!("Bundle written to {}", args.out.display());
    Ok(())
}
