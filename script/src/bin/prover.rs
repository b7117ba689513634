//! NFT Ownership Prover
//!
//! Fetches the account and storage proofs for one token, builds the circuit
//! witness and proves that the claimed owner, the slot's current holder by
//! default, owns the token.
//!
//! ```shell
//! RUST_LOG=info cargo run --release --bin prover -- --token-id 8822 --block 19000000
//! ```
//! or, from a bundle written by `fetch`:
//! ```shell
//! RUST_LOG=info cargo run --release --bin prover -- --bundle bundle.json
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use clap::Parser;
use ownership_lib::{Blueprint, CircuitConfig, DEFAULT_HASHED_LENS};
use ownership_program::backend::{prove, write_proof};
use ownership_script::rpc::{fetch_bundle, FetchRequest};
use ownership_script::{
    build_assignment, load_or_setup_keys, read_json, write_json, CircuitArtifacts, ProofBundle, PROOF_FILE,
    PUBLIC_FILE, WITNESS_FILE,
};
use url::Url;

/// The arguments for the command.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prove from a bundle written by `fetch` instead of calling the node.
    #[arg(long)]
    bundle: Option<PathBuf>,

    #[arg(long, env = "RPC_URL", default_value = "https://eth-mainnet.g.alchemy.com/v2/demo")]
    rpc_url: Url,

    /// NFT contract, BAYC by default.
    #[arg(long, env = "CONTRACT", default_value = "0xBC4CA0EdA7647A8aB7C2061c2E118A18a936f13D")]
    contract: Address,

    #[arg(long, env = "TOKEN_ID", default_value_t = U256::ZERO)]
    token_id: U256,

    /// Expected owner to claim, the slot's current holder when unset.
    #[arg(long, env = "OWNER")]
    owner: Option<Address>,

    /// Storage slot of the `mapping(uint256 => address)` of owners.
    #[arg(long, env = "OWNER_SLOT", default_value_t = 0)]
    slot: u64,

    /// Block to prove against, latest when unset.
    #[arg(long)]
    block: Option<u64>,

    /// Only accept pointers up to 32 bytes, packed rather than hashed.
    #[arg(long)]
    packing_only: bool,

    /// Where keys and proof artefacts go.
    #[arg(long, env = "PROOF_DIR", default_value = "proof")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup the logger.
    ownership_script::setup_logger();
    dotenv::dotenv().ok();

    // Parse the command line arguments.
    let args = Args::parse();

    let bundle: ProofBundle = match &args.bundle {
        Some(path) => read_json(path)?,
        None => {
            let request = FetchRequest {
                rpc_url: args.rpc_url.clone(),
                contract: args.contract,
                token_id: args.token_id,
                slot_index: args.slot,
                block: args.block,
            };
            fetch_bundle(&request).await?
        }
    };

    let assignment = build_assignment(&bundle, args.owner)?;
    let artifacts = CircuitArtifacts {
        blueprint: Blueprint::of(&assignment),
        config: CircuitConfig {
            hashed_pointer_lens: if args.packing_only { Vec::new() } else { DEFAULT_HASHED_LENS.to_vec() },
            ..CircuitConfig::new(bundle.contract.into_array(), bundle.slot_index)
        },
    };

    println!("Ownership Claim:");
    println!("  Block: {}", bundle.block_number);
    println!("  State Root: {}", hex::encode(assignment.public.state_root));
    println!("  Contract: {}", bundle.contract);
    println!("  Token: {}", bundle.token_id);
    println!("  Owner: {}", Address::from(assignment.public.owner));
    println!(
        "  Nodes: {} account, {} storage",
        artifacts.blueprint.account_nodes.len(),
        artifacts.blueprint.storage_nodes.len()
    );

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    let witness = bincode::serialize(&assignment)?;
    std::fs::write(args.out_dir.join(WITNESS_FILE), witness)?;

    let mut rng = rand::thread_rng();
    let keys = load_or_setup_keys(&args.out_dir, &artifacts, &mut rng)?;

    // Generate the proof
    let proof = prove(&keys.pk, &artifacts.blueprint, &artifacts.config, &assignment, &mut rng)
        .context("failed to generate proof")?;
    println!("Successfully generated proof!");

    write_proof(&proof, BufWriter::new(File::create(args.out_dir.join(PROOF_FILE))?))?;
    write_json(&args.out_dir.join(PUBLIC_FILE), &assignment.public)?;
    println!("\nArtefacts written to {}", args.out_dir.display());
    println!("  ABI public values: 0x{}", hex::encode(assignment.public.abi_encode()));
    Ok(())
}
