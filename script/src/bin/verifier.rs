//! Checks an ownership proof written by `prover`.
//!
//! ```shell
//! RUST_LOG=info cargo run --release --bin verifier -- --dir proof
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use ownership_lib::PublicValues;
use ownership_program::backend::{read_proof, read_vk, verify};
use ownership_script::{read_json, PROOF_FILE, PUBLIC_FILE, VK_FILE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding `vk.bin`, `proof.bin` and `public.json`.
    #[arg(long, env = "PROOF_DIR", default_value = "proof")]
    dir: PathBuf,

    /// Verifying key to use instead of the one in `dir`.
    #[arg(long)]
    vk: Option<PathBuf>,
}

fn main() -> Result<()> {
    ownership_script::setup_logger();
    dotenv::dotenv().ok();
    let args = Args::parse();

    let vk_path = args.vk.unwrap_or_else(|| args.dir.join(VK_FILE));
    let vk = read_vk(BufReader::new(
        File::open(&vk_path).with_context(|| format!("failed to open {}", vk_path.display()))?,
    ))
    .context("failed to read verifying key")?;
    let proof = read_proof(BufReader::new(File::open(args.dir.join(PROOF_FILE))?))
        .context("failed to read proof")?;
    let public: PublicValues = read_json(&args.dir.join(PUBLIC_FILE))?;

    println!("Ownership Statement:");
    println!("  State Root: {}", hex::encode(public.state_root));
    println!("  Token: 0x{}", hex::encode(public.token_id));
    println!("  Owner: 0x{}", hex::encode(public.owner));

    if !verify(&vk, &public, &proof)? {
        bail!("proof does not verify against the given public values");
    }
    println!("\nSuccessfully verified proof!");
    Ok(())
}
