//! Prints the digest of the verifying key for a blueprint and configuration,
//! generating the keys first if the directory holds none for them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ownership_program::backend::vk_digest;
use ownership_script::{load_or_setup_keys, read_json, CircuitArtifacts, BLUEPRINT_FILE};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Blueprint and configuration, defaults to the one cached in `dir`.
    #[arg(long)]
    blueprint: Option<PathBuf>,

    #[arg(long, env = "PROOF_DIR", default_value = "proof")]
    dir: PathBuf,
}

fn main() -> Result<()> {
    ownership_script::setup_logger();
    dotenv::dotenv().ok();
    let args = Args::parse();

    let path = args.blueprint.unwrap_or_else(|| args.dir.join(BLUEPRINT_FILE));
    let artifacts: CircuitArtifacts = read_json(&path)?;
    let keys = load_or_setup_keys(&args.dir, &artifacts, &mut rand::thread_rng())?;
    println!("0x{}", hex::encode(vk_digest(&keys.vk)?));
    Ok(())
}
