//! Files exchanged between the binaries.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use rand::{CryptoRng, RngCore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use ownership_lib::{Blueprint, CircuitConfig};
use ownership_program::backend::{read_keys, setup, write_keys, write_vk, Keys};

pub const KEYS_FILE: &str = "keys.bin";
pub const VK_FILE: &str = "vk.bin";
pub const PROOF_FILE: &str = "proof.bin";
pub const PUBLIC_FILE: &str = "public.json";
pub const BLUEPRINT_FILE: &str = "blueprint.json";
pub const WITNESS_FILE: &str = "witness.bin";

/// Everything the keys are generated for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArtifacts {
    pub blueprint: Blueprint,
    pub config: CircuitConfig,
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file)).with_context(|| format!("failed to parse {}", path.display()))
}

/// Whether `dir` holds keys generated for exactly `artifacts`.
pub fn cached_keys_match(dir: &Path, artifacts: &CircuitArtifacts) -> bool {
    if !dir.join(KEYS_FILE).exists() {
        return false;
    }
    matches!(read_json::<CircuitArtifacts>(&dir.join(BLUEPRINT_FILE)), Ok(cached) if cached == *artifacts)
}

/// Reads cached keys from `dir`, or runs setup and caches the result
/// together with the blueprint and configuration they belong to.
pub fn load_or_setup_keys<R: RngCore + CryptoRng>(
    dir: &Path,
    artifacts: &CircuitArtifacts,
    rng: &mut R,
) -> Result<Keys> {
    if cached_keys_match(dir, artifacts) {
        info!(dir = %dir.display(), "reusing cached keys");
        let file = File::open(dir.join(KEYS_FILE))?;
        return read_keys(BufReader::new(file)).context("failed to read cached keys");
    }

    let keys = setup(&artifacts.blueprint, &artifacts.config, rng)?;
    std::fs::create_dir_all(dir)?;
    write_keys(&keys, BufWriter::new(File::create(dir.join(KEYS_FILE))?))?;
    write_vk(&keys.vk, BufWriter::new(File::create(dir.join(VK_FILE))?))?;
    write_json(&dir.join(BLUEPRINT_FILE), artifacts)?;
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> CircuitArtifacts {
        CircuitArtifacts {
            blueprint: Blueprint {
                account_nodes: vec![532, 83],
                storage_nodes: vec![54],
                path_len: 64,
                owner_bytes_len: 32,
            },
            config: CircuitConfig::new([0xbc; 20], 0),
        }
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("ownership-artifacts-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_cached_keys_require_matching_blueprint() {
        let dir = scratch("cache");
        let a = artifacts();
        write_json(&dir.join(BLUEPRINT_FILE), &a).unwrap();
        assert!(!cached_keys_match(&dir, &a), "no keys file yet");

        std::fs::write(dir.join(KEYS_FILE), b"").unwrap();
        assert!(cached_keys_match(&dir, &a));

        let mut other = a.clone();
        other.config.slot_index = 3;
        assert!(!cached_keys_match(&dir, &other));
        other = a.clone();
        other.blueprint.storage_nodes.push(83);
        assert!(!cached_keys_match(&dir, &other));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_json_round_trip() {
        let dir = scratch("json");
        let a = artifacts();
        write_json(&dir.join("a.json"), &a).unwrap();
        assert_eq!(read_json::<CircuitArtifacts>(&dir.join("a.json")).unwrap(), a);
        assert!(read_json::<CircuitArtifacts>(&dir.join("missing.json")).is_err());
        std::fs::remove_dir_all(dir).unwrap();
    }
}
