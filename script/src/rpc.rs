//! Fetching account and storage proofs from an Ethereum node.

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{BlockId, BlockNumberOrTag};
use anyhow::{Context, Result};
use tracing::info;
use url::Url;

use ownership_lib::slot_key;

use crate::witness::ProofBundle;

/// What to fetch: one token of one contract, at one block.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub rpc_url: Url,
    pub contract: Address,
    pub token_id: U256,
    pub slot_index: u64,
    /// Latest block when unset.
    pub block: Option<u64>,
}

/// Calls `eth_getBlockByNumber` and `eth_getProof` for the token's owner slot
/// and collects the answers into a [`ProofBundle`].
pub async fn fetch_bundle(request: &FetchRequest) -> Result<ProofBundle> {
    let provider = ProviderBuilder::new().on_http(request.rpc_url.clone());

    let block_number = match request.block {
        Some(n) => n,
        None => provider.get_block_number().await.context("failed to get block number")?,
    };
    let block = provider
        .get_block_by_number(BlockNumberOrTag::Number(block_number), false)
        .await
        .context("failed to get block header")?
        .with_context(|| format!("block {block_number} not found"))?;
    let state_root = block.header.state_root;
    info!(block = block_number, state_root = %state_root, "fetched block header");

    let key = B256::from(slot_key(&request.token_id.to_be_bytes::<32>(), request.slot_index));
    let proof = provider
        .get_proof(request.contract, vec![key])
        .block_id(BlockId::Number(BlockNumberOrTag::Number(block_number)))
        .await
        .context("failed to get proof")?;
    let storage = proof
        .storage_proof
        .into_iter()
        .next()
        .context("node returned no storage proof for the owner slot")?;
    info!(
        account_nodes = proof.account_proof.len(),
        storage_nodes = storage.proof.len(),
        value = %storage.value,
        "fetched ownership proof"
    );

    Ok(ProofBundle {
        block_number,
        state_root,
        contract: request.contract,
        token_id: request.token_id,
        slot_index: request.slot_index,
        account_proof: proof.account_proof,
        storage_hash: proof.storage_hash,
        storage_proof: storage.proof,
        slot_value: storage.value,
    })
}
