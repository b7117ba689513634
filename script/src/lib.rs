//! Host side of the ownership prover: fetching proofs from a node, turning
//! them into circuit witnesses and reading/writing proof artefacts.

pub mod artifacts;
pub mod rpc;
pub mod witness;

pub use artifacts::*;
pub use witness::*;

/// Installs the `tracing` subscriber used by every binary. `RUST_LOG`
/// overrides the default `info` level.
pub fn setup_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
