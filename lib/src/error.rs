use ark_relations::r1cs::SynthesisError;
use thiserror::Error;

/// Errors raised while shaping or synthesizing the ownership circuit.
///
/// Everything except [`OwnershipError::Unsatisfiable`] and
/// [`OwnershipError::Synthesis`] is structural: it is detected before any
/// proving and can only be fixed by changing shapes and recompiling.
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("proof path must contain at least one node")]
    EmptyProof,

    #[error("node of {len} bytes is outside the 1..={max} byte scan capacity")]
    NodeTooLong { len: usize, max: usize },

    #[error("owner must be 20 bytes, got {0}")]
    OwnerLength(usize),

    #[error("storage slot word must be at least 32 bytes, got {0}")]
    SlotLeafTooShort(usize),

    #[error("leaf value of {value} bytes does not fit in a {node}-byte leaf")]
    LeafValueTooLong { value: usize, node: usize },

    #[error("{what}: blueprint expects {expected}, witness has {actual}")]
    ShapeMismatch { what: String, expected: usize, actual: usize },

    #[error("witness does not satisfy the ownership circuit")]
    Unsatisfiable,

    #[error("constraint synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl OwnershipError {
    pub(crate) fn shape(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { what: what.into(), expected, actual }
    }
}

impl From<OwnershipError> for SynthesisError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::Synthesis(inner) => inner,
            other => {
                tracing::error!(error = %other, "structural error during synthesis");
                SynthesisError::Unsatisfiable
            }
        }
    }
}
