//! Verifier calldata encoding.
//!
//! The calldata handed to an on-chain Groth16 verifier is
//!
//! ```text
//! [ proof core: 8 chunks ][ commitments: variable ][ public inputs: 1 chunk each ]
//! ```
//!
//! where a chunk is one 32-byte big-endian field element. The proof core is
//! `a` (2 chunks), `b` (4 chunks) and `c` (2 chunks). Proof encodings that
//! carry commitments append a big-endian `u32` commitment count followed by
//! the commitment points; the count is dropped from the calldata. The public
//! inputs are the public witness with its 12-byte header removed.
//!
//! Nothing here checks the proof itself; that is the verifier's job.

use thiserror::Error;

use crate::{
    crypto::bn254::{FIELD_ELEMENT_SIZE, PROOF_SIZE},
    types::{Proof, WITNESS_HEADER_SIZE, Witness},
};

/// Width of one calldata chunk.
pub const CHUNK_SIZE: usize = FIELD_ELEMENT_SIZE;

/// Size of the fixed proof core: 8 chunks.
pub const PROOF_CORE_SIZE: usize = 8 * CHUNK_SIZE;

const COMMITMENT_COUNT_SIZE: usize = 4;

// The proof encoding and the calldata layout have to agree on the core.
const _: () = assert!(PROOF_CORE_SIZE == PROOF_SIZE);

/// Errors raised while packing calldata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The proof encoding is shorter than the proof core.
    #[error("invalid proof length {len}, expected at least {PROOF_CORE_SIZE}")]
    InvalidProofLength {
        /// Length of the proof encoding.
        len: usize,
    },
    /// The commitment section is shorter than its declared count implies.
    #[error("invalid commitments length: {declared} commitments need {needed} bytes, got {actual}")]
    InvalidCommitmentLength {
        /// Declared commitment count, if the count itself was readable.
        declared: u32,
        /// Bytes the declared count requires.
        needed: usize,
        /// Bytes present after the proof core.
        actual: usize,
    },
    /// The public witness is shorter than its header.
    #[error("invalid public witness length {len}, expected at least {WITNESS_HEADER_SIZE}")]
    InvalidWitnessLength {
        /// Length of the public witness encoding.
        len: usize,
    },
}

/// Encodes a proof and the public part of its witness as verifier calldata.
pub fn encode_calldata(proof: &Proof, witness: &Witness) -> Result<Vec<u8>, CodecError> {
    let proof_bytes = proof.to_verifier_bytes();
    let witness_bytes = witness.public().to_bytes();
    pack_calldata(&proof_bytes, &witness_bytes)
}

/// Packs a verifier-encoded proof and a serialized public witness.
pub fn pack_calldata(proof_bytes: &[u8], public_witness: &[u8]) -> Result<Vec<u8>, CodecError> {
    let (core, tail) = proof_bytes
        .split_at_checked(PROOF_CORE_SIZE)
        .ok_or(CodecError::InvalidProofLength {
            len: proof_bytes.len(),
        })?;

    let commitments = if tail.is_empty() {
        &[][..]
    } else {
        commitment_section(tail)?
    };

    let inputs = public_witness
        .get(WITNESS_HEADER_SIZE..)
        .ok_or(CodecError::InvalidWitnessLength {
            len: public_witness.len(),
        })?;

    let mut out = Vec::with_capacity(
        core.len()
            .saturating_add(commitments.len())
            .saturating_add(inputs.len()),
    );
    out.extend_from_slice(core);
    out.extend_from_slice(commitments);
    out.extend_from_slice(inputs);
    Ok(out)
}

/// Validates the bytes after the proof core and strips the count prefix.
fn commitment_section(tail: &[u8]) -> Result<&[u8], CodecError> {
    let Some((count, commitments)) = tail.split_first_chunk::<COMMITMENT_COUNT_SIZE>() else {
        return Err(CodecError::InvalidCommitmentLength {
            declared: 0,
            needed: COMMITMENT_COUNT_SIZE,
            actual: tail.len(),
        });
    };

    let declared = u32::from_be_bytes(*count);
    // The section holds `declared` commitments plus two chunks for the
    // proof of knowledge.
    let needed = usize::try_from(declared)
        .ok()
        .and_then(|count| count.checked_add(2))
        .and_then(|chunks| chunks.checked_mul(CHUNK_SIZE))
        .and_then(|bytes| bytes.checked_add(COMMITMENT_COUNT_SIZE));

    match needed {
        Some(needed) if tail.len() >= needed => Ok(commitments),
        needed => Err(CodecError::InvalidCommitmentLength {
            declared,
            needed: needed.unwrap_or(usize::MAX),
            actual: tail.len(),
        }),
    }
}
