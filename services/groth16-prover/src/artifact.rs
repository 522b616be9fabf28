//! Proving artifacts and their loader.
//!
//! An artifact is a constraint system plus the Groth16 proving key generated
//! for it. Both arrive as opaque byte buffers produced by external tooling;
//! this module only deserializes and validates them.

use std::{fmt, io::Cursor};

use ark_bn254::{Bn254, Fr};
use ark_groth16::ProvingKey;
use ark_poly::{EvaluationDomain, GeneralEvaluationDomain};
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, SerializationError, Validate,
};
use prover_interface::digest::{Sha256Digest, sha256, tagged_struct};
use thiserror::Error;

use crate::config::{PointEncoding, ProverConfig};

/// Circuit format version understood by this loader.
pub const CIRCUIT_VERSION: u32 = 1;

const ARTIFACT_TAG: &str = "prover.ProvingArtifact";

/// Errors raised while loading a circuit or a proving key.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The circuit buffer does not deserialize.
    #[error("malformed circuit: {0}")]
    Circuit(#[source] SerializationError),
    /// The proving key buffer does not deserialize.
    #[error("malformed proving key: {0}")]
    ProvingKey(#[source] SerializationError),
    /// The circuit was written by an incompatible format version.
    #[error("unsupported circuit version {found}, expected {CIRCUIT_VERSION}")]
    UnsupportedVersion {
        /// Version found in the buffer.
        found: u32,
    },
    /// Bytes remain after the encoded object.
    #[error("{kind} has {count} trailing bytes")]
    TrailingBytes {
        /// Which artifact carried them.
        kind: &'static str,
        /// How many bytes were left over.
        count: usize,
    },
    /// A constraint or hint references a wire the circuit does not have.
    #[error("wire {wire} is out of range ({wires} wires)")]
    WireOutOfRange {
        /// Referenced wire.
        wire: u64,
        /// Number of wires in the circuit.
        wires: u64,
    },
    /// A hint writes to a wire that is not internal.
    #[error("hint `{name}` writes to non-internal wire {wire}")]
    HintOutputNotInternal {
        /// Hint name.
        name: String,
        /// Offending wire.
        wire: u64,
    },
    /// An internal wire is written by zero or several hints.
    #[error("internal wire {wire} is assigned {count} times")]
    InternalWireAssignment {
        /// Offending wire.
        wire: u64,
        /// Number of hints writing it.
        count: usize,
    },
    /// The proving key was generated for a circuit of a different shape.
    #[error("proving key {query} has {found} elements, circuit needs {expected}")]
    KeyMismatch {
        /// Key component whose length is off.
        query: &'static str,
        /// Length implied by the circuit.
        expected: u64,
        /// Length found in the key.
        found: u64,
    },
    /// No evaluation domain over the scalar field is large enough.
    #[error("circuit with {constraints} constraints is too large to prove")]
    CircuitTooLarge {
        /// Number of constraints.
        constraints: usize,
    },
}

/// A wire weighted by a coefficient.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Term {
    /// Wire index.
    pub wire: u64,
    /// Coefficient.
    pub coeff: Fr,
}

/// Rank-1 constraint `<a, z> * <b, z> = <c, z>`.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Constraint {
    /// Left factor.
    pub a: Vec<Term>,
    /// Right factor.
    pub b: Vec<Term>,
    /// Product.
    pub c: Vec<Term>,
}

/// A call to a named hint that fills internal wires while solving.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct HintCall {
    /// Name of the hint in the hint registry.
    pub name: String,
    /// Wires read by the hint.
    pub inputs: Vec<u64>,
    /// Internal wires written by the hint.
    pub outputs: Vec<u64>,
}

/// Serialized constraint system.
///
/// Wires are numbered `0` (the constant one), then public inputs, then
/// secret inputs, then internal wires computed by hints.
#[derive(Clone, Debug, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct R1cs {
    /// Format version, see [`CIRCUIT_VERSION`].
    pub version: u32,
    /// Number of public inputs.
    pub num_public: u64,
    /// Number of secret inputs.
    pub num_secret: u64,
    /// Number of wires computed by hints.
    pub num_internal: u64,
    /// The constraints.
    pub constraints: Vec<Constraint>,
    /// Hint calls, run in order.
    pub hints: Vec<HintCall>,
}

impl R1cs {
    /// Total number of wires including the constant one.
    pub fn num_wires(&self) -> u64 {
        1u64.saturating_add(self.num_public)
            .saturating_add(self.num_secret)
            .saturating_add(self.num_internal)
    }

    /// Index of the first internal wire.
    pub fn first_internal_wire(&self) -> u64 {
        1u64.saturating_add(self.num_public)
            .saturating_add(self.num_secret)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.version != CIRCUIT_VERSION {
            return Err(ArtifactError::UnsupportedVersion {
                found: self.version,
            });
        }

        let wires = self.num_wires();
        let check = |wire: u64| {
            if wire < wires {
                Ok(())
            } else {
                Err(ArtifactError::WireOutOfRange { wire, wires })
            }
        };

        for constraint in &self.constraints {
            for term in constraint.a.iter().chain(&constraint.b).chain(&constraint.c) {
                check(term.wire)?;
            }
        }

        let first_internal = self.first_internal_wire();

        // Each internal wire needs its own hint output, so the declared count
        // is bounded by the buffer that was actually read.
        let outputs = self
            .hints
            .iter()
            .fold(0usize, |total, hint| total.saturating_add(hint.outputs.len()));
        let internal = match usize::try_from(self.num_internal) {
            Ok(internal) if internal <= outputs => internal,
            _ => {
                let assigned = u64::try_from(outputs).unwrap_or(u64::MAX);
                return Err(ArtifactError::InternalWireAssignment {
                    wire: first_internal.saturating_add(assigned),
                    count: 0,
                });
            }
        };
        let mut writes = vec![0usize; internal];

        for hint in &self.hints {
            for wire in &hint.inputs {
                check(*wire)?;
            }
            for wire in &hint.outputs {
                check(*wire)?;
                let slot = wire
                    .checked_sub(first_internal)
                    .and_then(|offset| usize::try_from(offset).ok())
                    .ok_or_else(|| ArtifactError::HintOutputNotInternal {
                        name: hint.name.clone(),
                        wire: *wire,
                    })?;
                writes[slot] = writes[slot].saturating_add(1);
            }
        }

        if let Some((slot, count)) = writes.iter().enumerate().find(|(_, count)| **count != 1) {
            let offset = u64::try_from(slot).unwrap_or(u64::MAX);
            return Err(ArtifactError::InternalWireAssignment {
                wire: first_internal.saturating_add(offset),
                count: *count,
            });
        }

        Ok(())
    }
}

/// A loaded, immutable project artifact.
pub struct ProvingArtifact {
    circuit: R1cs,
    proving_key: ProvingKey<Bn254>,
    fingerprint: Sha256Digest,
}

impl fmt::Debug for ProvingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvingArtifact")
            .field("constraints", &self.circuit.constraints.len())
            .field("public_inputs", &self.circuit.num_public)
            .field("fingerprint", &hex::encode(self.fingerprint))
            .finish()
    }
}

impl ProvingArtifact {
    /// The constraint system.
    pub fn circuit(&self) -> &R1cs {
        &self.circuit
    }

    /// The Groth16 proving key.
    pub fn proving_key(&self) -> &ProvingKey<Bn254> {
        &self.proving_key
    }

    /// Digest of the bytes the artifact was loaded from.
    pub fn fingerprint(&self) -> &Sha256Digest {
        &self.fingerprint
    }
}

/// Computes the fingerprint of an artifact's source buffers.
pub fn fingerprint(circuit: &[u8], proving_key: &[u8]) -> Sha256Digest {
    tagged_struct(ARTIFACT_TAG, &[sha256(circuit), sha256(proving_key)])
}

/// Deserializes circuits and proving keys against BN254.
#[derive(Clone, Copy)]
pub struct ArtifactLoader {
    compress: Compress,
    validate: Validate,
}

impl fmt::Debug for ArtifactLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactLoader")
            .field("compress", &matches!(self.compress, Compress::Yes))
            .field("validate", &matches!(self.validate, Validate::Yes))
            .finish()
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new(&ProverConfig::default())
    }
}

impl ArtifactLoader {
    /// Creates a loader using the configured point encoding and validation.
    pub fn new(config: &ProverConfig) -> Self {
        let compress = match config.point_encoding {
            PointEncoding::Compressed => Compress::Yes,
            PointEncoding::Uncompressed => Compress::No,
        };
        let validate = if config.validate_points {
            Validate::Yes
        } else {
            Validate::No
        };
        Self { compress, validate }
    }

    /// Deserializes and validates a circuit.
    pub fn load_circuit(&self, bytes: &[u8]) -> Result<R1cs, ArtifactError> {
        let mut reader = Cursor::new(bytes);
        // Field elements in the circuit always use the compressed encoding;
        // only curve points care about the configured mode.
        let circuit = R1cs::deserialize_with_mode(&mut reader, Compress::Yes, Validate::Yes)
            .map_err(ArtifactError::Circuit)?;
        ensure_consumed("circuit", &reader)?;

        circuit.validate()?;
        Ok(circuit)
    }

    /// Deserializes a Groth16 proving key.
    pub fn load_proving_key(&self, bytes: &[u8]) -> Result<ProvingKey<Bn254>, ArtifactError> {
        let mut reader = Cursor::new(bytes);
        let key = ProvingKey::<Bn254>::deserialize_with_mode(&mut reader, self.compress, self.validate)
            .map_err(ArtifactError::ProvingKey)?;
        ensure_consumed("proving key", &reader)?;
        Ok(key)
    }

    /// Loads both buffers and checks that they belong together.
    pub fn load(&self, circuit: &[u8], proving_key: &[u8]) -> Result<ProvingArtifact, ArtifactError> {
        let fingerprint = fingerprint(circuit, proving_key);
        let circuit = self.load_circuit(circuit)?;
        let proving_key = self.load_proving_key(proving_key)?;

        check_key_shape(&circuit, &proving_key)?;

        Ok(ProvingArtifact {
            circuit,
            proving_key,
            fingerprint,
        })
    }
}

/// Checks every query vector of the key against the circuit's wire counts
/// and evaluation domain.
fn check_key_shape(circuit: &R1cs, key: &ProvingKey<Bn254>) -> Result<(), ArtifactError> {
    let wires = circuit.num_wires();
    let private = circuit.num_secret.saturating_add(circuit.num_internal);
    let instance = circuit.num_public.saturating_add(1);

    // Same domain the key generator and the prover derive.
    let constraints = circuit.constraints.len();
    let domain = usize::try_from(instance)
        .ok()
        .and_then(|instance| instance.checked_add(constraints))
        .and_then(GeneralEvaluationDomain::<Fr>::compute_size_of_domain)
        .ok_or(ArtifactError::CircuitTooLarge { constraints })?;
    let h_len = u64::try_from(domain).unwrap_or(u64::MAX).saturating_sub(1);

    let queries = [
        ("gamma_abc_g1", instance, key.vk.gamma_abc_g1.len()),
        ("a_query", wires, key.a_query.len()),
        ("b_g1_query", wires, key.b_g1_query.len()),
        ("b_g2_query", wires, key.b_g2_query.len()),
        ("l_query", private, key.l_query.len()),
        ("h_query", h_len, key.h_query.len()),
    ];
    for (query, expected, len) in queries {
        let found = u64::try_from(len).unwrap_or(u64::MAX);
        if found != expected {
            return Err(ArtifactError::KeyMismatch {
                query,
                expected,
                found,
            });
        }
    }

    Ok(())
}

fn ensure_consumed(kind: &'static str, reader: &Cursor<&[u8]>) -> Result<(), ArtifactError> {
    let total = reader.get_ref().len();
    let read = usize::try_from(reader.position()).unwrap_or(total);
    match total.checked_sub(read) {
        Some(0) | None => Ok(()),
        Some(count) => Err(ArtifactError::TrailingBytes { kind, count }),
    }
}
