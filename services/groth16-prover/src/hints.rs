//! Hints: out-of-circuit helpers invoked while solving a witness.
//!
//! A circuit computes some internal wires with operations the constraint
//! system cannot express directly (byte decomposition, bitwise logic) and
//! then constrains the results. The set of hints is fixed when the service
//! starts; a circuit calling a hint outside that set cannot be proven.

use std::collections::HashMap;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use prover_interface::digest::{Sha256Digest, sha256, tagged_iter};
use thiserror::Error;

use crate::config::ConfigError;

const HINT_SET_TAG: &str = "prover.HintSet";

/// Hint function: reads `inputs` and fills every slot of `outputs`.
pub type HintFn = fn(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError>;

/// Errors raised by a hint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HintError {
    /// Wrong number of inputs or outputs.
    #[error("expected {expected} inputs, got {inputs} inputs and {outputs} outputs")]
    Arity {
        /// Inputs the hint takes.
        expected: usize,
        /// Inputs given.
        inputs: usize,
        /// Outputs requested.
        outputs: usize,
    },
    /// An input does not fit in the requested width.
    #[error("input does not fit in {bits} bits")]
    Overflow {
        /// Available width.
        bits: usize,
    },
}

/// Named hint table.
#[derive(Clone, Debug)]
pub struct HintRegistry {
    hints: HashMap<String, HintFn>,
}

impl HintRegistry {
    /// Every standard hint.
    pub fn standard() -> Self {
        let hints: [(&str, HintFn); 5] = [
            ("uints.to_bytes", to_bytes),
            ("uints.and", and),
            ("uints.or", or),
            ("uints.xor", xor),
            ("bits.to_binary", to_binary),
        ];

        Self {
            hints: hints
                .into_iter()
                .map(|(name, hint)| (name.to_string(), hint))
                .collect(),
        }
    }

    /// The standard hints restricted to `names`.
    pub fn with_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let standard = Self::standard();
        let mut hints = HashMap::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let hint = standard
                .get(name)
                .ok_or_else(|| ConfigError::UnknownHint(name.to_string()))?;
            hints.insert(name.to_string(), hint);
        }
        Ok(Self { hints })
    }

    /// Looks up a hint by name.
    pub fn get(&self, name: &str) -> Option<HintFn> {
        self.hints.get(name).copied()
    }

    /// Number of registered hints.
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    /// Whether no hint is registered.
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }

    /// Digest of the registered hint names, independent of insertion order.
    pub fn digest(&self) -> Sha256Digest {
        let mut names: Vec<&String> = self.hints.keys().collect();
        names.sort();
        tagged_iter(HINT_SET_TAG, names.into_iter().map(sha256))
    }
}

impl Default for HintRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Output count a hint accepts.
#[derive(Clone, Copy)]
enum Outputs {
    AtLeast(usize),
    Exactly(usize),
}

fn check_arity(expected: usize, inputs: &[Fr], outputs: &[Fr], accepted: Outputs) -> Result<(), HintError> {
    let outputs_ok = match accepted {
        Outputs::AtLeast(min) => outputs.len() >= min,
        Outputs::Exactly(count) => outputs.len() == count,
    };
    if inputs.len() != expected || !outputs_ok {
        return Err(HintError::Arity {
            expected,
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }
    Ok(())
}

/// Little-endian bytes of the input, one per output.
fn to_bytes(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError> {
    check_arity(1, inputs, outputs, Outputs::AtLeast(1))?;
    let bits = outputs.len().saturating_mul(8);
    let bytes = inputs[0].into_bigint().to_bytes_le();

    if bytes.iter().skip(outputs.len()).any(|b| *b != 0) {
        return Err(HintError::Overflow { bits });
    }

    for (out, byte) in outputs.iter_mut().zip(bytes.iter().chain(std::iter::repeat(&0))) {
        *out = Fr::from(*byte);
    }
    Ok(())
}

/// Little-endian bits of the input, one per output.
fn to_binary(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError> {
    check_arity(1, inputs, outputs, Outputs::AtLeast(1))?;
    let bits = inputs[0].into_bigint().to_bits_le();

    if bits.iter().skip(outputs.len()).any(|b| *b) {
        return Err(HintError::Overflow {
            bits: outputs.len(),
        });
    }

    for (out, bit) in outputs.iter_mut().zip(bits.iter().chain(std::iter::repeat(&false))) {
        *out = Fr::from(*bit);
    }
    Ok(())
}

fn as_u64(value: &Fr) -> Result<u64, HintError> {
    let limbs = value.into_bigint().0;
    if limbs[1..].iter().any(|limb| *limb != 0) {
        return Err(HintError::Overflow { bits: 64 });
    }
    Ok(limbs[0])
}

fn binary_op(inputs: &[Fr], outputs: &mut [Fr], op: fn(u64, u64) -> u64) -> Result<(), HintError> {
    check_arity(2, inputs, outputs, Outputs::Exactly(1))?;
    let lhs = as_u64(&inputs[0])?;
    let rhs = as_u64(&inputs[1])?;
    outputs[0] = Fr::from(op(lhs, rhs));
    Ok(())
}

fn and(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError> {
    binary_op(inputs, outputs, |a, b| a & b)
}

fn or(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError> {
    binary_op(inputs, outputs, |a, b| a | b)
}

fn xor(inputs: &[Fr], outputs: &mut [Fr]) -> Result<(), HintError> {
    binary_op(inputs, outputs, |a, b| a ^ b)
}
