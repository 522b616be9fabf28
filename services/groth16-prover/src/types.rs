use ark_bn254::{Bn254, Fr};
use ark_groth16::Proof as ArkProof;
use thiserror::Error;

use crate::crypto::bn254::{
    FIELD_ELEMENT_SIZE, PROOF_SIZE, fr_from_be_bytes, fr_to_be_bytes, serialize_g1_point,
    serialize_g2_point,
};

/// Size of the witness header: public count, secret count and vector length,
/// each a big-endian `u32`.
pub const WITNESS_HEADER_SIZE: usize = 12;

/// Errors raised while decoding a witness payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WitnessError {
    /// The payload ended before the header or the declared elements.
    #[error("witness truncated: need {needed} bytes, got {actual}")]
    Truncated {
        /// Bytes required by the header.
        needed: usize,
        /// Bytes available.
        actual: usize,
    },
    /// The vector length disagrees with the public and secret counts.
    #[error("witness declares {public} public and {secret} secret values but carries {elements}")]
    CountMismatch {
        /// Declared public count.
        public: u32,
        /// Declared secret count.
        secret: u32,
        /// Declared vector length.
        elements: u32,
    },
    /// An element is not reduced modulo the scalar field order.
    #[error("witness element {index} is not a canonical field element")]
    NonCanonical {
        /// Position of the offending element.
        index: usize,
    },
    /// Bytes remain after the last declared element.
    #[error("witness has {0} trailing bytes")]
    TrailingBytes(usize),
    /// The witness has more values than the header can describe.
    #[error("witness has too many values to encode")]
    TooLarge,
}

/// Public and secret scalar assignments for one proving request.
///
/// Binary form: `u32 nb_public || u32 nb_secret || u32 len || len * Fr`,
/// all big-endian, public values first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    nb_public: usize,
    values: Vec<Fr>,
}

impl Witness {
    /// Builds a witness from its public and secret values.
    pub fn new(public: Vec<Fr>, secret: Vec<Fr>) -> Result<Self, WitnessError> {
        let nb_public = public.len();
        let mut values = public;
        values.extend(secret);

        // Every count has to fit the u32 header fields.
        u32::try_from(values.len()).map_err(|_| WitnessError::TooLarge)?;

        Ok(Self { nb_public, values })
    }

    /// Decodes a witness payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WitnessError> {
        let truncated = |needed: usize| WitnessError::Truncated {
            needed,
            actual: bytes.len(),
        };

        let (header, body) = bytes
            .split_first_chunk::<WITNESS_HEADER_SIZE>()
            .ok_or_else(|| truncated(WITNESS_HEADER_SIZE))?;

        let public = read_u32(&header[0..4]);
        let secret = read_u32(&header[4..8]);
        let elements = read_u32(&header[8..12]);

        if public.checked_add(secret) != Some(elements) {
            return Err(WitnessError::CountMismatch {
                public,
                secret,
                elements,
            });
        }

        let count = usize::try_from(elements).map_err(|_| WitnessError::TooLarge)?;
        let body_len = count
            .checked_mul(FIELD_ELEMENT_SIZE)
            .ok_or(WitnessError::TooLarge)?;
        if body.len() < body_len {
            return Err(truncated(
                WITNESS_HEADER_SIZE.checked_add(body_len).ok_or(WitnessError::TooLarge)?,
            ));
        }
        if body.len() > body_len {
            return Err(WitnessError::TrailingBytes(
                body.len().checked_sub(body_len).unwrap_or_default(),
            ));
        }

        let values = body
            .chunks_exact(FIELD_ELEMENT_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                let mut element = [0u8; FIELD_ELEMENT_SIZE];
                element.copy_from_slice(chunk);
                fr_from_be_bytes(&element).ok_or(WitnessError::NonCanonical { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let nb_public = usize::try_from(public).map_err(|_| WitnessError::TooLarge)?;
        Ok(Self { nb_public, values })
    }

    /// Encodes the witness into its binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let capacity = self
            .values
            .len()
            .saturating_mul(FIELD_ELEMENT_SIZE)
            .saturating_add(WITNESS_HEADER_SIZE);
        let mut out = Vec::with_capacity(capacity);

        // Counts were bounded by u32 at construction.
        out.extend_from_slice(&count_u32(self.nb_public).to_be_bytes());
        out.extend_from_slice(&count_u32(self.secret_inputs().len()).to_be_bytes());
        out.extend_from_slice(&count_u32(self.values.len()).to_be_bytes());
        for value in &self.values {
            out.extend_from_slice(&fr_to_be_bytes(value));
        }

        out
    }

    /// The public part of the witness, with no secret values.
    pub fn public(&self) -> Witness {
        Self {
            nb_public: self.nb_public,
            values: self.public_inputs().to_vec(),
        }
    }

    /// Public values, in declaration order.
    pub fn public_inputs(&self) -> &[Fr] {
        &self.values[..self.nb_public]
    }

    /// Secret values, in declaration order.
    pub fn secret_inputs(&self) -> &[Fr] {
        &self.values[self.nb_public..]
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_be_bytes(word)
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Groth16 proof over BN254 produced by the proof engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Proof(ArkProof<Bn254>);

impl Proof {
    /// The underlying arkworks proof.
    pub fn inner(&self) -> &ArkProof<Bn254> {
        &self.0
    }

    /// Flat encoding consumed by Solidity Groth16 verifiers:
    /// `a.x || a.y || b.x_im || b.x_re || b.y_im || b.y_re || c.x || c.y`.
    pub fn to_verifier_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PROOF_SIZE);
        out.extend_from_slice(&serialize_g1_point(&self.0.a));
        out.extend_from_slice(&serialize_g2_point(&self.0.b));
        out.extend_from_slice(&serialize_g1_point(&self.0.c));
        out
    }
}

impl From<ArkProof<Bn254>> for Proof {
    fn from(proof: ArkProof<Bn254>) -> Self {
        Self(proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Witness {
        Witness::new(
            vec![Fr::from(42u64)],
            vec![Fr::from(42u64), Fr::from(7u64)],
        )
        .unwrap()
    }

    #[test]
    fn test_witness_layout() {
        let bytes = sample().to_bytes();

        assert_eq!(bytes.len(), WITNESS_HEADER_SIZE + 3 * 32);
        assert_eq!(hex::encode(&bytes[..12]), "000000010000000200000003");
        assert_eq!(bytes[12 + 31], 42);
        assert_eq!(bytes[12 + 95], 7);
    }

    #[test]
    fn test_witness_decodes_its_encoding() {
        let witness = sample();
        assert_eq!(Witness::from_bytes(&witness.to_bytes()).unwrap(), witness);
    }

    #[test]
    fn test_public_witness_drops_secrets() {
        let public = sample().public();

        assert_eq!(public.public_inputs(), &[Fr::from(42u64)]);
        assert!(public.secret_inputs().is_empty());
        assert_eq!(hex::encode(&public.to_bytes()[..12]), "000000010000000000000001");
    }

    #[test]
    fn test_witness_rejects_short_header() {
        assert_eq!(
            Witness::from_bytes(&[0u8; 5]),
            Err(WitnessError::Truncated {
                needed: 12,
                actual: 5
            })
        );
    }

    #[test]
    fn test_witness_rejects_count_mismatch() {
        let mut bytes = sample().to_bytes();
        bytes[11] = 4;
        assert_eq!(
            Witness::from_bytes(&bytes),
            Err(WitnessError::CountMismatch {
                public: 1,
                secret: 2,
                elements: 4
            })
        );
    }

    #[test]
    fn test_witness_rejects_truncated_body() {
        let bytes = sample().to_bytes();
        assert!(matches!(
            Witness::from_bytes(&bytes[..bytes.len() - 1]),
            Err(WitnessError::Truncated { needed: 108, .. })
        ));
    }

    #[test]
    fn test_witness_rejects_trailing_bytes() {
        let mut bytes = sample().to_bytes();
        bytes.extend_from_slice(&[0, 0]);
        assert_eq!(Witness::from_bytes(&bytes), Err(WitnessError::TrailingBytes(2)));
    }

    #[test]
    fn test_witness_rejects_non_canonical_element() {
        let mut bytes = sample().to_bytes();
        bytes[12 + 32..12 + 64].copy_from_slice(&[0xff; 32]);
        assert_eq!(
            Witness::from_bytes(&bytes),
            Err(WitnessError::NonCanonical { index: 1 })
        );
    }

    #[test]
    fn test_empty_witness() {
        let witness = Witness::from_bytes(&[0u8; 12]).unwrap();
        assert!(witness.public_inputs().is_empty());
        assert!(witness.secret_inputs().is_empty());
    }
}
