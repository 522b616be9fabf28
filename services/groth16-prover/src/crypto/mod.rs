//! Byte-level conversions for the BN254 curve.
//!
//! Verifier contracts and the witness format exchange field elements as
//! 32-byte big-endian chunks, while the arkworks types keep little-endian
//! `u64` limbs. [`bn254`] converts between the two.

pub mod bn254;
