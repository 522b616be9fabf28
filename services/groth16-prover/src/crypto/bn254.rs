use ark_bn254::{Fq, Fr, G1Affine, G2Affine};
use ark_ec::AffineRepr;
use ark_ff::{BigInteger, BigInteger256, PrimeField};

/// Width of one BN254 field element in bytes.
pub const FIELD_ELEMENT_SIZE: usize = 32;
/// G1 point: x, y.
pub const G1_SIZE: usize = FIELD_ELEMENT_SIZE * 2;
/// G2 point: x_1, x_0, y_1, y_0.
pub const G2_SIZE: usize = FIELD_ELEMENT_SIZE * 4;
/// Groth16 proof: a, b, c.
pub const PROOF_SIZE: usize = G1_SIZE + G2_SIZE + G1_SIZE;

/// Decodes a 32-byte big-endian scalar.
///
/// Returns `None` if the value is not reduced modulo the scalar field order.
pub fn fr_from_be_bytes(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> Option<Fr> {
    Fr::from_bigint(bytes_to_limbs(bytes))
}

/// Encodes a scalar as 32 big-endian bytes.
pub fn fr_to_be_bytes(f: &Fr) -> [u8; FIELD_ELEMENT_SIZE] {
    to_be_array(&f.into_bigint())
}

fn fq_to_be_bytes(f: &Fq) -> [u8; FIELD_ELEMENT_SIZE] {
    to_be_array(&f.into_bigint())
}

/// Right-aligns `to_bytes_be` in a fixed chunk.
fn to_be_array(num: &BigInteger256) -> [u8; FIELD_ELEMENT_SIZE] {
    let mut out = [0u8; FIELD_ELEMENT_SIZE];
    for (dst, src) in out.iter_mut().rev().zip(num.to_bytes_be().into_iter().rev()) {
        *dst = src;
    }
    out
}

/// Serializes a G1 point as `x || y`.
///
/// The point at infinity has no affine coordinates and encodes as zeros,
/// which is how Solidity verifiers represent it.
pub fn serialize_g1_point(p: &G1Affine) -> [u8; G1_SIZE] {
    let mut buf = [0u8; G1_SIZE];

    if let Some((x, y)) = p.xy() {
        buf[0..32].copy_from_slice(&fq_to_be_bytes(x));
        buf[32..64].copy_from_slice(&fq_to_be_bytes(y));
    }

    buf
}

/// Serializes a G2 point as `x_im || x_re || y_im || y_re`.
///
/// This is the precompile ordering: the imaginary part (`c1`) of each
/// coordinate comes first.
pub fn serialize_g2_point(p: &G2Affine) -> [u8; G2_SIZE] {
    let mut buf = [0u8; G2_SIZE];

    if let Some((x, y)) = p.xy() {
        buf[0..32].copy_from_slice(&fq_to_be_bytes(&x.c1));
        buf[32..64].copy_from_slice(&fq_to_be_bytes(&x.c0));
        buf[64..96].copy_from_slice(&fq_to_be_bytes(&y.c1));
        buf[96..128].copy_from_slice(&fq_to_be_bytes(&y.c0));
    }

    buf
}

/// Converts 32 bytes in big-endian format to a 4-limb little-endian representation.
pub(crate) fn bytes_to_limbs(bytes: &[u8; FIELD_ELEMENT_SIZE]) -> BigInteger256 {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().rev().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_be_bytes(word);
    }
    BigInteger256::new(limbs)
}
