//! Tagged SHA-256 hashing.
//!
//! A tagged struct digest commits to a type tag and an ordered list of field
//! digests:
//!
//! `sha256(sha256(tag) || field_0 || ... || field_n || u16_le(n + 1))`
//!
//! Fields are digests themselves, so variable-length inputs never run into
//! each other the way a plain concatenation would.

use sha2::{Digest, Sha256};

/// The size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// A 32-byte SHA-256 digest.
pub type Sha256Digest = [u8; DIGEST_SIZE];

/// Plain SHA-256 of `data`.
pub fn sha256(data: impl AsRef<[u8]>) -> Sha256Digest {
    Sha256::digest(data.as_ref()).into()
}

/// Creates a tagged struct hash from a tag and a list of field digests.
///
/// # Panics
///
/// Panics if the number of fields exceeds 65535 (2^16 - 1). Every caller in
/// this workspace passes a fixed, small field list.
pub fn tagged_struct(tag: &str, down: &[Sha256Digest]) -> Sha256Digest {
    let tag_digest = Sha256::digest(tag.as_bytes());

    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    for digest in down {
        hasher.update(digest);
    }

    let down_count: u16 = down
        .len()
        .try_into()
        .expect("struct defined with more than 2^16 fields");
    hasher.update(down_count.to_le_bytes());

    hasher.finalize().into()
}

/// Creates a tagged list hash from a tag and an iterator of digests.
///
/// Elements are folded right to left into cons cells, each one a
/// [`tagged_struct`] of `(head, tail)`. The empty list hashes to zeros.
pub fn tagged_iter(tag: &str, iter: impl DoubleEndedIterator<Item = Sha256Digest>) -> Sha256Digest {
    iter.rfold([0u8; DIGEST_SIZE], |list_digest, elem| {
        tagged_struct(tag, &[elem, list_digest])
    })
}
