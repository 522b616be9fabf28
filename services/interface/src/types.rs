use core::fmt;

use crate::digest::{DIGEST_SIZE, Sha256Digest, sha256, tagged_struct};

/// Tag under which project keys are derived.
const PROJECT_KEY_TAG: &str = "prover.ProjectKey";

/// Logical identifier of a project as carried by requests.
///
/// Two versions of the same `id` are distinct projects and can be registered
/// side by side.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectId {
    /// Project identifier assigned by the caller.
    pub id: String,
    /// Project version; may be empty.
    pub version: String,
}

impl ProjectId {
    /// Creates a project identifier from its id and version.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Derives the registry key for this project.
    pub fn key(&self) -> ProjectKey {
        ProjectKey::derive(&self.id, &self.version)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{:?}", self.id)
        } else {
            write!(f, "{:?}@{:?}", self.id, self.version)
        }
    }
}

/// Fixed-width registry key derived from a [`ProjectId`].
///
/// The key is `tagged_struct("prover.ProjectKey", [sha256(id), sha256(version)])`.
/// Both components are hashed on their own, so `("1", "23")` and `("12", "3")`
/// derive different keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey(Sha256Digest);

impl ProjectKey {
    /// Derives the key for a project id and version.
    pub fn derive(id: &str, version: &str) -> Self {
        Self(tagged_struct(PROJECT_KEY_TAG, &[sha256(id), sha256(version)]))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }
}

impl From<[u8; DIGEST_SIZE]> for ProjectKey {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProjectKey({self})")
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
