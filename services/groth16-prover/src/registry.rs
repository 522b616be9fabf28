//! Concurrent project registry.
//!
//! Entries are published once and never replaced or removed. Lookups and
//! registrations only lock the shard holding their key, so unrelated
//! projects never wait on each other.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use prover_interface::{ProjectId, ProjectKey};
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactError, ArtifactLoader, ProvingArtifact, fingerprint};

/// Outcome of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The artifact was loaded and published.
    Created,
    /// The key was already registered; the stored artifact is unchanged.
    AlreadyRegistered,
}

/// Map from project key to loaded artifact.
#[derive(Default)]
pub struct ProjectRegistry {
    projects: DashMap<ProjectKey, Arc<ProvingArtifact>>,
    loader: ArtifactLoader,
}

impl ProjectRegistry {
    /// Creates an empty registry loading artifacts with `loader`.
    pub fn new(loader: ArtifactLoader) -> Self {
        Self {
            projects: DashMap::new(),
            loader,
        }
    }

    /// Loads and publishes a project's artifact.
    ///
    /// Registration is idempotent: a key that is already present is left
    /// untouched and reported as [`Registration::AlreadyRegistered`]. Loading
    /// happens outside any lock, so two callers racing on the same new key
    /// may both load; the first to publish wins and the other's artifact is
    /// dropped.
    pub fn register(
        &self,
        key: ProjectKey,
        project: &ProjectId,
        circuit: &[u8],
        proving_key: &[u8],
    ) -> Result<Registration, ArtifactError> {
        if let Some(existing) = self.lookup(&key) {
            Self::check_duplicate(project, &existing, circuit, proving_key);
            return Ok(Registration::AlreadyRegistered);
        }

        let artifact = Arc::new(self.loader.load(circuit, proving_key)?);

        // The shard stays write-locked while the entry is alive.
        let outcome = match self.projects.entry(key) {
            Entry::Occupied(_) => Registration::AlreadyRegistered,
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&artifact));
                Registration::Created
            }
        };

        match outcome {
            Registration::Created => info!(
                %project,
                constraints = artifact.circuit().constraints.len(),
                public_inputs = artifact.circuit().num_public,
                "project registered"
            ),
            Registration::AlreadyRegistered => {
                debug!(%project, "project registered concurrently, keeping first artifact")
            }
        }
        Ok(outcome)
    }

    fn check_duplicate(
        project: &ProjectId,
        existing: &ProvingArtifact,
        circuit: &[u8],
        proving_key: &[u8],
    ) {
        if existing.fingerprint() == &fingerprint(circuit, proving_key) {
            debug!(%project, "project already registered");
        } else {
            warn!(
                %project,
                "project already registered with different artifacts, keeping the original"
            );
        }
    }

    /// Returns the artifact registered under `key`.
    pub fn lookup(&self, key: &ProjectKey) -> Option<Arc<ProvingArtifact>> {
        self.projects.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &ProjectKey) -> bool {
        self.projects.contains_key(key)
    }

    /// Number of registered projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Whether no project is registered.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
