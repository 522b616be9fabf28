//! Groth16 prover service over BN254.
//!
//! Holds one proving artifact (constraint system and proving key) per
//! project, proves witnesses against it and returns calldata for an on-chain
//! Groth16 verifier.
//!
//! ## Overview
//!
//! - [`artifact`]: deserializes circuits and proving keys
//! - [`registry`]: concurrent project-keyed artifact store
//! - [`engine`]: witness solving, hints and proving
//! - [`codec`]: byte-exact verifier calldata layout
//!
//! [`Groth16ProverService`] ties them together behind
//! [`ProverInterface`].

use prover_interface::{ProjectId, ProverInterface};
use thiserror::Error;
use tracing::{debug, info_span, warn};

pub use artifact::{ArtifactError, ArtifactLoader, ProvingArtifact, R1cs};
pub use codec::{CodecError, encode_calldata, pack_calldata};
pub use config::{ConfigError, PointEncoding, ProverConfig};
pub use engine::{ProofEngine, ProveError};
pub use hints::{HintError, HintRegistry};
pub use registry::{ProjectRegistry, Registration};
pub use types::{Proof, Witness, WitnessError};

pub mod artifact;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod hints;
pub mod registry;
mod test;
pub mod types;

/// Errors returned by [`Groth16ProverService`].
#[derive(Error, Debug)]
pub enum ProverError {
    /// The circuit or proving key could not be loaded.
    #[error("failed to load project {project}: {source}")]
    Deserialization {
        /// Project being registered.
        project: ProjectId,
        /// Loader failure.
        #[source]
        source: ArtifactError,
    },
    /// No artifact is registered for the project.
    #[error("project {project} does not exist")]
    ProjectNotFound {
        /// Requested project.
        project: ProjectId,
    },
    /// The witness payload is malformed.
    #[error("invalid witness for project {project}: {source}")]
    InvalidWitness {
        /// Requested project.
        project: ProjectId,
        /// Decoding failure.
        #[source]
        source: WitnessError,
    },
    /// The prover rejected the witness.
    #[error("failed to prove project {project}: {source}")]
    ProvingFailed {
        /// Requested project.
        project: ProjectId,
        /// Prover failure.
        #[source]
        source: ProveError,
    },
    /// The proof could not be packed into calldata.
    #[error("failed to encode proof for project {project}: {source}")]
    Codec {
        /// Requested project.
        project: ProjectId,
        /// Codec failure.
        #[source]
        source: CodecError,
    },
    /// A task carried other than exactly one payload.
    #[error("expected exactly {expected} payload, got {found}")]
    PayloadCount {
        /// Payloads accepted per task.
        expected: usize,
        /// Payloads received.
        found: usize,
    },
}

/// Multi-project Groth16 prover.
///
/// `Send + Sync`; share one instance across request handlers.
#[derive(Default)]
pub struct Groth16ProverService {
    registry: ProjectRegistry,
    engine: ProofEngine,
}

impl Groth16ProverService {
    /// Builds a service from its configuration.
    pub fn new(config: ProverConfig) -> Result<Self, ConfigError> {
        let hints = match &config.hints {
            Some(names) => HintRegistry::with_names(names)?,
            None => HintRegistry::standard(),
        };
        debug!(
            hints = hints.len(),
            digest = %hex::encode(hints.digest()),
            "hint set assembled"
        );

        Ok(Self {
            registry: ProjectRegistry::new(ArtifactLoader::new(&config)),
            engine: ProofEngine::new(hints),
        })
    }

    /// The project registry.
    pub fn registry(&self) -> &ProjectRegistry {
        &self.registry
    }

    /// Registers a project, see [`ProjectRegistry::register`].
    pub fn register(
        &self,
        project: &ProjectId,
        circuit: &[u8],
        proving_key: &[u8],
    ) -> Result<Registration, ProverError> {
        let _span = info_span!("new_project", %project).entered();

        self.registry
            .register(project.key(), project, circuit, proving_key)
            .map_err(|source| {
                warn!(error = %source, "failed to load project artifacts");
                ProverError::Deserialization {
                    project: project.clone(),
                    source,
                }
            })
    }

    /// Proves one witness payload and returns the verifier calldata.
    pub fn execute(&self, project: &ProjectId, payload: &[u8]) -> Result<Vec<u8>, ProverError> {
        let _span = info_span!("execute_task", %project).entered();

        let artifact = self
            .registry
            .lookup(&project.key())
            .ok_or_else(|| ProverError::ProjectNotFound {
                project: project.clone(),
            })?;

        let witness = Witness::from_bytes(payload).map_err(|source| ProverError::InvalidWitness {
            project: project.clone(),
            source,
        })?;

        let proof = self.engine.prove(&artifact, &witness).map_err(|source| {
            warn!(error = %source, "proving failed");
            ProverError::ProvingFailed {
                project: project.clone(),
                source,
            }
        })?;

        let calldata = encode_calldata(&proof, &witness).map_err(|source| ProverError::Codec {
            project: project.clone(),
            source,
        })?;

        debug!(bytes = calldata.len(), "proof encoded");
        Ok(calldata)
    }
}

impl ProverInterface for Groth16ProverService {
    type Error = ProverError;

    fn new_project(
        &self,
        project: &ProjectId,
        circuit: &[u8],
        proving_key: &[u8],
    ) -> Result<(), Self::Error> {
        self.register(project, circuit, proving_key).map(|_| ())
    }

    fn execute_task(
        &self,
        project: &ProjectId,
        payloads: &[Vec<u8>],
    ) -> Result<Vec<u8>, Self::Error> {
        match payloads {
            [payload] => self.execute(project, payload),
            _ => Err(ProverError::PayloadCount {
                expected: 1,
                found: payloads.len(),
            }),
        }
    }
}
