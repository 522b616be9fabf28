//! Operation surface shared by prover backends.
//!
//! A prover service holds, per project, a compiled circuit and its proving
//! key, and turns witness payloads into verifier-contract calldata. The
//! transport layer talks to a backend only through [`ProverInterface`].
//!
//! Projects are addressed by [`ProjectId`] and stored under the
//! [`ProjectKey`] derived from it; see [`digest`] for the hashing scheme.

// Re-export types at crate root for convenience
pub use types::{ProjectId, ProjectKey};

pub mod digest;
pub mod types;

/// Prover interface for project-keyed proof generation.
pub trait ProverInterface {
    /// Error returned by both operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Registers a project's circuit and proving key.
    ///
    /// Registering a project that is already present succeeds without
    /// replacing the stored artifacts.
    ///
    /// # Parameters
    ///
    /// - `project`: The project to register
    /// - `circuit`: The serialized constraint system
    /// - `proving_key`: The serialized proving key
    ///
    /// # Errors
    ///
    /// Fails if either buffer does not deserialize.
    fn new_project(
        &self,
        project: &ProjectId,
        circuit: &[u8],
        proving_key: &[u8],
    ) -> Result<(), Self::Error>;

    /// Proves a witness against a registered project and returns the
    /// verifier calldata.
    ///
    /// Exactly one payload is accepted per call.
    ///
    /// # Errors
    ///
    /// Fails on a payload count other than one, an unknown project, a
    /// malformed witness, a witness the circuit rejects, or a proof the
    /// calldata encoder cannot repack.
    fn execute_task(&self, project: &ProjectId, payloads: &[Vec<u8>])
    -> Result<Vec<u8>, Self::Error>;
}
