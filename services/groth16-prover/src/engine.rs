//! Witness solving and Groth16 proving.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_ff::Zero;
use ark_groth16::Groth16;
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystemRef, LinearCombination, SynthesisError, Variable,
};
use thiserror::Error;

use crate::{
    artifact::{ProvingArtifact, R1cs, Term},
    hints::{HintError, HintRegistry},
    types::{Proof, Witness},
};

/// Errors raised while proving.
#[derive(Error, Debug)]
pub enum ProveError {
    /// The witness shape does not match the circuit.
    #[error(
        "witness has {public} public and {secret} secret values, circuit expects {expected_public} and {expected_secret}"
    )]
    WitnessMismatch {
        /// Public values supplied.
        public: usize,
        /// Secret values supplied.
        secret: usize,
        /// Public values the circuit declares.
        expected_public: u64,
        /// Secret values the circuit declares.
        expected_secret: u64,
    },
    /// The circuit calls a hint the service was not started with.
    #[error("unsatisfied hint `{name}`: not registered")]
    UnsatisfiedHint {
        /// Hint name.
        name: String,
    },
    /// A hint reads a wire no earlier step assigned.
    #[error("hint `{name}` reads unassigned wire {wire}")]
    UnassignedWire {
        /// Hint name.
        name: String,
        /// Wire index.
        wire: u64,
    },
    /// A hint rejected its inputs.
    #[error("hint `{name}` failed: {source}")]
    HintFailed {
        /// Hint name.
        name: String,
        /// Failure reported by the hint.
        #[source]
        source: HintError,
    },
    /// The witness violates a constraint.
    #[error("constraint {constraint} is not satisfied")]
    Unsatisfied {
        /// Index of the first violated constraint.
        constraint: usize,
    },
    /// The Groth16 prover failed.
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

/// Runs the Groth16 prover over loaded artifacts.
///
/// The engine holds no per-request state; one instance serves every request
/// concurrently.
#[derive(Clone, Debug, Default)]
pub struct ProofEngine {
    hints: Arc<HintRegistry>,
}

impl ProofEngine {
    /// Creates an engine resolving hint calls against `hints`.
    pub fn new(hints: HintRegistry) -> Self {
        Self {
            hints: Arc::new(hints),
        }
    }

    /// The hint table circuits are solved against.
    pub fn hints(&self) -> &HintRegistry {
        &self.hints
    }

    /// Solves `witness` against the artifact's circuit and produces a proof.
    ///
    /// The witness is fully checked before the prover runs, so an invalid
    /// witness fails with a precise error instead of producing a proof that
    /// does not verify.
    pub fn prove(&self, artifact: &ProvingArtifact, witness: &Witness) -> Result<Proof, ProveError> {
        let assignment = solve(artifact.circuit(), &self.hints, witness)?;

        let circuit = Synthesizer::prove(artifact.circuit(), &assignment);
        let mut rng = rand::thread_rng();
        let proof = Groth16::<Bn254>::create_random_proof_with_reduction(
            circuit,
            artifact.proving_key(),
            &mut rng,
        )?;

        Ok(proof.into())
    }
}

/// Computes the full wire assignment `[1, public.., secret.., internal..]`
/// and checks every constraint against it.
pub(crate) fn solve(
    circuit: &R1cs,
    hints: &HintRegistry,
    witness: &Witness,
) -> Result<Vec<Fr>, ProveError> {
    let public = witness.public_inputs();
    let secret = witness.secret_inputs();
    if u64::try_from(public.len()).ok() != Some(circuit.num_public)
        || u64::try_from(secret.len()).ok() != Some(circuit.num_secret)
    {
        return Err(ProveError::WitnessMismatch {
            public: public.len(),
            secret: secret.len(),
            expected_public: circuit.num_public,
            expected_secret: circuit.num_secret,
        });
    }

    // Wire counts were bounded when the circuit was loaded.
    let wires = usize::try_from(circuit.num_wires()).unwrap_or(usize::MAX);
    let mut values = Vec::with_capacity(wires);
    values.push(Some(Fr::from(1u64)));
    values.extend(public.iter().chain(secret).copied().map(Some));
    values.resize(wires, None);

    for call in &circuit.hints {
        let hint = hints
            .get(&call.name)
            .ok_or_else(|| ProveError::UnsatisfiedHint {
                name: call.name.clone(),
            })?;

        let inputs = call
            .inputs
            .iter()
            .map(|wire| {
                wire_index(*wire)
                    .and_then(|index| values.get(index).copied().flatten())
                    .ok_or_else(|| ProveError::UnassignedWire {
                        name: call.name.clone(),
                        wire: *wire,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = vec![Fr::zero(); call.outputs.len()];
        hint(&inputs, &mut outputs).map_err(|source| ProveError::HintFailed {
            name: call.name.clone(),
            source,
        })?;

        for (wire, value) in call.outputs.iter().zip(outputs) {
            if let Some(slot) = wire_index(*wire).and_then(|index| values.get_mut(index)) {
                *slot = Some(value);
            }
        }
    }

    // Validation guarantees every internal wire has exactly one writer.
    let assignment: Vec<Fr> = values.into_iter().map(Option::unwrap_or_default).collect();

    for (index, constraint) in circuit.constraints.iter().enumerate() {
        let a = evaluate(&constraint.a, &assignment);
        let b = evaluate(&constraint.b, &assignment);
        let c = evaluate(&constraint.c, &assignment);
        if a * b != c {
            return Err(ProveError::Unsatisfied { constraint: index });
        }
    }

    Ok(assignment)
}

fn wire_index(wire: u64) -> Option<usize> {
    usize::try_from(wire).ok()
}

fn evaluate(terms: &[Term], assignment: &[Fr]) -> Fr {
    terms
        .iter()
        .filter_map(|term| {
            wire_index(term.wire)
                .and_then(|index| assignment.get(index))
                .map(|value| term.coeff * value)
        })
        .sum()
}

/// Feeds a loaded [`R1cs`] to the arkworks constraint system.
///
/// With an assignment it is used for proving; without one it only describes
/// the constraint shape, which is what key generation needs.
pub(crate) struct Synthesizer<'a> {
    circuit: &'a R1cs,
    assignment: Option<&'a [Fr]>,
}

impl<'a> Synthesizer<'a> {
    pub(crate) fn prove(circuit: &'a R1cs, assignment: &'a [Fr]) -> Self {
        Self {
            circuit,
            assignment: Some(assignment),
        }
    }

    #[cfg(test)]
    pub(crate) fn setup(circuit: &'a R1cs) -> Self {
        Self {
            circuit,
            assignment: None,
        }
    }

    fn value(&self, wire: usize) -> Result<Fr, SynthesisError> {
        self.assignment
            .and_then(|assignment| assignment.get(wire).copied())
            .ok_or(SynthesisError::AssignmentMissing)
    }
}

impl ConstraintSynthesizer<Fr> for Synthesizer<'_> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let wires = usize::try_from(self.circuit.num_wires()).map_err(|_| SynthesisError::Unsatisfiable)?;
        let first_secret = usize::try_from(self.circuit.num_public)
            .ok()
            .and_then(|public| public.checked_add(1))
            .ok_or(SynthesisError::Unsatisfiable)?;

        let mut variables = Vec::with_capacity(wires);
        variables.push(Variable::One);
        for wire in 1..wires {
            let variable = if wire < first_secret {
                cs.new_input_variable(|| self.value(wire))?
            } else {
                cs.new_witness_variable(|| self.value(wire))?
            };
            variables.push(variable);
        }

        let combine = |terms: &[Term]| -> Result<LinearCombination<Fr>, SynthesisError> {
            terms
                .iter()
                .map(|term| {
                    wire_index(term.wire)
                        .and_then(|index| variables.get(index))
                        .map(|variable| (term.coeff, *variable))
                        .ok_or(SynthesisError::Unsatisfiable)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(LinearCombination)
        };

        for constraint in &self.circuit.constraints {
            cs.enforce_constraint(
                combine(&constraint.a)?,
                combine(&constraint.b)?,
                combine(&constraint.c)?,
            )?;
        }

        Ok(())
    }
}
