#![cfg(test)]

use std::thread;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, Proof as ArkProof, ProvingKey, VerifyingKey, prepare_verifying_key};
use ark_serialize::CanonicalSerialize;
use prover_interface::{ProjectId, ProverInterface};
use rand::{SeedableRng, rngs::StdRng};

use super::*;
use crate::artifact::{CIRCUIT_VERSION, Constraint, HintCall, Term};
use crate::codec::{CHUNK_SIZE, PROOF_CORE_SIZE};
use crate::crypto::bn254::bytes_to_limbs;
use crate::engine::Synthesizer;

pub(crate) struct Fixture {
    pub circuit_bytes: Vec<u8>,
    pub proving_key_bytes: Vec<u8>,
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

fn term(wire: u64, coeff: u64) -> Term {
    Term {
        wire,
        coeff: Fr::from(coeff),
    }
}

/// `Y == X` with `Y` public and `X` secret. `X` is also split into four
/// bytes by the `uints.to_bytes` hint and recomposed.
///
/// Wires: `[1, Y, X, b0, b1, b2, b3]`.
pub(crate) fn equality_circuit() -> R1cs {
    R1cs {
        version: CIRCUIT_VERSION,
        num_public: 1,
        num_secret: 1,
        num_internal: 4,
        constraints: vec![
            Constraint {
                a: vec![term(2, 1)],
                b: vec![term(0, 1)],
                c: vec![term(1, 1)],
            },
            Constraint {
                a: vec![term(3, 1), term(4, 1 << 8), term(5, 1 << 16), term(6, 1 << 24)],
                b: vec![term(0, 1)],
                c: vec![term(2, 1)],
            },
        ],
        hints: vec![HintCall {
            name: "uints.to_bytes".to_string(),
            inputs: vec![2],
            outputs: vec![3, 4, 5, 6],
        }],
    }
}

pub(crate) fn equality_witness(x: u64, y: u64) -> Witness {
    Witness::new(vec![Fr::from(y)], vec![Fr::from(x)]).unwrap()
}

/// Local key generation for tests; the service itself never runs a setup.
pub(crate) fn setup(circuit: &R1cs) -> Fixture {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let proving_key =
        Groth16::<Bn254>::generate_random_parameters_with_reduction(Synthesizer::setup(circuit), &mut rng)
            .unwrap();

    let mut circuit_bytes = Vec::new();
    circuit.serialize_compressed(&mut circuit_bytes).unwrap();
    let mut proving_key_bytes = Vec::new();
    proving_key.serialize_compressed(&mut proving_key_bytes).unwrap();

    Fixture {
        circuit_bytes,
        proving_key_bytes,
        verifying_key: proving_key.vk.clone(),
        proving_key,
    }
}

fn fq(chunk: &[u8]) -> Fq {
    let bytes: [u8; 32] = chunk.try_into().unwrap();
    Fq::from_bigint(bytes_to_limbs(&bytes)).unwrap()
}

fn fr(chunk: &[u8]) -> Fr {
    let bytes: [u8; 32] = chunk.try_into().unwrap();
    Fr::from_bigint(bytes_to_limbs(&bytes)).unwrap()
}

/// Splits calldata back into the proof and its public inputs.
fn decode_calldata(calldata: &[u8]) -> (ArkProof<Bn254>, Vec<Fr>) {
    let c = |i: usize| &calldata[i * CHUNK_SIZE..(i + 1) * CHUNK_SIZE];

    let a = G1Affine::new(fq(c(0)), fq(c(1)));
    let b = G2Affine::new(
        Fq2::new(fq(c(3)), fq(c(2))),
        Fq2::new(fq(c(5)), fq(c(4))),
    );
    let cc = G1Affine::new(fq(c(6)), fq(c(7)));

    let inputs = calldata[PROOF_CORE_SIZE..].chunks(CHUNK_SIZE).map(fr).collect();
    (ArkProof { a, b, c: cc }, inputs)
}

fn registered(project: &ProjectId) -> (Groth16ProverService, Fixture) {
    let fixture = setup(&equality_circuit());
    let service = Groth16ProverService::default();
    service
        .new_project(project, &fixture.circuit_bytes, &fixture.proving_key_bytes)
        .unwrap();
    (service, fixture)
}

#[test]
fn test_equality_scenario() {
    let p1 = ProjectId::new("P1", "v1");
    let (service, _) = registered(&p1);

    let proof = service
        .execute(&p1, &equality_witness(42, 42).to_bytes())
        .unwrap();
    assert!(!proof.is_empty());

    let err = service
        .execute(&p1, &equality_witness(42, 41).to_bytes())
        .unwrap_err();
    assert!(matches!(
        err,
        ProverError::ProvingFailed {
            source: ProveError::Unsatisfied { constraint: 0 },
            ..
        }
    ));

    let p2 = ProjectId::new("P2", "v1");
    let err = service
        .execute(&p2, &equality_witness(42, 42).to_bytes())
        .unwrap_err();
    assert!(matches!(err, ProverError::ProjectNotFound { project } if project == p2));
}

#[test]
fn test_calldata_verifies() {
    let project = ProjectId::new("2", "v1");
    let (service, fixture) = registered(&project);

    let calldata = service
        .execute(&project, &equality_witness(0x12345678, 0x12345678).to_bytes())
        .unwrap();

    // Core, no commitments, one public input.
    assert_eq!(calldata.len(), PROOF_CORE_SIZE + CHUNK_SIZE);

    let (proof, inputs) = decode_calldata(&calldata);
    assert_eq!(inputs, vec![Fr::from(0x12345678u64)]);

    let pvk = prepare_verifying_key(&fixture.verifying_key);
    assert!(Groth16::<Bn254>::verify_proof(&pvk, &proof, &inputs).unwrap());
    // The same proof does not verify for another statement.
    assert!(!Groth16::<Bn254>::verify_proof(&pvk, &proof, &[Fr::from(1u64)]).unwrap());
}

#[test]
fn test_duplicate_registration_keeps_execute_working() {
    let project = ProjectId::new("1", "v1");
    let (service, fixture) = registered(&project);

    service
        .new_project(&project, &fixture.circuit_bytes, &fixture.proving_key_bytes)
        .unwrap();
    assert_eq!(
        service
            .register(&project, &fixture.circuit_bytes, &fixture.proving_key_bytes)
            .unwrap(),
        Registration::AlreadyRegistered
    );

    assert_eq!(service.registry().len(), 1);
    assert!(service
        .execute(&project, &equality_witness(5, 5).to_bytes())
        .is_ok());
}

#[test]
fn test_versions_are_separate_projects() {
    let v1 = ProjectId::new("1", "v1");
    let (service, _) = registered(&v1);

    let v2 = ProjectId::new("1", "v2");
    let err = service
        .execute(&v2, &equality_witness(5, 5).to_bytes())
        .unwrap_err();
    assert!(matches!(err, ProverError::ProjectNotFound { .. }));
}

#[test]
fn test_unregistered_execute_has_no_side_effects() {
    let service = Groth16ProverService::default();
    let project = ProjectId::new("999", "v1");

    let err = service.execute(&project, &[]).unwrap_err();

    assert!(matches!(err, ProverError::ProjectNotFound { .. }));
    assert!(service.registry().is_empty());
}

#[test]
fn test_malformed_artifacts_carry_project() {
    let service = Groth16ProverService::default();
    let project = ProjectId::new("broken", "v1");

    let err = service.new_project(&project, b"not a circuit", b"").unwrap_err();
    assert!(err.to_string().contains(r#""broken"@"v1""#));

    match err {
        ProverError::Deserialization { project: p, source } => {
            assert_eq!(p, project);
            assert!(matches!(source, ArtifactError::Circuit(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(service.registry().is_empty());
}

#[test]
fn test_key_for_other_shape_is_rejected_at_registration() {
    let fixture = setup(&equality_circuit());
    let service = Groth16ProverService::default();

    for (name, truncate) in [("short", 2usize), ("empty", 0)] {
        let project = ProjectId::new(name, "v1");
        let mut key = fixture.proving_key.clone();
        key.a_query.truncate(truncate);
        let mut key_bytes = Vec::new();
        key.serialize_compressed(&mut key_bytes).unwrap();

        let err = service
            .new_project(&project, &fixture.circuit_bytes, &key_bytes)
            .unwrap_err();
        assert!(matches!(
            err,
            ProverError::Deserialization {
                source: ArtifactError::KeyMismatch {
                    query: "a_query",
                    ..
                },
                ..
            }
        ));

        // Nothing was published, so proving fails cleanly instead of
        // reaching the prover.
        let err = service
            .execute(&project, &equality_witness(42, 42).to_bytes())
            .unwrap_err();
        assert!(matches!(err, ProverError::ProjectNotFound { .. }));
    }
    assert!(service.registry().is_empty());
}

#[test]
fn test_invalid_witness_payload() {
    let project = ProjectId::new("3", "v1");
    let (service, _) = registered(&project);

    let err = service.execute(&project, &[0u8; 7]).unwrap_err();
    assert!(matches!(
        err,
        ProverError::InvalidWitness {
            source: WitnessError::Truncated { .. },
            ..
        }
    ));

    // Well-formed but the wrong shape for the circuit.
    let witness = Witness::new(vec![Fr::from(1u64), Fr::from(1u64)], vec![]).unwrap();
    let err = service.execute(&project, &witness.to_bytes()).unwrap_err();
    assert!(matches!(
        err,
        ProverError::ProvingFailed {
            source: ProveError::WitnessMismatch { .. },
            ..
        }
    ));
}

#[test]
fn test_unknown_hint_fails_proving() {
    let fixture = setup(&equality_circuit());
    let config = ProverConfig::from_json(r#"{"hints": ["uints.and"]}"#).unwrap();
    let service = Groth16ProverService::new(config).unwrap();
    let project = ProjectId::new("4", "v1");

    service
        .new_project(&project, &fixture.circuit_bytes, &fixture.proving_key_bytes)
        .unwrap();
    let err = service
        .execute(&project, &equality_witness(1, 1).to_bytes())
        .unwrap_err();

    assert!(matches!(
        err,
        ProverError::ProvingFailed {
            source: ProveError::UnsatisfiedHint { .. },
            ..
        }
    ));
}

#[test]
fn test_unknown_hint_in_config() {
    let config = ProverConfig {
        hints: Some(vec!["nope".to_string()]),
        ..ProverConfig::default()
    };
    assert!(matches!(
        Groth16ProverService::new(config),
        Err(ConfigError::UnknownHint(_))
    ));
}

#[test]
fn test_execute_task_requires_one_payload() {
    let project = ProjectId::new("5", "v1");
    let (service, _) = registered(&project);
    let payload = equality_witness(9, 9).to_bytes();

    let err = service.execute_task(&project, &[]).unwrap_err();
    assert!(matches!(
        err,
        ProverError::PayloadCount {
            expected: 1,
            found: 0
        }
    ));

    let err = service
        .execute_task(&project, &[payload.clone(), payload.clone()])
        .unwrap_err();
    assert!(matches!(err, ProverError::PayloadCount { found: 2, .. }));

    assert!(service.execute_task(&project, &[payload]).is_ok());
}

#[test]
fn test_concurrent_execution() {
    let fixture = setup(&equality_circuit());
    let service = Groth16ProverService::default();
    let projects: Vec<ProjectId> = (0..3).map(|i| ProjectId::new(format!("{i}"), "v1")).collect();

    thread::scope(|scope| {
        for project in &projects {
            let service = &service;
            let fixture = &fixture;
            scope.spawn(move || {
                service
                    .new_project(project, &fixture.circuit_bytes, &fixture.proving_key_bytes)
                    .unwrap();
            });
        }
    });

    let pvk = prepare_verifying_key(&fixture.verifying_key);
    thread::scope(|scope| {
        for (i, project) in projects.iter().cycle().take(6).enumerate() {
            let service = &service;
            let pvk = &pvk;
            scope.spawn(move || {
                let value = u64::try_from(i).unwrap() + 100;
                let calldata = service
                    .execute(project, &equality_witness(value, value).to_bytes())
                    .unwrap();
                let (proof, inputs) = decode_calldata(&calldata);
                assert!(Groth16::<Bn254>::verify_proof(pvk, &proof, &inputs).unwrap());
            });
        }
    });
}
