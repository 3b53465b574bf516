use std::collections::BTreeMap;

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use particle_collate::{
    collate, log_sum_exp, CollateError, CombinedLogWeights, ParticleCounts, ParticleReader,
    Posterior, WeightKey,
};

fn collate_str(input: &str) -> Result<Vec<Posterior>, CollateError> {
    let mut counts = ParticleCounts::new();
    counts.read_csv("input", input.as_bytes())?;
    collate(&counts)
}

fn probability(posteriors: &[Posterior], identifier: &str, value: &str) -> f64 {
    posteriors
        .iter()
        .find(|p| p.identifier == identifier && p.value == value)
        .map(|p| p.probability)
        .unwrap_or_else(|| panic!("no row for {identifier},{value}"))
}

#[test]
fn two_to_one_duplicates() {
    let posteriors = collate_str("A,x,0.0\nA,x,0.0\nA,y,0.0\n").unwrap();
    assert_eq!(posteriors.len(), 2);
    assert!((probability(&posteriors, "A", "x") - 2.0 / 3.0).abs() < 1e-6);
    assert!((probability(&posteriors, "A", "y") - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn tiny_weights_do_not_underflow() {
    let posteriors = collate_str("A,x,-1000.0\nA,x,-1000.0\nA,y,-1001.0\n").unwrap();
    let expected_x = 2.0 / (2.0 + (-1f64).exp());
    assert!((probability(&posteriors, "A", "x") - expected_x).abs() < 1e-9);
    assert!((probability(&posteriors, "A", "y") - (1.0 - expected_x)).abs() < 1e-9);
}

#[test]
fn identifiers_are_normalized_independently() {
    let posteriors = collate_str("A,x,-1\nA,y,-2\nB,x,-50\nB,y,-50\nB,z,-50\n").unwrap();

    let a_total = (-1f64).exp() + (-2f64).exp();
    assert!((probability(&posteriors, "A", "x") - (-1f64).exp() / a_total).abs() < 1e-9);
    for value in ["x", "y", "z"] {
        assert!((probability(&posteriors, "B", value) - 1.0 / 3.0).abs() < 1e-9);
    }

    let joint_total: f64 = posteriors.iter().map(|p| p.joint_log_prob.exp()).sum();
    assert!((joint_total - 1.0).abs() < 1e-9);
}

#[test]
fn random_particles_sum_to_one_per_identifier() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut input = String::new();
    for _ in 0..500 {
        let identifier = rng.random_range(0..7);
        let value = rng.random_range(0..5);
        // coarse weights so exact duplicates occur
        let log_weight = -(rng.random_range(0..40i32) as f64) * 25.0;
        input.push_str(&format!("id{identifier},v{value},{log_weight}\n"));
    }

    let posteriors = collate_str(&input).unwrap();
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for p in &posteriors {
        assert!(p.probability >= 0.0 && p.probability <= 1.0);
        *totals.entry(p.identifier.clone()).or_default() += p.probability;
    }
    for (identifier, total) in totals {
        assert!((total - 1.0).abs() < 1e-9, "{identifier} sums to {total}");
    }
}

#[test]
fn input_order_does_not_change_output() {
    let mut lines: Vec<String> = Vec::new();
    for (i, w) in [-3.5, -0.25, -12.0, -0.25, -7.0, -3.5, -0.001].iter().enumerate() {
        lines.push(format!("g{},v{},{}", i % 2, i % 3, w));
    }
    let baseline = collate_str(&(lines.join("\n") + "\n")).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
        lines.shuffle(&mut rng);
        let shuffled = collate_str(&(lines.join("\n") + "\n")).unwrap();
        assert_eq!(shuffled, baseline);
    }
}

#[test]
fn log_sum_exp_is_permutation_invariant() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut values: Vec<f64> = (0..64).map(|_| rng.random_range(-800.0..-700.0)).collect();
    let expected = log_sum_exp(&Array1::from(values.clone())).unwrap();
    for _ in 0..10 {
        values.shuffle(&mut rng);
        let got = log_sum_exp(&Array1::from(values.clone())).unwrap();
        assert!((got - expected).abs() < 1e-9);
    }
}

#[test]
fn triplicate_record_equals_log_three_shift() {
    let mut repeated = ParticleCounts::new();
    repeated
        .read_csv("repeated", "A,v1,-2.0\nA,v1,-2.0\nA,v1,-2.0\n".as_bytes())
        .unwrap();
    let mut shifted = ParticleCounts::new();
    shifted.observe("A", "v1", -2.0 + 3f64.ln());

    let key = WeightKey::new("A", "v1");
    let a = CombinedLogWeights::from_counts(&repeated).unwrap().get(&key).unwrap();
    let b = CombinedLogWeights::from_counts(&shifted).unwrap().get(&key).unwrap();
    assert!((a - b).abs() < 1e-12);
}

#[test]
fn short_record_aborts_the_run() {
    let err = collate_str("A,x,0.0\nA,x\n").unwrap_err();
    assert!(err.is_parse());
    assert!(err.to_string().starts_with("input:2:"));
}

#[test]
fn blank_line_aborts_the_run() {
    let err = collate_str("A,x,0.0\n\nA,y,0.0\n").unwrap_err();
    assert!(err.is_parse());
    assert_eq!(err.to_string(), "input:2: empty record");
}

#[test]
fn empty_input_is_domain_error() {
    let err = collate_str("").unwrap_err();
    assert!(err.is_domain());
}
