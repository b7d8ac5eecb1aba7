//! End-to-end scenarios for the rotation engine.

use rand::rngs::StdRng;
use rand::SeedableRng;
use stakesim_core::{
    select_greedy_shrinking, simulate, weighted_sample, AdversarialConfig, Population,
    RotationEngine, RotationPolicy, SimConfig, SimError, Statistic, SubsetPolicy, Thresholds,
};

fn base_config(samples: usize, rounds: usize, rotation: f64) -> SimConfig {
    SimConfig {
        samples,
        rounds,
        rotation_percent: rotation,
        rotation_policy: RotationPolicy::FixedQuota,
        thresholds: Thresholds::mainnet(),
        adversarial: None,
        seed: 42,
    }
}

#[test]
fn ten_equal_members_one_round_no_rotation() {
    let population = Population::new(vec![1.0; 10]).unwrap();
    let mut engine = RotationEngine::new(&population, None, base_config(5, 1, 0.0)).unwrap();
    let report = engine.step().unwrap();

    assert_eq!(engine.serving().len(), 5);
    assert_eq!(report.stats.total_weight, 5.0);
    // 10% of the population each: above 0.3%, never below 0.002%.
    assert_eq!(report.stats.high_weight_count, 5);
    assert_eq!(report.stats.low_weight_count, 0);
}

#[test]
fn dominant_member_is_admitted_most_often() {
    let population = Population::new(vec![100.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
    let hits = (0..1000u64)
        .filter(|&seed| {
            let config = SimConfig {
                seed,
                ..base_config(1, 1, 0.0)
            };
            let mut engine = RotationEngine::new(&population, None, config).unwrap();
            engine.step().unwrap();
            engine.serving().contains(0)
        })
        .count();
    assert!(hits > 800, "dominant member admitted in {hits}/1000 trials");
}

#[test]
fn dominant_member_via_sampler_directly() {
    let mut rng = StdRng::seed_from_u64(99);
    let pool = [0, 1, 2, 3, 4];
    let weights = [100.0, 1.0, 1.0, 1.0, 1.0];
    let hits = (0..1000)
        .filter(|_| weighted_sample(&pool, &weights, 1, &mut rng).unwrap() == vec![0])
        .count();
    assert!(hits > 800);
}

#[test]
fn greedy_selector_exact_pair() {
    let population = Population::new(vec![5.0, 5.0, 5.0, 5.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let sel = select_greedy_shrinking(&population, &[0, 1, 2, 3], 10.0, &mut rng);
    assert_eq!(sel.indices.len(), 2);
    assert_eq!(sel.achieved, 10.0);
}

#[test]
fn simulate_twice_same_seed_identical_records() {
    let weights: Vec<f64> = (1..=500).map(|i| (i as f64).powf(1.5)).collect();
    let population = Population::new(weights).unwrap();
    let config = SimConfig {
        samples: 50,
        rounds: 200,
        rotation_percent: 10.0,
        rotation_policy: RotationPolicy::WeightBudget,
        thresholds: Thresholds::coarse(),
        adversarial: Some(AdversarialConfig {
            percent: 5.0,
            policy: SubsetPolicy::bounded_retry(),
        }),
        seed: 7,
    };
    let a = simulate(&population, &config).unwrap();
    let b = simulate(&population, &config).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.result.rounds, 200);
    for stat in Statistic::ALL {
        let extrema = a.result.get(stat).unwrap_or_else(|| panic!("{} missing", stat.name()));
        assert!(extrema.min <= extrema.max);
    }
}

#[test]
fn weight_budget_rotation_has_variable_admissions() {
    let weights: Vec<f64> = (1..=400).map(|i| ((i * 37) % 101 + 1) as f64).collect();
    let population = Population::new(weights).unwrap();
    let config = SimConfig {
        rotation_policy: RotationPolicy::WeightBudget,
        ..base_config(40, 100, 20.0)
    };
    let result = RotationEngine::new(&population, None, config)
        .unwrap()
        .run()
        .unwrap();
    let evictions = result.get(Statistic::EvictionCount).unwrap();
    assert!(evictions.min >= 1.0);
    assert!(evictions.max <= 40.0);
    let largest = result.get(Statistic::LargestEvictionCandidate).unwrap();
    assert!(largest.max <= 1.0);
}

#[test]
fn overlong_rotation_reports_insufficient_pool() {
    let population = Population::new(vec![1.0; 20]).unwrap();
    let err = simulate(&population, &base_config(15, 5, 50.0)).unwrap_err();
    assert!(matches!(err, SimError::InsufficientPool { round: 1, .. }), "{err}");
}

#[test]
fn invalid_parameters_are_rejected_before_running() {
    let population = Population::new(vec![1.0; 20]).unwrap();
    assert!(matches!(
        simulate(&population, &base_config(0, 5, 10.0)),
        Err(SimError::InvalidArgument(_))
    ));
    assert!(matches!(
        simulate(&population, &base_config(5, 5, 120.0)),
        Err(SimError::InvalidArgument(_))
    ));
    assert!(matches!(
        simulate(&population, &base_config(21, 5, 10.0)),
        Err(SimError::InvalidArgument(_))
    ));
}
