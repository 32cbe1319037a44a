use neurorisk::cohort::config::DashboardConfig;
use neurorisk::cohort::filter::{FilterConfig, FilterError, Selection};
use neurorisk::cohort::pipeline::{PassOutcome, run_pass};
use neurorisk::cohort::record::{Cohort, PatientRecord, Span};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// --- Tuning ---

const COHORT_SIZE: usize = 400;
const TRIALS: usize = 50;

fn maybe<T>(rng: &mut StdRng, value: T) -> Option<T> {
    if rng.gen_bool(0.9) { Some(value) } else { None }
}

fn synthetic_cohort(rng: &mut StdRng) -> Cohort {
    let records = (0..COHORT_SIZE)
        .map(|i| {
            let mut r = PatientRecord::new(format!("P{i:04}"));
            r.age = Some(rng.gen_range(55.0..95.0));
            r.cognitive_score = Some(rng.gen_range(0.0..30.0));
            r.bmi = Some(rng.gen_range(16.0..42.0));
            r.gender = Some(if rng.gen_bool(0.5) { "Male" } else { "Female" }.to_string());
            let functional = rng.gen_range(0.0..10.0);
            r.functional_assessment = maybe(rng, functional);
            let diet = rng.gen_range(0.0..10.0);
            r.diet_quality = maybe(rng, diet);
            let smoking = rng.gen_bool(0.3);
            r.smoking = maybe(rng, smoking);
            let depression = rng.gen_bool(0.2);
            r.depression = maybe(rng, depression);
            r
        })
        .collect();
    Cohort::from_records(records)
}

fn random_span(rng: &mut StdRng, low: f64, high: f64) -> Option<Span> {
    if rng.gen_bool(0.5) {
        return None;
    }
    let a = rng.gen_range(low..high);
    let b = rng.gen_range(low..high);
    Some(Span::new(a.min(b), a.max(b)))
}

fn random_selection(rng: &mut StdRng, values: &[&str]) -> Selection {
    if rng.gen_bool(0.5) {
        Selection::All
    } else {
        Selection::only(values[rng.gen_range(0..values.len())])
    }
}

fn random_config(rng: &mut StdRng) -> FilterConfig {
    FilterConfig {
        gender: random_selection(rng, &["Male", "Female"]),
        smoking: random_selection(rng, &["yes", "no"]),
        depression: random_selection(rng, &["Yes", "No"]),
        age: random_span(rng, 50.0, 100.0),
        cognitive_score: random_span(rng, 0.0, 30.0),
        functional_assessment: random_span(rng, 0.0, 10.0),
        diet_quality: random_span(rng, 0.0, 10.0),
        ..Default::default()
    }
}

/// Row indices kept by a chain of refinements; empty when any step matched nobody.
fn rows(cohort: &Cohort, chain: &[&FilterConfig]) -> Vec<usize> {
    let mut view = match cohort.filter(chain[0]) {
        Ok(view) => view,
        Err(FilterError::EmptyResult { .. }) => return Vec::new(),
        Err(other) => panic!("unexpected filter error: {other}"),
    };
    for config in &chain[1..] {
        view = match view.refine(config) {
            Ok(view) => view,
            Err(FilterError::EmptyResult { .. }) => return Vec::new(),
            Err(other) => panic!("unexpected filter error: {other}"),
        };
    }
    view.rows().to_vec()
}

#[test]
fn filtering_twice_with_the_same_configuration_changes_nothing() {
    let mut rng = StdRng::seed_from_u64(7);
    let cohort = synthetic_cohort(&mut rng);
    for _ in 0..TRIALS {
        let config = random_config(&mut rng);
        assert_eq!(rows(&cohort, &[&config]), rows(&cohort, &[&config, &config]));
    }
}

#[test]
fn filter_order_does_not_matter() {
    let mut rng = StdRng::seed_from_u64(11);
    let cohort = synthetic_cohort(&mut rng);
    for _ in 0..TRIALS {
        let a = random_config(&mut rng);
        let b = random_config(&mut rng);
        assert_eq!(rows(&cohort, &[&a, &b]), rows(&cohort, &[&b, &a]));
    }
}

#[test]
fn spanning_configuration_keeps_every_patient() {
    let mut rng = StdRng::seed_from_u64(13);
    let cohort = synthetic_cohort(&mut rng);
    let view = cohort.filter(&FilterConfig::spanning(&cohort)).unwrap();
    assert_eq!(view.len(), cohort.len());
}

#[test]
fn tier_counts_always_sum_to_the_filtered_total() {
    let mut rng = StdRng::seed_from_u64(17);
    let cohort = synthetic_cohort(&mut rng);
    for _ in 0..TRIALS {
        let config = DashboardConfig {
            filters: random_config(&mut rng),
            ..Default::default()
        };
        let summary = match run_pass(&cohort, &config).unwrap() {
            PassOutcome::Assessed(assessment) => {
                assert_eq!(assessment.patients.len() + assessment.excluded.len(), {
                    cohort.filter(&config.filters).unwrap().len()
                });
                assessment.summary
            }
            PassOutcome::NoMatches { empty, .. } => empty,
        };
        assert_eq!(summary.tiers.iter().map(|t| t.count).sum::<usize>(), summary.total);
    }
}
