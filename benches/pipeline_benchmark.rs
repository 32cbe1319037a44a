// ========================================================================================
//
//                      NEURORISK FULL-PASS PERFORMANCE BENCHMARK
//
// ========================================================================================
//
// Measures one recomputation pass (filter, score, classify, flag, summarize) over
// synthetic cohorts of increasing size, for both scoring models.
//
// ========================================================================================

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use neurorisk::cohort::config::DashboardConfig;
use neurorisk::cohort::filter::Selection;
use neurorisk::cohort::pipeline::run_pass;
use neurorisk::cohort::record::{Cohort, PatientRecord, Span};
use neurorisk::types::ScoringModel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

// --- Benchmark Tuning Parameters ---

const COHORT_SIZES: [usize; 3] = [1_000, 10_000, 100_000];
const SEED: u64 = 42;

fn synthetic_cohort(size: usize) -> Cohort {
    let mut rng = StdRng::seed_from_u64(SEED);
    let age = Normal::new(74.0, 8.0).unwrap();
    let cognitive = Normal::new(22.0, 6.0).unwrap();
    let bmi = Normal::new(27.0, 5.0).unwrap();
    let cholesterol = Normal::new(220.0, 40.0).unwrap();

    let records = (0..size)
        .map(|i| {
            let mut r = PatientRecord::new(i.to_string());
            r.age = Some(age.sample(&mut rng).clamp(50.0, 100.0));
            r.cognitive_score = Some(cognitive.sample(&mut rng).clamp(0.0, 30.0));
            r.bmi = Some(bmi.sample(&mut rng).clamp(15.0, 45.0));
            r.cholesterol_total = Some(cholesterol.sample(&mut rng));
            r.functional_assessment = Some(rng.gen_range(0.0..10.0));
            r.adl = Some(rng.gen_range(0.0..10.0));
            r.physical_activity = Some(rng.gen_range(0.0..10.0));
            r.alcohol_consumption = Some(rng.gen_range(0.0..20.0));
            r.diet_quality = Some(rng.gen_range(0.0..10.0));
            r.gender = Some(if rng.gen_bool(0.5) { "Male" } else { "Female" }.to_string());
            r.smoking = Some(rng.gen_bool(0.3));
            r.depression = Some(rng.gen_bool(0.2));
            r.memory_complaints = Some(rng.gen_bool(0.25));
            r.cardiovascular_disease = Some(rng.gen_bool(0.15));
            r
        })
        .collect();
    Cohort::from_records(records)
}

fn benchmark_full_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_pass");
    for size in COHORT_SIZES {
        let cohort = synthetic_cohort(size);
        group.throughput(Throughput::Elements(size as u64));

        for model in [ScoringModel::Legacy, ScoringModel::Extended] {
            let config = DashboardConfig {
                scoring_model: model,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("unfiltered/{model}"), size),
                &config,
                |b, config| b.iter(|| black_box(run_pass(black_box(&cohort), config).unwrap())),
            );
        }

        let mut filtered = DashboardConfig::default();
        filtered.filters.gender = Selection::only("Female");
        filtered.filters.age = Some(Span::new(70.0, 85.0));
        group.bench_with_input(
            BenchmarkId::new("filtered/legacy", size),
            &filtered,
            |b, config| b.iter(|| black_box(run_pass(black_box(&cohort), config).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_full_pass);
criterion_main!(benches);
