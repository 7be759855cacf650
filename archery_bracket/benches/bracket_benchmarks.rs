use archery_bracket::bracket::{
    Bracket, BracketConfig, BracketType, Candidate, EndScore, MatchEnd, MatchScore, Participant,
    QualificationTotals, ScoringFormat, Side, plan_bracket, rank_candidates, seed_order,
};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use uuid::Uuid;

/// Helper to create `n` candidates in reverse rank order
fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            Candidate::new(
                Participant::Archer(Uuid::new_v4()),
                QualificationTotals::new(500 + i as i32, (i % 7) as i32, (i % 11) as i32),
            )
        })
        .collect()
}

fn draft(size: u32) -> Bracket {
    Bracket::draft(
        BracketConfig::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            BracketType::Individual,
            ScoringFormat::RecurveSet,
            size,
        ),
        Utc::now(),
    )
}

/// Benchmark seed order construction for every allowed size
fn bench_seed_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("seed_order");

    for size in [4u32, 16, 128].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| seed_order(black_box(size)));
        });
    }

    group.finish();
}

/// Benchmark ranking plus full tree planning
fn bench_plan_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_bracket");

    for size in [8u32, 32, 128].iter() {
        let bracket = draft(*size);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_slots", size)),
            size,
            |b, &size| {
                b.iter_batched(
                    || candidates(size as usize + 10),
                    |list| {
                        let ranked = rank_candidates(list);
                        plan_bracket(&bracket, &ranked, Utc::now())
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark score computation for a full set match with a shoot-off
fn bench_match_score(c: &mut Criterion) {
    let match_id = Uuid::new_v4();
    let mut ends = Vec::new();
    for end_no in (1..=5).chain([99]) {
        for (side, total) in [(Side::A, 27 + end_no % 3), (Side::B, 28)] {
            ends.push(MatchEnd {
                match_id,
                end_no,
                side,
                score: EndScore::from_totals(total, 1, 2),
            });
        }
    }

    c.bench_function("match_score", |b| {
        b.iter(|| MatchScore::compute(black_box(&ends)).leader(ScoringFormat::RecurveSet));
    });
}

criterion_group!(generation, bench_seed_order, bench_plan_bracket);

criterion_group!(scoring, bench_match_score);

criterion_main!(generation, scoring);
