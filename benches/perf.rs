use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use nrl_form::form::{FormConfig, augment_with_form};
use nrl_form::ols::{NalgebraOls, OlsFitter};
use nrl_form::optimizer::Optimizer;
use nrl_form::table::{FeatureTable, GameRow};

const TEAMS: [&str; 16] = [
    "Storm", "Panthers", "Roosters", "Sharks", "Broncos", "Eels", "Rabbitohs", "Raiders",
    "Cowboys", "Knights", "Dragons", "Titans", "Warriors", "Bulldogs", "Sea Eagles", "Tigers",
];

fn season_table(games: usize) -> FeatureTable {
    let rows = (0..games)
        .map(|i| {
            let home = TEAMS[i % TEAMS.len()];
            let away = TEAMS[(i + 1 + (i / 16) % 15) % TEAMS.len()];
            let mut row = GameRow::new(i as u64 + 1, home, away);
            row.points = ((i * 17) % 41) as f64 - 20.0;
            row.predicted = ((i * 5) % 13) as f64 - 6.0;
            row.residual = row.points - row.predicted;
            row
        })
        .collect();
    FeatureTable::new(Vec::new(), rows)
}

fn bench_form_augmentation(c: &mut Criterion) {
    let table = season_table(1200);
    let cfg = FormConfig::default();
    c.bench_function("augment_with_form_1200", |b| {
        b.iter(|| {
            let out = augment_with_form(black_box(table.clone()), &cfg);
            black_box(out.len());
        })
    });
}

fn bench_find_maximum(c: &mut Criterion) {
    let optimizer = Optimizer::default();
    c.bench_function("find_maximum_quadratic", |b| {
        b.iter(|| {
            let max = optimizer
                .find_maximum(|x: f64| -(x - 0.37).powi(2), black_box((0.0, 1.0)), 0.05)
                .unwrap();
            black_box(max.argument);
        })
    });
}

fn bench_ols_fit(c: &mut Criterion) {
    let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    let rows: Vec<Vec<f64>> = (0..800)
        .map(|i| {
            let i = i as f64;
            vec![(i * 0.3).sin(), (i * 0.7).cos(), (i % 9.0) - 4.0, (i % 5.0) * 0.5]
        })
        .collect();
    let outcome: Vec<f64> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| 2.0 * r[0] - r[1] + 0.5 * r[2] + 3.0 * r[3] + ((i % 7) as f64 - 3.0) * 0.1)
        .collect();
    c.bench_function("ols_fit_800x4", |b| {
        b.iter(|| {
            let fit = NalgebraOls
                .fit(&names, black_box(&rows), black_box(&outcome))
                .unwrap();
            black_box(fit.r_squared);
        })
    });
}

criterion_group!(benches, bench_form_augmentation, bench_find_maximum, bench_ols_fit);
criterion_main!(benches);
