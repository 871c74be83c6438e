// Criterion benchmarks for Board Alerts

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use board_alerts::core::{
    dedup::dedupe,
    distance::{haversine_distance, calculate_bounding_box},
    window::select_today,
    Matcher,
};
use board_alerts::models::{Category, Coordinates, Notice, PreferenceRule};
use chrono::NaiveDate;

fn create_notice(id: usize, lat: f64, lon: f64) -> Notice {
    Notice {
        id: id.to_string(),
        category: Category::ALL[id % Category::ALL.len()],
        publication_date: Some(if id % 4 == 0 { "2024-01-01" } else { "2024-01-02" }.to_string()),
        coordinates: if id % 7 == 0 { None } else { Some(Coordinates::new(lat, lon)) },
        title: format!("Oznámení {}", id),
        url: format!("https://www.khk.cz/uredni-deska/{}", id),
        place: None,
        relevance_score: None,
        board_index: None,
    }
}

fn create_batch(count: usize) -> Vec<Notice> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.003) % 0.6;
            let lon_offset = (i as f64 * 0.007) % 0.9;
            create_notice(i, 50.0 + lat_offset, 15.4 + lon_offset)
        })
        .collect()
}

fn create_rules() -> Vec<PreferenceRule> {
    vec![
        PreferenceRule::new(
            [Category::Transport, Category::Health],
            Coordinates::new(50.2092, 15.8328),
            15.0,
        ),
        PreferenceRule::new([Category::Culture], Coordinates::new(50.561, 15.9127), 25.0),
        PreferenceRule::new(Category::ALL, Coordinates::new(50.41, 16.16), 10.0),
    ]
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(50.2),
                black_box(15.8),
                black_box(50.0),
                black_box(20.0),
            )
        });
    });
}

fn bench_bounding_box(c: &mut Criterion) {
    c.bench_function("bounding_box_calculation", |b| {
        b.iter(|| {
            calculate_bounding_box(
                black_box(50.2),
                black_box(15.8),
                black_box(50.0),
            )
        });
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::new();
    let rules = create_rules();

    let mut group = c.benchmark_group("matching");

    for notice_count in [10, 50, 100, 500, 1000].iter() {
        let notices = create_batch(*notice_count);

        group.bench_with_input(
            BenchmarkId::new("match_rules", notice_count),
            notice_count,
            |b, _| {
                b.iter(|| {
                    let result = matcher.match_rules(black_box(&rules), black_box(&notices));
                    dedupe(result.matches)
                });
            },
        );
    }

    group.finish();
}

fn bench_daily_pipeline(c: &mut Criterion) {
    let matcher = Matcher::new();
    let rules = create_rules();
    let batch = create_batch(500);
    let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

    c.bench_function("daily_pipeline_500_notices", |b| {
        b.iter(|| {
            let todays = select_today(black_box(&batch), today);
            let result = matcher.match_rules(&rules, &todays);
            black_box(dedupe(result.matches).len())
        });
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_bounding_box,
    bench_matching,
    bench_daily_pipeline
);

criterion_main!(benches);
