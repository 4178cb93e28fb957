use std::hint::black_box;

use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use observing_suite::models::{Coordinate, Frame, SiteRegistry, Target};
use observing_suite::resolver::parse_coordinate_str;
use observing_suite::services::{
    compute_offset, compute_visibility, twilight_times, NightContext, NightWindow,
    ObservingPlan, VisibilityOptions,
};

fn night() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 2, 25).unwrap()
}

fn bench_twilight(c: &mut Criterion) {
    let mut group = c.benchmark_group("twilight");
    let site = SiteRegistry::builtin().lookup("Palomar").unwrap();

    group.bench_function("twilight_times", |b| {
        b.iter(|| black_box(twilight_times(black_box(&site), night())));
    });

    group.finish();
}

fn bench_visibility(c: &mut Criterion) {
    let mut group = c.benchmark_group("visibility");
    let site = SiteRegistry::builtin().lookup("Palomar").unwrap();
    let m82 = Coordinate::from_degrees(148.9685, 69.6797).unwrap();

    for minutes in [1i64, 10, 30] {
        let options = VisibilityOptions::new(
            NightWindow::SunsetSunrise {
                hours_before: 1.0,
                hours_after: 1.0,
            },
            Duration::minutes(minutes),
        );
        group.bench_with_input(
            BenchmarkId::new("one_night", format!("{}min", minutes)),
            &options,
            |b, options| {
                b.iter(|| black_box(compute_visibility(&m82, &site, night(), options)));
            },
        );
    }

    // Shared night context, many targets
    let options = VisibilityOptions::default();
    let ctx = NightContext::new(&site, night(), &options);
    let targets: Vec<Coordinate> = (0..50)
        .map(|i| Coordinate::from_degrees(i as f64 * 7.2, 20.0 + (i % 5) as f64 * 10.0).unwrap())
        .collect();
    group.bench_function("shared_context_50_targets", |b| {
        b.iter(|| {
            for target in &targets {
                black_box(ctx.series(black_box(target)));
            }
        });
    });

    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let site = SiteRegistry::builtin().lookup("Keck").unwrap();
    let targets: Vec<Target> = (0..10)
        .map(|i| {
            Target::with_coordinate(
                format!("T{}", i),
                Coordinate::from_degrees(i as f64 * 36.0, 10.0).unwrap(),
            )
        })
        .collect();
    let dates: Vec<NaiveDate> = night().iter_days().take(3).collect();
    let plan = ObservingPlan::new(&targets, site, dates).unwrap();

    group.bench_function("nightly_summaries_10x3", |b| {
        b.iter(|| black_box(plan.nightly_summaries()));
    });

    group.finish();
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    group.bench_function("parse_sexagesimal", |b| {
        b.iter(|| parse_coordinate_str(black_box("09:55:52.7 +69:40:47"), None, Frame::Icrs));
    });

    let star = Coordinate::from_degrees(148.928, 69.6897).unwrap();
    let target = Coordinate::from_degrees(148.9685, 69.6797).unwrap();
    group.bench_function("compute_offset", |b| {
        b.iter(|| black_box(compute_offset(black_box(&star), black_box(&target))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_twilight,
    bench_visibility,
    bench_plan,
    bench_geometry
);
criterion_main!(benches);
