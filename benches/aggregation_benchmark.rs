//! 지역 판별 / 집계 처리량 벤치마크
//!
//! 한 번 수집에서 수천 건이 들어오므로 `extract_region` 과 두 집계기가 병목이 되지 않는지 확인한다.

use chrono::{Duration, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

use devatlas_lib::domain::{
    CompanyAggregator, NormalizedJob, RegionAggregator, RegionCentroids, build_geo_query,
    extract_region,
};

const LOCATIONS: [&str; 6] = [
    "서울 > 강남구",
    "경기 > 성남시 분당구",
    "부산광역시 해운대구",
    "재택근무",
    "전국",
    "세종특별자치시",
];

fn sample_jobs(n: usize) -> Vec<NormalizedJob> {
    let base = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let names = vec![LOCATIONS[i % LOCATIONS.len()].to_string()];
            NormalizedJob {
                source_job_id: (i % (n / 2).max(1)).to_string(),
                company_name: format!("company-{}", i % 97),
                region: extract_region(&names),
                location_names: names,
                updated_at: Some(base + Duration::minutes(i as i64)),
                ..Default::default()
            }
        })
        .collect()
}

fn region_extraction(c: &mut Criterion) {
    let names: Vec<String> = LOCATIONS.iter().map(ToString::to_string).collect();

    c.bench_function("extract_region (6 names)", |b| {
        b.iter(|| {
            for name in &names {
                black_box(extract_region(std::slice::from_ref(name)));
            }
        });
    });

    c.bench_function("build_geo_query (6 names)", |b| {
        b.iter(|| {
            for name in &names {
                black_box(build_geo_query(std::slice::from_ref(name)));
            }
        });
    });
}

fn aggregation(c: &mut Criterion) {
    let jobs = sample_jobs(5_000);
    let now = Utc.with_ymd_and_hms(2025, 4, 2, 0, 0, 0).unwrap();

    c.bench_function("region aggregator 5k jobs", |b| {
        b.iter(|| {
            let mut aggregator = RegionAggregator::new();
            for job in &jobs {
                aggregator.add(job);
            }
            black_box(aggregator.into_results())
        });
    });

    c.bench_function("company aggregator 5k jobs", |b| {
        b.iter(|| {
            let mut aggregator = CompanyAggregator::new(RegionCentroids::korea());
            for job in &jobs {
                aggregator.add(job, now);
            }
            black_box(aggregator.active_companies(now - Duration::days(21)))
        });
    });
}

criterion_group!(benches, region_extraction, aggregation);
criterion_main!(benches);
