//! 수집 실행 전체 흐름 테스트 (Saramin + Nominatim mock 서버)

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use mockito::{Matcher, Server};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use devatlas_lib::application::{CollectError, Collector, CollectorSettings};
use devatlas_lib::domain::{ExplicitBounds, RegionCentroids, WindowPlanner};
use devatlas_lib::infrastructure::config::StorageConfig;
use devatlas_lib::infrastructure::geocode::{Geocoder, NominatimConfig, NominatimGeocoder};
use devatlas_lib::infrastructure::{JobSearchParams, RetryPolicy, SaraminClient, SaraminClientConfig};

fn run_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 15, 10, 0).unwrap()
}

fn job(id: &str, company: &str, location: &str, updated: i64) -> Value {
    json!({
        "url": format!("https://www.saramin.co.kr/jobs/{id}"),
        "active": 1,
        "company": {"detail": {"href": format!("https://{company}.example"), "name": company}},
        "position": {
            "title": format!("engineer {id}"),
            "location": {"code": "101000", "name": location},
            "job-code": {"code": "84", "name": "백엔드"}
        },
        "id": id,
        "posting-timestamp": updated - 3600,
        "modification-timestamp": updated,
        "expiration-timestamp": updated + 86_400 * 30
    })
}

fn page(jobs: Vec<Value>) -> String {
    let total = jobs.len();
    json!({"jobs": {"count": total, "start": 0, "total": total.to_string(), "job": jobs}}).to_string()
}

fn saramin(url: &str, attempts: u32) -> SaraminClient {
    SaraminClient::new(SaraminClientConfig {
        base_url: url.to_string(),
        access_key: "test-key".to_string(),
        min_interval: Duration::ZERO,
        retry: RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(2)),
        ..Default::default()
    })
    .unwrap()
}

fn nominatim(url: &str) -> Arc<dyn Geocoder> {
    Arc::new(
        NominatimGeocoder::new(NominatimConfig {
            base_url: url.to_string(),
            min_interval: Duration::ZERO,
            ..Default::default()
        })
        .unwrap(),
    )
}

fn settings(data_dir: &Path, bounds: ExplicitBounds) -> CollectorSettings {
    CollectorSettings {
        planner: WindowPlanner::default(),
        bounds,
        base_params: JobSearchParams {
            job_cd: vec!["84".to_string()],
            sr: vec!["directhire".to_string()],
            count: 110,
            sort: "ud".to_string(),
            ..Default::default()
        },
        current_window: chrono::Duration::days(21),
        storage: StorageConfig {
            data_dir: data_dir.to_path_buf(),
            raw_enabled: true,
            run_log_enabled: true,
        },
        centroids: RegionCentroids::korea(),
        run_timeout: None,
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn updated_min(ts: i64) -> Matcher {
    Matcher::UrlEncoded("updated_min".into(), ts.to_string())
}

#[tokio::test]
async fn test_automatic_run_writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let now = run_at();
    let primary_start = (now - chrono::Duration::hours(24)).timestamp();
    let refetch_start = (now - chrono::Duration::days(7)).timestamp();
    let recent = now.timestamp() - 600;

    let mut api = Server::new_async().await;
    let primary = api
        .mock("GET", "/job-search")
        .match_query(updated_min(primary_start))
        .with_status(200)
        .with_body(page(vec![
            job("1", "acme", "서울 강남구", recent),
            job("2", "beta", "재택근무", recent),
            job("", "gamma", "해외", recent),
        ]))
        .expect(1)
        .create_async()
        .await;
    let refetch = api
        .mock("GET", "/job-search")
        .match_query(updated_min(refetch_start))
        .with_status(200)
        .with_body(page(vec![
            job("1", "acme", "서울 강남구", recent),
            job("2", "beta", "재택근무", recent),
            job("3", "acme", "경기 성남시 분당구", recent),
        ]))
        .expect(1)
        .create_async()
        .await;

    let mut geo = Server::new_async().await;
    let seoul = geo
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "서울 강남구".into()))
        .with_status(200)
        .with_body(r#"[{"lat":"37.4979","lon":"127.0276"}]"#)
        .expect(1)
        .create_async()
        .await;
    let seongnam = geo
        .mock("GET", "/search")
        .match_query(Matcher::UrlEncoded("q".into(), "경기 성남시 분당구".into()))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let collector = Collector::new(
        saramin(&api.url(), 3),
        Some(nominatim(&geo.url())),
        settings(dir.path(), ExplicitBounds::default()),
    );
    let summary = collector.run_once(now, &CancellationToken::new()).await.unwrap();

    primary.assert_async().await;
    refetch.assert_async().await;
    seoul.assert_async().await;
    seongnam.assert_async().await;

    assert!(summary.automatic);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.jobs, 6);
    // id "2" once across both passes, plus the id-less job
    assert_eq!(summary.missing_regions, 2);
    assert_eq!(summary.geocode_misses, 2);
    assert_eq!(summary.geocode_hits, 1);

    let counts = read_json(&dir.path().join("region_counts.json"));
    assert_eq!(counts["meta"]["missing_regions"], 2);
    assert_eq!(counts["meta"]["window_end"], "2025-04-01T15:10:00Z");
    assert_eq!(
        counts["regions"],
        json!([
            {"region": "경기", "job_count": 1, "company_count": 1},
            {"region": "서울", "job_count": 1, "company_count": 1}
        ])
    );

    let companies = read_json(&dir.path().join("latest_companies.json"));
    assert_eq!(companies["meta"]["region_level"], "sido");
    let list = companies["companies"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["region"], "경기");
    // not found by the geocoder: centroid fallback
    let centroid = RegionCentroids::korea().get("경기");
    assert_eq!(list[0]["lat"], centroid.lat);
    assert_eq!(list[1]["region"], "서울");
    assert_eq!(list[1]["lat"], 37.4979);
    assert_eq!(list[1]["url"], "https://acme.example");
    assert_eq!(list[1]["asof"], "2025-04-02");

    let issues = std::fs::read_to_string(dir.path().join("region_missing.jsonl")).unwrap();
    let issues: Vec<Value> = issues.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0]["job_id"], "2");
    assert!(issues[1].get("job_id").is_none());
    assert_eq!(issues[1]["company"], "gamma");

    let state = read_json(&dir.path().join("run_state.json"));
    assert_eq!(state["last_run_at"], "2025-04-01T15:10:00Z");

    let cache = read_json(&dir.path().join("geocode_cache.json"));
    let entries = cache["entries"].as_object().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries["경기 성남시 분당구"]["found"], false);

    let record = read_json(&dir.path().join("runs/run-20250402T001000+0900.json"));
    assert_eq!(record["status"], "completed");
    assert_eq!(record["metrics"]["pages"], 2);
    assert_eq!(record["tags"]["mode"], "auto");

    let raw: Vec<Value> = std::fs::read_dir(dir.path().join("raw"))
        .unwrap()
        .flat_map(|entry| {
            let text = std::fs::read_to_string(entry.unwrap().path()).unwrap();
            text.lines()
                .map(|l| serde_json::from_str::<Value>(l).unwrap())
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(raw.len(), 6);
    // archived as received: numeric timestamps stay numbers
    assert_eq!(raw[0]["payload"]["modification-timestamp"], recent);
    assert_eq!(raw[0]["payload"]["active"], 1);
}

#[tokio::test]
async fn test_second_run_continues_from_state_and_reuses_cache() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_at();
    let second = first + chrono::Duration::hours(3);

    let mut api = Server::new_async().await;
    let _continued = api
        .mock("GET", "/job-search")
        .match_query(updated_min(first.timestamp()))
        .with_status(200)
        .with_body(page(vec![job("9", "acme", "서울 강남구", second.timestamp() - 60)]))
        .expect(1)
        .create_async()
        .await;
    let _refetch = api
        .mock("GET", "/job-search")
        .match_query(updated_min((second - chrono::Duration::days(7)).timestamp()))
        .with_status(200)
        .with_body(page(Vec::new()))
        .expect(1)
        .create_async()
        .await;

    std::fs::write(
        dir.path().join("run_state.json"),
        r#"{"last_run_at":"2025-04-01T15:10:00Z"}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("geocode_cache.json"),
        r#"{"entries":{"서울 강남구":{"query":"서울 강남구","lat":37.5,"lng":127.0,"found":true,"updated_at":"2025-03-01T00:00:00Z"}}}"#,
    )
    .unwrap();

    let mut geo = Server::new_async().await;
    let no_lookups = geo
        .mock("GET", "/search")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let collector = Collector::new(
        saramin(&api.url(), 3),
        Some(nominatim(&geo.url())),
        settings(dir.path(), ExplicitBounds::default()),
    );
    let summary = collector.run_once(second, &CancellationToken::new()).await.unwrap();

    no_lookups.assert_async().await;
    assert_eq!(summary.window.start, first);
    assert_eq!(summary.window.end, second);
    assert_eq!(summary.geocode_hits, 1);
    assert_eq!(summary.geocode_misses, 0);

    let state = read_json(&dir.path().join("run_state.json"));
    assert_eq!(state["last_run_at"], "2025-04-01T18:10:00Z");
}

#[tokio::test]
async fn test_manual_run_skips_refetch_and_state() {
    let dir = tempfile::tempdir().unwrap();
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();

    let mut api = Server::new_async().await;
    let only = api
        .mock("GET", "/job-search")
        .match_query(Matcher::AllOf(vec![
            updated_min(start.timestamp()),
            Matcher::UrlEncoded("updated_max".into(), end.timestamp().to_string()),
        ]))
        .with_status(200)
        .with_body(page(vec![job("5", "delta", "부산 해운대구", end.timestamp() - 60)]))
        .expect(1)
        .create_async()
        .await;

    let bounds = ExplicitBounds {
        start: Some(start),
        end: Some(end),
    };
    let collector = Collector::new(saramin(&api.url(), 3), None, settings(dir.path(), bounds));
    let summary = collector.run_once(run_at(), &CancellationToken::new()).await.unwrap();

    only.assert_async().await;
    assert!(!summary.automatic);
    assert_eq!(summary.pages, 1);
    assert!(!dir.path().join("run_state.json").exists());
    assert!(!dir.path().join("region_missing.jsonl").exists());

    // observed at run time, so still current even for an old window
    let companies = read_json(&dir.path().join("latest_companies.json"));
    assert_eq!(companies["companies"][0]["name"], "delta");
    assert_eq!(companies["companies"][0]["lat"], RegionCentroids::korea().get("부산").lat);
    let counts = read_json(&dir.path().join("region_counts.json"));
    assert_eq!(counts["meta"]["window_start"], "2025-01-01T00:00:00Z");
    assert_eq!(counts["regions"][0]["region"], "부산");
}

#[tokio::test]
async fn test_failed_run_commits_nothing_but_logs_failure() {
    let dir = tempfile::tempdir().unwrap();

    let mut api = Server::new_async().await;
    let broken = api
        .mock("GET", "/job-search")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(2)
        .create_async()
        .await;

    let collector = Collector::new(
        saramin(&api.url(), 2),
        None,
        settings(dir.path(), ExplicitBounds::default()),
    );
    let err = collector
        .run_once(run_at(), &CancellationToken::new())
        .await
        .unwrap_err();

    broken.assert_async().await;
    assert!(matches!(err, CollectError::Saramin(_)));
    assert!(!err.is_cancelled());
    assert!(!dir.path().join("region_counts.json").exists());
    assert!(!dir.path().join("latest_companies.json").exists());
    assert!(!dir.path().join("run_state.json").exists());
    assert!(dir.path().join("geocode_cache.json").exists());

    let record = read_json(&dir.path().join("runs/run-20250402T001000+0900.json"));
    assert_eq!(record["status"], "failed");
    assert!(record["error"].as_str().unwrap().contains("500"));
}
