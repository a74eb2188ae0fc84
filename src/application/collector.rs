//! 1회 수집 실행
//!
//! 윈도우 계획 → 페이지 순회 (원본 보관, 정규화, 지오코딩, 집계) → 결과 파일 → 실행 상태.
//! 실패하면 결과 파일과 실행 상태는 쓰지 않는다. 지오코딩 캐시는 성공 여부와 무관하게 저장한다.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::job::{NormalizedJob, RawJob, SOURCE_SARAMIN};
use crate::domain::region::{RegionCentroids, build_geo_query};
use crate::domain::window::{ExplicitBounds, FetchWindow, WindowPlan, WindowPlanner};
use crate::domain::{CompanyAggregator, RegionAggregator};
use crate::infrastructure::config::{AppConfig, StorageConfig};
use crate::infrastructure::errors::{GeocodeError, SaraminError, StoreError};
use crate::infrastructure::geocode::{GeoCache, GeoResolver, Geocoder, NominatimGeocoder};
use crate::infrastructure::output::{
    LatestCompaniesReport, RegionCountsReport, RegionIssue, append_region_issues,
    write_latest_companies, write_region_counts,
};
use crate::infrastructure::raw_store::RawStore;
use crate::infrastructure::run_log::{RunLog, RunMetrics, RunRecord};
use crate::infrastructure::run_state::{RunState, RunStateStore};
use crate::infrastructure::saramin::types::Job;
use crate::infrastructure::saramin::{
    JobSearchParams, JobSearchResponse, PageHandler, SaraminClient, normalize_saramin_job,
};

#[derive(Error, Debug)]
pub enum CollectError {
    #[error(transparent)]
    Saramin(#[from] SaraminError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("collection cancelled")]
    Cancelled,

    /// The run outlived its deadline. Unlike `Cancelled`, later runs still proceed.
    #[error("collection run exceeded its deadline of {limit:?}")]
    DeadlineExceeded { limit: Duration },
}

impl CollectError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Saramin(e) => e.is_cancelled(),
            Self::Geocode(e) => e.is_cancelled(),
            Self::Store(_) | Self::DeadlineExceeded { .. } => false,
        }
    }
}

/// Everything a run needs besides the API clients
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub planner: WindowPlanner,
    /// Set bounds make the run manual: no refetch pass, no run state
    pub bounds: ExplicitBounds,
    pub base_params: JobSearchParams,
    /// Companies seen within this distance of `now` are active
    pub current_window: chrono::Duration,
    pub storage: StorageConfig,
    pub centroids: RegionCentroids,
    /// Per-run deadline; only this run is cancelled when it passes
    pub run_timeout: Option<Duration>,
}

impl CollectorSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, bounds: ExplicitBounds) -> Self {
        Self {
            planner: config.window_planner(),
            bounds,
            base_params: config.base_search_params(),
            current_window: config.current_window(),
            storage: config.storage.clone(),
            centroids: RegionCentroids::korea(),
            run_timeout: config.run_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub window: FetchWindow,
    pub automatic: bool,
    pub pages: usize,
    pub jobs: usize,
    pub missing_regions: usize,
    pub geocode_hits: usize,
    pub geocode_misses: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    fn metrics(&self) -> RunMetrics {
        RunMetrics {
            pages: self.pages as u64,
            jobs: self.jobs as u64,
            missing_regions: self.missing_regions as u64,
            geocode_hits: self.geocode_hits as u64,
            geocode_misses: self.geocode_misses as u64,
        }
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = Duration::from_millis(u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX));
        write!(
            f,
            "pages={} jobs={} missing_regions={} elapsed={:?}",
            self.pages, self.jobs, self.missing_regions, elapsed
        )
    }
}

pub struct Collector {
    client: SaraminClient,
    geocoder: Option<Arc<dyn Geocoder>>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        client: SaraminClient,
        geocoder: Option<Arc<dyn Geocoder>>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            client,
            geocoder,
            settings,
        }
    }

    /// Saramin client plus Nominatim (when enabled) from a validated config
    pub fn from_config(config: &AppConfig, bounds: ExplicitBounds) -> Result<Self, CollectError> {
        let client = SaraminClient::new(config.saramin_client_config())?;
        let geocoder = if config.geocode.enabled {
            let nominatim = NominatimGeocoder::new(config.nominatim_config())?;
            Some(Arc::new(nominatim) as Arc<dyn Geocoder>)
        } else {
            None
        };
        Ok(Self::new(
            client,
            geocoder,
            CollectorSettings::from_config(config, bounds),
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// One complete collection run, bounded by `run_timeout` when set
    pub async fn run_once(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, CollectError> {
        let Some(limit) = self.settings.run_timeout else {
            return self.run_until_cancelled(now, cancel).await;
        };

        let run_cancel = cancel.child_token();
        let run = self.run_until_cancelled(now, &run_cancel);
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            () = tokio::time::sleep(limit) => {
                warn!(timeout_secs = limit.as_secs(), "⏱️ run deadline reached, cancelling");
                run_cancel.cancel();
                // let the run record its failure and save the cache
                match run.await {
                    Err(e) if e.is_cancelled() && !cancel.is_cancelled() => {
                        Err(CollectError::DeadlineExceeded { limit })
                    }
                    other => other,
                }
            }
        }
    }

    async fn run_until_cancelled(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, CollectError> {
        let started = Instant::now();
        let storage = &self.settings.storage;

        // Local state first; malformed files abort before any request.
        let cache_path = storage.geocode_cache_path();
        let cache = GeoCache::load(&cache_path).await?;
        let state_store = RunStateStore::new(storage.run_state_path());
        let last_run_at = if self.settings.bounds.is_set() {
            None
        } else {
            state_store.load().await?.last_run()
        };
        let plan = self.settings.planner.plan(self.settings.bounds, last_run_at, now);
        info!(
            start = %plan.primary.start,
            end = %plan.primary.end,
            refetch_start = ?plan.refetch.map(|w| w.start),
            automatic = plan.automatic,
            cached_queries = cache.len(),
            "🚀 collection run started"
        );

        let run_log = storage.run_log_enabled.then(|| RunLog::new(storage.runs_dir()));
        let mut record = match &run_log {
            Some(log) => Some(log.start(now, plan.primary, self.run_tags(&plan)).await?),
            None => None,
        };

        let mut ctx = RunContext {
            now,
            resolver: GeoResolver::new(self.geocoder.clone(), cache),
            regions: RegionAggregator::new(),
            companies: CompanyAggregator::new(self.settings.centroids.clone()),
            raw_store: storage.raw_enabled.then(|| RawStore::new(storage.raw_dir())),
            missing_ids: HashSet::new(),
            issues: Vec::new(),
            pages: 0,
            jobs: 0,
            missing: 0,
        };

        let outcome = self.collect_and_write(&plan, &mut ctx, &state_store, cancel).await;
        if outcome.is_err() {
            if let Some(store) = ctx.raw_store.as_mut() {
                if let Err(e) = store.close().await {
                    warn!(error = %e, "raw store close failed");
                }
            }
        }

        let (geocode_hits, geocode_misses) = ctx.resolver.stats();
        let summary = RunSummary {
            window: plan.primary,
            automatic: plan.automatic,
            pages: ctx.pages,
            jobs: ctx.jobs,
            missing_regions: ctx.missing,
            geocode_hits,
            geocode_misses,
            elapsed: started.elapsed(),
        };

        let cache = ctx.resolver.into_cache();
        if let Err(e) = cache.save(&cache_path).await {
            warn!(error = %e, "⚠️ geocode cache save failed");
        }

        if let (Some(log), Some(record)) = (&run_log, record.as_mut()) {
            finish_record(log, record, &summary, outcome.as_ref().err()).await;
        }

        match outcome {
            Ok(()) => {
                info!(
                    pages = summary.pages,
                    jobs = summary.jobs,
                    missing_regions = summary.missing_regions,
                    geocode_hits = summary.geocode_hits,
                    geocode_misses = summary.geocode_misses,
                    "✅ collection run completed"
                );
                Ok(summary)
            }
            Err(e) => Err(e),
        }
    }

    fn run_tags(&self, plan: &WindowPlan) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        let mode = if plan.automatic { "auto" } else { "manual" };
        tags.insert("mode".to_string(), mode.to_string());
        tags.insert(
            "job_codes".to_string(),
            self.settings.base_params.job_cd.len().to_string(),
        );
        if let Some(refetch) = plan.refetch {
            tags.insert("refetch_start".to_string(), refetch.start.to_rfc3339());
        }
        tags
    }

    async fn collect_and_write(
        &self,
        plan: &WindowPlan,
        ctx: &mut RunContext,
        state_store: &RunStateStore,
        cancel: &CancellationToken,
    ) -> Result<(), CollectError> {
        for window in plan.windows() {
            self.collect_window(window, ctx, cancel).await?;
        }
        if let Some(store) = ctx.raw_store.as_mut() {
            store.close().await?;
        }

        let storage = &self.settings.storage;
        let counts = RegionCountsReport::new(ctx.now, plan.primary, ctx.missing, ctx.regions.results());
        write_region_counts(&storage.region_counts_path(), &counts).await?;

        let cutoff = ctx.now - self.settings.current_window;
        let active = ctx.companies.active_companies(cutoff);
        write_latest_companies(
            &storage.latest_companies_path(),
            &LatestCompaniesReport::new(ctx.now, &active),
        )
        .await?;

        if !ctx.issues.is_empty() {
            append_region_issues(&storage.region_missing_path(), &ctx.issues).await?;
        }

        if plan.automatic {
            state_store
                .save(&RunState {
                    last_run_at: Some(plan.primary.end),
                })
                .await?;
        }
        Ok(())
    }

    async fn collect_window(
        &self,
        window: FetchWindow,
        ctx: &mut RunContext,
        cancel: &CancellationToken,
    ) -> Result<usize, CollectError> {
        if window.is_empty() {
            return Ok(0);
        }
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }

        let mut params = self.settings.base_params.clone();
        params.updated_min = Some(window.start);
        params.updated_max = Some(window.end);

        let mut handler = PageCollector { ctx, cancel };
        let pages = self
            .client
            .job_search_pages(&params, &mut handler, cancel)
            .await?;
        info!(start = %window.start, end = %window.end, pages, "📄 window collected");
        Ok(pages)
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("client", &self.client)
            .field("has_geocoder", &self.geocoder.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

async fn finish_record(
    log: &RunLog,
    record: &mut RunRecord,
    summary: &RunSummary,
    error: Option<&CollectError>,
) {
    let error = error.map(ToString::to_string);
    if let Err(e) = log.finish(record, summary.metrics(), error).await {
        warn!(error = %e, "run log finish failed");
    }
}

/// Mutable state of a single run. Discarded on failure.
struct RunContext {
    now: DateTime<Utc>,
    resolver: GeoResolver,
    regions: RegionAggregator,
    companies: CompanyAggregator,
    raw_store: Option<RawStore>,
    /// Ids already reported as region-missing, shared by both passes
    missing_ids: HashSet<String>,
    issues: Vec<RegionIssue>,
    pages: usize,
    jobs: usize,
    missing: usize,
}

impl RunContext {
    async fn observe(&mut self, job: &Job, cancel: &CancellationToken) -> Result<(), CollectError> {
        let mut normalized = normalize_saramin_job(job, Some(self.now));

        let query = build_geo_query(&normalized.location_names);
        if !query.is_empty() {
            let resolution = self.resolver.resolve(&query, cancel).await?;
            if resolution.found {
                normalized.coordinates = resolution.coords;
            }
        }

        self.regions.add(&normalized);
        self.companies.add(&normalized, self.now);
        if !normalized.has_region() {
            self.record_missing(&normalized);
        }
        Ok(())
    }

    fn record_missing(&mut self, job: &NormalizedJob) {
        let id = &job.source_job_id;
        if !id.is_empty() && !self.missing_ids.insert(id.clone()) {
            return;
        }
        self.missing += 1;
        debug!(job_id = %id, locations = ?job.location_names, "region not resolved");
        self.issues.push(RegionIssue {
            job_id: id.clone(),
            company: job.company_name.clone(),
            title: job.title.clone(),
            location_names: job.location_names.clone(),
            location_codes: job.location_codes.clone(),
            observed_at: self.now,
        });
    }

    /// Archive the listing as received; the typed `Job` is a fallback only
    async fn archive(
        &mut self,
        job: &Job,
        raw: Option<&serde_json::Value>,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CollectError> {
        let Some(store) = self.raw_store.as_mut() else {
            return Ok(());
        };
        let payload = match raw {
            Some(raw) => raw.clone(),
            None => serde_json::to_value(job).map_err(|e| StoreError::parse(store.dir(), e))?,
        };
        store
            .append(&RawJob {
                source: SOURCE_SARAMIN.to_string(),
                source_job_id: job.id.trim().to_string(),
                fetched_at,
                payload,
            })
            .await?;
        Ok(())
    }
}

struct PageCollector<'a> {
    ctx: &'a mut RunContext,
    cancel: &'a CancellationToken,
}

#[async_trait]
impl PageHandler for PageCollector<'_> {
    type Error = CollectError;

    async fn handle_page(
        &mut self,
        page: &JobSearchResponse,
    ) -> Result<ControlFlow<()>, Self::Error> {
        self.ctx.pages += 1;
        let fetched_at = Utc::now();
        for (index, job) in page.jobs.job.iter().enumerate() {
            self.ctx.archive(job, page.raw_job(index), fetched_at).await?;
            self.ctx.observe(job, self.cancel).await?;
        }
        self.ctx.jobs += page.jobs.job.len();
        if let Some(store) = self.ctx.raw_store.as_mut() {
            store.flush().await?;
        }
        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::saramin::SaraminClientConfig;
    use chrono::TimeZone;

    fn settings(dir: &std::path::Path) -> CollectorSettings {
        CollectorSettings {
            planner: WindowPlanner::default(),
            bounds: ExplicitBounds::default(),
            base_params: JobSearchParams {
                job_cd: vec!["84".to_string()],
                count: 2,
                ..Default::default()
            },
            current_window: chrono::Duration::days(21),
            storage: StorageConfig {
                data_dir: dir.to_path_buf(),
                raw_enabled: false,
                run_log_enabled: false,
            },
            centroids: RegionCentroids::korea(),
            run_timeout: None,
        }
    }

    fn client(base_url: &str) -> SaraminClient {
        SaraminClient::new(SaraminClientConfig {
            base_url: base_url.to_string(),
            access_key: "test-key".to_string(),
            min_interval: Duration::ZERO,
            ..Default::default()
        })
        .unwrap()
    }

    fn job(id: &str, location: &str) -> Job {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "company": {"detail": {"name": format!("company-{id}")}},
            "position": {"title": "backend", "location": {"code": "", "name": location}},
        }))
        .unwrap()
    }

    fn context(now: DateTime<Utc>) -> RunContext {
        RunContext {
            now,
            resolver: GeoResolver::new(None, GeoCache::new()),
            regions: RegionAggregator::new(),
            companies: CompanyAggregator::new(RegionCentroids::korea()),
            raw_store: None,
            missing_ids: HashSet::new(),
            issues: Vec::new(),
            pages: 0,
            jobs: 0,
            missing: 0,
        }
    }

    #[tokio::test]
    async fn test_missing_region_dedup_by_id() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let mut ctx = context(now);
        let cancel = CancellationToken::new();

        for j in [job("1", "재택근무"), job("1", "재택근무"), job("", "해외"), job("", "해외")] {
            ctx.observe(&j, &cancel).await.unwrap();
        }
        ctx.observe(&job("2", "서울 강남구"), &cancel).await.unwrap();

        // id "1" once, id-less twice
        assert_eq!(ctx.missing, 3);
        assert_eq!(ctx.issues.len(), 3);
        assert_eq!(ctx.issues[0].job_id, "1");
        assert_eq!(ctx.issues[0].observed_at, now);
        assert_eq!(ctx.regions.results().len(), 1);
        assert_eq!(ctx.companies.len(), 1);
    }

    #[tokio::test]
    async fn test_company_falls_back_to_centroid_without_geocoder() {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let mut ctx = context(now);
        ctx.observe(&job("7", "부산 해운대구"), &CancellationToken::new())
            .await
            .unwrap();
        let companies = ctx.companies.active_companies(now - chrono::Duration::days(1));
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].region, "부산");
        assert_eq!(
            companies[0].coordinates(),
            RegionCentroids::korea().get("부산")
        );
    }

    #[test]
    fn test_cancel_detection() {
        assert!(CollectError::Cancelled.is_cancelled());
        assert!(CollectError::Saramin(SaraminError::Cancelled).is_cancelled());
        assert!(CollectError::Geocode(GeocodeError::Cancelled).is_cancelled());
        assert!(!CollectError::Saramin(SaraminError::HttpStatus { status: 500 }).is_cancelled());
        assert!(!CollectError::DeadlineExceeded { limit: Duration::from_secs(1) }.is_cancelled());
    }

    #[test]
    fn test_summary_display() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        let summary = RunSummary {
            window: FetchWindow::new(at, at),
            automatic: true,
            pages: 3,
            jobs: 250,
            missing_regions: 4,
            geocode_hits: 0,
            geocode_misses: 0,
            elapsed: Duration::from_micros(1_234_567),
        };
        assert_eq!(
            summary.to_string(),
            "pages=3 jobs=250 missing_regions=4 elapsed=1.234s"
        );
    }

    #[tokio::test]
    async fn test_malformed_cache_aborts_before_requests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("geocode_cache.json"), "{not json").unwrap();

        let mut server = mockito::Server::new_async().await;
        let untouched = server
            .mock("GET", "/job-search")
            .match_query(mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let collector = Collector::new(client(&server.url()), None, settings(dir.path()));
        let result = collector.run_once(Utc::now(), &CancellationToken::new()).await;
        assert!(matches!(result, Err(CollectError::Store(StoreError::Parse { .. }))));
        untouched.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let server = mockito::Server::new_async().await;
        let collector = Collector::new(client(&server.url()), None, settings(dir.path()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = collector.run_once(Utc::now(), &cancel).await;
        assert!(result.unwrap_err().is_cancelled());
        assert!(!dir.path().join("region_counts.json").exists());
        assert!(!dir.path().join("run_state.json").exists());
        // cache is still written
        assert!(dir.path().join("geocode_cache.json").exists());
    }

    /// Waits until the run is cancelled
    struct StalledGeocoder;

    #[async_trait]
    impl Geocoder for StalledGeocoder {
        async fn geocode(
            &self,
            _query: &str,
            cancel: &CancellationToken,
        ) -> Result<crate::infrastructure::geocode::GeocodeResult, GeocodeError> {
            cancel.cancelled().await;
            Err(GeocodeError::Cancelled)
        }
    }

    #[tokio::test]
    async fn test_deadline_cancels_only_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/job-search")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"jobs":{"total":"1","job":[{"id":"1","company":{"detail":{"name":"acme"}},
                   "position":{"location":{"code":"101000","name":"서울 강남구"}}}]}}"#,
            )
            .create_async()
            .await;

        let mut settings = settings(dir.path());
        settings.run_timeout = Some(Duration::from_millis(100));
        let collector = Collector::new(
            client(&server.url()),
            Some(Arc::new(StalledGeocoder) as Arc<dyn Geocoder>),
            settings,
        );

        let cancel = CancellationToken::new();
        let err = collector.run_once(Utc::now(), &cancel).await.unwrap_err();
        assert!(matches!(err, CollectError::DeadlineExceeded { .. }));
        assert!(!err.is_cancelled());
        assert!(!cancel.is_cancelled());
        assert!(!dir.path().join("region_counts.json").exists());
        assert!(dir.path().join("geocode_cache.json").exists());
    }
}
