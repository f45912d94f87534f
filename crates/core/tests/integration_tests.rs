use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use stock_insight_core::errors::CoreError;
use stock_insight_core::models::dataset::{Dataset, DatasetRole, DecodedSheet, TradingDate};
use stock_insight_core::models::query::{
    AnalysisParams, DateRange, FilterSet, FlowMetric, NumericField, SortKey, SortOrder, SortState,
};
use stock_insight_core::models::record::Record;
use stock_insight_core::models::series::SeriesMode;
use stock_insight_core::models::settings::Settings;
use stock_insight_core::storage::repository::{DatasetRepository, MemoryRepository};
use stock_insight_core::{logging, StockInsight};

// ═══════════════════════════════════════════════════════════════════
// Failing repository (storage that rejects every write)
// ═══════════════════════════════════════════════════════════════════

struct FailingRepository;

#[async_trait]
impl DatasetRepository for FailingRepository {
    async fn load_all(&self) -> Result<Vec<Dataset>, CoreError> {
        Err(CoreError::Persistence("storage unavailable".into()))
    }

    async fn upsert(&self, _dataset: &Dataset) -> Result<(), CoreError> {
        Err(CoreError::Persistence("quota exceeded".into()))
    }

    async fn delete(&self, _id: Uuid) -> Result<(), CoreError> {
        Err(CoreError::Persistence("storage unavailable".into()))
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        Err(CoreError::Persistence("storage unavailable".into()))
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        Ok(None)
    }

    async fn save_settings(&self, _settings: &Settings) -> Result<(), CoreError> {
        Err(CoreError::Persistence("storage unavailable".into()))
    }
}

// ═══════════════════════════════════════════════════════════════════
// Flaky repository (in-memory storage that rejects one chosen upsert)
// ═══════════════════════════════════════════════════════════════════

struct FlakyRepository {
    inner: MemoryRepository,
    /// 1-based index of the upsert call that fails
    fail_upsert: usize,
    upserts: AtomicUsize,
}

impl FlakyRepository {
    fn failing_upsert(n: usize) -> Self {
        Self {
            inner: MemoryRepository::new(),
            fail_upsert: n,
            upserts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DatasetRepository for FlakyRepository {
    async fn load_all(&self) -> Result<Vec<Dataset>, CoreError> {
        self.inner.load_all().await
    }

    async fn upsert(&self, dataset: &Dataset) -> Result<(), CoreError> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_upsert {
            return Err(CoreError::Persistence("quota exceeded".into()));
        }
        self.inner.upsert(dataset).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.inner.delete(id).await
    }

    async fn delete_all(&self) -> Result<(), CoreError> {
        self.inner.delete_all().await
    }

    async fn load_settings(&self) -> Result<Option<Settings>, CoreError> {
        self.inner.load_settings().await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<(), CoreError> {
        self.inner.save_settings(settings).await
    }
}

// ═══════════════════════════════════════════════════════════════════
// Fixtures: one trading week as the exporters deliver it
// ═══════════════════════════════════════════════════════════════════

fn roster_sheet() -> DecodedSheet {
    DecodedSheet::new(
        "selected.xlsx",
        vec![
            Record::new()
                .with("종목코드", "005930")
                .with("종목명", "삼성전자")
                .with("등락률", "2.34%"),
            Record::new()
                .with("종목코드", "000660")
                .with("종목명", "SK하이닉스")
                .with("등락률", -0.015),
            // Romanized headers from a different exporter
            Record::new()
                .with("Code", "035420")
                .with("Name", "NAVER")
                .with("ChangeRate", 5.1),
        ],
    )
}

/// A flow export with positional-only headers: code, name, then filler up to
/// the trade value in column 7.
fn flow_sheet(file_name: &str, rows: &[(&str, f64)]) -> DecodedSheet {
    let records = rows
        .iter()
        .map(|(code, value)| {
            Record::new()
                .with("col0", *code)
                .with("col1", "")
                .with("col2", 0.0)
                .with("col3", 0.0)
                .with("col4", 0.0)
                .with("col5", 0.0)
                .with("col6", 0.0)
                .with("col7", *value)
        })
        .collect();
    DecodedSheet::new(file_name, records)
}

fn loaded_tracker() -> StockInsight {
    let mut tracker = StockInsight::create_new();
    tracker.add_sheets(vec![roster_sheet()], DatasetRole::Roster);
    tracker.add_sheets(
        vec![
            flow_sheet("total_240115.xlsx", &[("005930", 9000.0), ("000660", 4000.0)]),
            flow_sheet("total_240116.xlsx", &[("005930", 8000.0)]),
        ],
        DatasetRole::MarketTotal,
    );
    // Dropped on the market slot, but the prefixes win
    tracker.add_sheets(
        vec![
            flow_sheet("inst_240115.xlsx", &[("005930", 100.0), ("000660", -40.0)]),
            flow_sheet("inst_240116.xlsx", &[("005930", 50.0), ("035420", 30.0)]),
            flow_sheet("f_240115.xlsx", &[("005930", 7.0)]),
        ],
        DatasetRole::MarketTotal,
    );
    tracker
}

fn params() -> AnalysisParams {
    AnalysisParams::new(
        DateRange::from_iso("2024-01-01", "2024-01-31"),
        TradingDate::from_iso("2024-01-15"),
    )
}

// ═══════════════════════════════════════════════════════════════════
// End-to-end
// ═══════════════════════════════════════════════════════════════════

#[test]
fn readiness_follows_uploads() {
    let mut tracker = StockInsight::create_new();
    assert!(!tracker.is_ready());
    tracker.add_sheets(vec![roster_sheet()], DatasetRole::Roster);
    assert_eq!(tracker.missing_roles().len(), 3);
    let tracker = loaded_tracker();
    assert!(tracker.is_ready());
    assert!(tracker.has_unsaved_changes());
}

#[test]
fn dashboard_table() {
    let tracker = loaded_tracker();
    let rows = tracker.reconcile(&params());
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].code, "005930");
    assert!((rows[0].change_rate - 2.34).abs() < 1e-9);
    assert_eq!(rows[0].range_aggregate, 150.0);
    assert_eq!(rows[0].specific_institutional, 100.0);
    assert_eq!(rows[0].specific_market, 9000.0);

    assert_eq!(rows[1].name, "SK하이닉스");
    assert!((rows[1].change_rate + 1.5).abs() < 1e-9);
    assert_eq!(rows[1].range_aggregate, -40.0);
    assert_eq!(rows[1].specific_market, 4000.0);

    assert_eq!(rows[2].code, "035420");
    assert_eq!(rows[2].range_aggregate, 30.0);
    assert_eq!(rows[2].specific_institutional, 0.0);
}

#[test]
fn filtered_sorted_table() {
    let tracker = loaded_tracker();
    let p = params()
        .with_filters(FilterSet::new().with_min(NumericField::RangeAggregate, 0.0))
        .with_sort(SortState::new(SortKey::ChangeRate, SortOrder::Desc));
    let rows = tracker.snapshot_table(&p);
    let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["035420", "005930"]);
}

#[test]
fn foreign_metric_range() {
    let tracker = loaded_tracker();
    let rows = tracker.reconcile(&params().with_metric(FlowMetric::ForeignFlow));
    assert_eq!(rows[0].range_aggregate, 7.0);
    // Snapshot columns always read institutional and market feeds
    assert_eq!(rows[0].specific_institutional, 100.0);
}

#[test]
fn chart_series() {
    let tracker = loaded_tracker();
    let selected: Vec<String> = tracker
        .stock_choices()
        .into_iter()
        .map(|(code, _)| code)
        .take(2)
        .collect();
    assert_eq!(selected, vec!["005930".to_string(), "000660".to_string()]);

    let points = tracker.build_series(
        &selected,
        &DateRange::from_iso("2024-01-01", "2024-01-31"),
        FlowMetric::InstitutionalFlow,
        SeriesMode::Cumulative,
    );
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].value("005930"), 150.0);
    assert_eq!(points[1].value("000660"), -40.0);
    assert_eq!(points[0].calendar_date, NaiveDate::from_ymd_opt(2024, 1, 15));
}

#[test]
fn exports() {
    let tracker = loaded_tracker();
    let csv = tracker.export_csv(&params());
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.lines().nth(1).unwrap().starts_with("005930,삼성전자,"));
    let json = tracker.export_json(&params()).unwrap();
    assert!(json.contains("\"specific_market\": 9000.0"));
    assert!(tracker.export_file_name().ends_with(".csv"));
}

#[test]
fn remove_and_clear() {
    let mut tracker = loaded_tracker();
    let roster_id = tracker.datasets().roster().unwrap().id;
    let removed = tracker.remove_dataset(roster_id).unwrap();
    assert_eq!(removed.name, "selected.xlsx");
    assert!(tracker.reconcile(&params()).is_empty());
    assert!(matches!(
        tracker.remove_dataset(roster_id),
        Err(CoreError::DatasetNotFound(_))
    ));
    tracker.clear();
    assert!(tracker.datasets().is_empty());
    assert!(tracker.trading_dates().is_empty());
}

#[test]
fn settings_change_affects_later_uploads_only() {
    let mut tracker = StockInsight::create_new();
    tracker.add_sheets(vec![flow_sheet("frgn_240115.xlsx", &[])], DatasetRole::MarketTotal);
    tracker
        .set_settings(Settings {
            foreign_prefix: "frgn_".into(),
            ..Settings::default()
        })
        .unwrap();
    tracker.add_sheets(vec![flow_sheet("frgn_240116.xlsx", &[])], DatasetRole::MarketTotal);
    let roles: Vec<DatasetRole> = tracker.datasets().all().iter().map(|d| d.role).collect();
    assert_eq!(roles, vec![DatasetRole::MarketTotal, DatasetRole::ForeignFlow]);
    assert!(tracker
        .set_settings(Settings {
            foreign_prefix: String::new(),
            ..Settings::default()
        })
        .is_err());
}

#[test]
fn default_params_follow_settings() {
    let tracker = StockInsight::with_settings(Settings {
        default_specific_date: "2024-01-16".into(),
        ..Settings::default()
    })
    .unwrap();
    assert_eq!(tracker.default_params().specific_date.as_str(), "240116");
}

#[test]
fn tracing_init_is_idempotent() {
    logging::init_tracing("debug");
    assert!(!logging::init_tracing("debug"));
}

// ═══════════════════════════════════════════════════════════════════
// Persistence
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn upload_persist_and_reload() {
    let repo = MemoryRepository::new();
    let mut tracker = StockInsight::create_new();
    let outcome = tracker
        .upload_batch(&repo, vec![roster_sheet()], DatasetRole::Roster)
        .await;
    assert!(outcome.is_persisted());
    assert_eq!(outcome.value.len(), 1);
    assert!(!tracker.has_unsaved_changes());

    tracker
        .upload_batch(
            &repo,
            vec![flow_sheet("inst_240115.xlsx", &[("005930", 100.0)])],
            DatasetRole::InstitutionalFlow,
        )
        .await;

    let reloaded = StockInsight::load(&repo).await.unwrap();
    assert_eq!(reloaded.datasets().len(), 2);
    assert_eq!(reloaded.reconcile(&params()), tracker.reconcile(&params()));
}

#[tokio::test]
async fn delete_and_clear_through_repository() {
    let repo = MemoryRepository::new();
    let mut tracker = StockInsight::create_new();
    let ids = tracker
        .upload_batch(
            &repo,
            vec![roster_sheet(), flow_sheet("inst_240115.xlsx", &[])],
            DatasetRole::Roster,
        )
        .await
        .value;

    let outcome = tracker.delete_dataset(&repo, ids[0]).await.unwrap();
    assert!(outcome.is_persisted());
    assert_eq!(repo.load_all().await.unwrap().len(), 1);

    assert!(tracker.delete_dataset(&repo, Uuid::new_v4()).await.is_err());

    let cleared = tracker.clear_all(&repo).await;
    assert!(cleared.is_persisted());
    assert!(repo.load_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_keeps_memory_state() {
    let repo = FailingRepository;
    let mut tracker = StockInsight::create_new();

    let outcome = tracker
        .upload_batch(&repo, vec![roster_sheet()], DatasetRole::Roster)
        .await;
    assert!(!outcome.is_persisted());
    assert!(matches!(outcome.persistence_error, Some(CoreError::Persistence(_))));
    assert_eq!(tracker.datasets().len(), 1);
    assert_eq!(tracker.reconcile(&params()).len(), 3);
    assert!(tracker.has_unsaved_changes());

    let id = outcome.value[0];
    let deleted = tracker.delete_dataset(&repo, id).await.unwrap();
    assert!(!deleted.is_persisted());
    assert!(tracker.datasets().is_empty());

    tracker.add_sheets(vec![roster_sheet()], DatasetRole::Roster);
    let cleared = tracker.clear_all(&repo).await;
    assert!(!cleared.is_persisted());
    assert!(tracker.datasets().is_empty());

    assert!(StockInsight::load(&repo).await.is_err());
}

#[tokio::test]
async fn save_all_writes_full_state() {
    let repo = MemoryRepository::new();
    let mut tracker = loaded_tracker();
    tracker.save_all(&repo).await.unwrap();
    assert!(!tracker.has_unsaved_changes());
    assert_eq!(repo.load_all().await.unwrap().len(), 6);
    assert_eq!(repo.load_settings().await.unwrap(), Some(Settings::default()));

    let snapshot = tracker.to_snapshot();
    let restored = StockInsight::from_snapshot(snapshot);
    assert_eq!(restored.datasets().len(), 6);
}

#[tokio::test]
async fn later_successful_sync_keeps_unsaved_flag() {
    let repo = FlakyRepository::failing_upsert(2);
    let mut tracker = StockInsight::create_new();

    let first = tracker
        .upload_batch(&repo, vec![roster_sheet()], DatasetRole::Roster)
        .await;
    assert!(first.is_persisted());
    assert!(!tracker.has_unsaved_changes());

    let second = tracker
        .upload_batch(
            &repo,
            vec![flow_sheet("inst_240115.xlsx", &[("005930", 100.0)])],
            DatasetRole::InstitutionalFlow,
        )
        .await;
    assert!(!second.is_persisted());
    assert!(tracker.has_unsaved_changes());

    let deleted = tracker.delete_dataset(&repo, first.value[0]).await.unwrap();
    assert!(deleted.is_persisted());
    assert_eq!(tracker.datasets().len(), 1);
    assert!(repo.load_all().await.unwrap().is_empty());
    assert!(tracker.has_unsaved_changes());

    let cleared = tracker.clear_all(&repo).await;
    assert!(cleared.is_persisted());
    assert!(tracker.has_unsaved_changes());

    tracker.add_sheets(vec![roster_sheet()], DatasetRole::Roster);
    tracker.save_all(&repo).await.unwrap();
    assert!(!tracker.has_unsaved_changes());
    assert_eq!(repo.load_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_save_all_keeps_stored_datasets() {
    let repo = FlakyRepository::failing_upsert(3);
    let mut tracker = StockInsight::create_new();
    tracker.add_sheets(
        vec![roster_sheet(), flow_sheet("inst_240115.xlsx", &[("005930", 100.0)])],
        DatasetRole::Roster,
    );
    tracker.save_all(&repo).await.unwrap();
    assert_eq!(repo.load_all().await.unwrap().len(), 2);

    tracker.add_sheets(vec![flow_sheet("f_240115.xlsx", &[])], DatasetRole::ForeignFlow);
    let result = tracker.save_all(&repo).await;
    assert!(matches!(result, Err(CoreError::Persistence(_))));
    assert!(tracker.has_unsaved_changes());

    let stored: Vec<Uuid> = repo.load_all().await.unwrap().iter().map(|d| d.id).collect();
    let held: Vec<Uuid> = tracker.datasets().all().iter().map(|d| d.id).collect();
    assert_eq!(stored, held[..2].to_vec());
}

#[tokio::test]
async fn save_all_drops_datasets_removed_from_memory() {
    let repo = MemoryRepository::new();
    let mut tracker = loaded_tracker();
    tracker.save_all(&repo).await.unwrap();

    let roster_id = tracker.datasets().roster().unwrap().id;
    tracker.remove_dataset(roster_id).unwrap();
    assert!(tracker.has_unsaved_changes());
    tracker.save_all(&repo).await.unwrap();

    let stored = repo.load_all().await.unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored.iter().all(|d| d.id != roster_id));
    assert!(!tracker.has_unsaved_changes());
}
