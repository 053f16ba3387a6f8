//! ダウンロード実行ループ
//!
//! 期間ごとに 取得済み確認 → 年月選択 → エクスポート待機 → 正規パスへ配置 を順に行い、
//! どの経路で終了してもセッションを1度だけ閉じる。

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::artifact;
use crate::bts::{FieldLabel, REQUIRED_FIELDS};
use crate::config::DownloaderConfig;
use crate::error::ScraperError;
use crate::period::Period;
use crate::traits::ExportSession;

/// 実行結果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub downloaded: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub struct Downloader<S: ExportSession> {
    config: DownloaderConfig,
    session: S,
    fields: &'static [FieldLabel],
    started: bool,
}

impl<S: ExportSession> Downloader<S> {
    pub fn new(config: DownloaderConfig, session: S) -> Self {
        Self {
            config,
            session,
            fields: REQUIRED_FIELDS,
            started: false,
        }
    }

    pub fn with_fields(mut self, fields: &'static [FieldLabel]) -> Self {
        self.fields = fields;
        self
    }

    /// 全期間を処理してセッションを閉じる
    pub async fn run(mut self, periods: &[Period]) -> Result<DownloadReport, ScraperError> {
        std::fs::create_dir_all(&self.config.download_path)?;
        info!(
            "Requested {} period(s) into {:?}",
            periods.len(),
            self.config.download_path
        );

        let outcome = self.fetch_all(periods).await;
        let teardown = self.teardown(outcome.is_ok()).await;

        match (outcome, teardown) {
            (Ok(report), Ok(())) => {
                info!(
                    "Done: {} downloaded, {} skipped",
                    report.downloaded.len(),
                    report.skipped.len()
                );
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(teardown_err)) => {
                warn!("Teardown also failed: {}", teardown_err);
                Err(e)
            }
        }
    }

    async fn fetch_all(&mut self, periods: &[Period]) -> Result<DownloadReport, ScraperError> {
        let mut report = DownloadReport::default();

        for &period in periods {
            info!("Retrieving data for {}", period);
            let destination = artifact::canonical_path(&self.config.download_path, period);

            if artifact::is_present(&self.config.download_path, period) {
                info!("... {:?} exists, skipping download", destination);
                report.skipped.push(destination);
                continue;
            }

            if !self.started {
                self.start().await.map_err(|e| e.during(period))?;
            }

            let saved = self
                .fetch_period(period, &destination)
                .await
                .map_err(|e| e.during(period))?;
            info!("... download complete, saved as: {:?}", saved);
            report.downloaded.push(saved);
        }

        Ok(report)
    }

    /// 最初の未取得期間で一度だけセッションを準備する
    async fn start(&mut self) -> Result<(), ScraperError> {
        // initialize が途中で失敗しても close() を呼ぶ
        self.started = true;
        self.session.initialize().await?;
        self.session.check_fields(self.fields).await
    }

    async fn fetch_period(
        &mut self,
        period: Period,
        destination: &Path,
    ) -> Result<PathBuf, ScraperError> {
        self.session.select_period(period).await?;

        info!("... initiating download request for {}", period);
        let timeout = self.config.export_timeout;
        let staged = tokio::time::timeout(timeout, self.session.export())
            .await
            .map_err(|_| {
                ScraperError::Timeout(format!(
                    "エクスポートが{:?}以内に完了しませんでした",
                    timeout
                ))
            })??;

        info!("... saving data from temporary file: {:?}", staged);
        // 正規パスへの配置は最後に行う
        artifact::persist(&staged, destination)
    }

    async fn teardown(&mut self, succeeded: bool) -> Result<(), ScraperError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;

        if succeeded {
            self.session.settle(self.config.drain_delay).await?;
        }
        info!("Closing browser session");
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Initialize,
        CheckFields(usize),
        Select(Period),
        Export,
        Settle,
        Close,
    }

    #[derive(Clone, Copy)]
    enum ExportMode {
        Succeed,
        Hang,
    }

    /// 呼び出しを記録するセッション
    struct RecordingSession {
        calls: Arc<Mutex<Vec<Call>>>,
        staging: PathBuf,
        mode: ExportMode,
        reject_year: Option<i32>,
        missing_field: Option<&'static str>,
        fail_initialize: bool,
        fail_close: bool,
        selected: Option<Period>,
    }

    impl RecordingSession {
        fn new(download_dir: &Path) -> (Self, Arc<Mutex<Vec<Call>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let session = Self {
                calls: calls.clone(),
                staging: artifact::staging_dir(download_dir),
                mode: ExportMode::Succeed,
                reject_year: None,
                missing_field: None,
                fail_initialize: false,
                fail_close: false,
                selected: None,
            };
            (session, calls)
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ExportSession for RecordingSession {
        async fn initialize(&mut self) -> Result<(), ScraperError> {
            self.record(Call::Initialize);
            if self.fail_initialize {
                return Err(ScraperError::BrowserInit("chrome not found".into()));
            }
            std::fs::create_dir_all(&self.staging)?;
            Ok(())
        }

        async fn check_fields(&mut self, fields: &[FieldLabel]) -> Result<(), ScraperError> {
            self.record(Call::CheckFields(fields.len()));
            match self.missing_field {
                Some(label) => Err(ScraperError::FieldNotFound(label.to_string())),
                None => Ok(()),
            }
        }

        async fn select_period(&mut self, period: Period) -> Result<(), ScraperError> {
            self.record(Call::Select(period));
            if self.reject_year == Some(period.year()) {
                return Err(ScraperError::Selection(format!("#cboYear: {}", period.year())));
            }
            self.selected = Some(period);
            Ok(())
        }

        async fn export(&mut self) -> Result<PathBuf, ScraperError> {
            self.record(Call::Export);
            match self.mode {
                ExportMode::Succeed => {
                    let period = self.selected.expect("period selected before export");
                    let staged = self.staging.join(format!("guid-{}", period));
                    std::fs::write(&staged, format!("archive {}", period))?;
                    Ok(staged)
                }
                ExportMode::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("export should have timed out")
                }
            }
        }

        async fn settle(&mut self, _fallback: Duration) -> Result<(), ScraperError> {
            self.record(Call::Settle);
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ScraperError> {
            self.record(Call::Close);
            if self.fail_close {
                return Err(ScraperError::Teardown("browser already gone".into()));
            }
            Ok(())
        }
    }

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn config(dir: &Path) -> DownloaderConfig {
        DownloaderConfig::new(dir)
            .with_export_timeout(Duration::from_millis(200))
            .with_drain_delay(Duration::ZERO)
    }

    fn close_count(calls: &Arc<Mutex<Vec<Call>>>) -> usize {
        calls.lock().unwrap().iter().filter(|c| **c == Call::Close).count()
    }

    #[tokio::test]
    async fn test_fetches_every_missing_period_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (session, calls) = RecordingSession::new(dir.path());
        let periods = vec![p(2022, 1), p(2022, 2)];

        let report = Downloader::new(config(dir.path()), session)
            .run(&periods)
            .await
            .unwrap();

        let january = dir.path().join("bts_airline_ontime_performance_january_2022.zip");
        let february = dir.path().join("bts_airline_ontime_performance_february_2022.zip");
        assert_eq!(report.downloaded, vec![january.clone(), february.clone()]);
        assert!(report.skipped.is_empty());
        assert_eq!(std::fs::read_to_string(&january).unwrap(), "archive 2022-01");
        assert_eq!(std::fs::read_to_string(&february).unwrap(), "archive 2022-02");

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Initialize,
                Call::CheckFields(REQUIRED_FIELDS.len()),
                Call::Select(p(2022, 1)),
                Call::Export,
                Call::Select(p(2022, 2)),
                Call::Export,
                Call::Settle,
                Call::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_existing_artifact_is_skipped_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("bts_airline_ontime_performance_march_2022.zip");
        std::fs::write(&existing, b"previous run").unwrap();
        let (session, calls) = RecordingSession::new(dir.path());

        let report = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 3)])
            .await
            .unwrap();

        assert!(report.downloaded.is_empty());
        assert_eq!(report.skipped, vec![existing.clone()]);
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous run");
        // ブラウザは起動されない
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let periods = vec![p(2021, 12), p(2022, 1)];

        let (session, _) = RecordingSession::new(dir.path());
        Downloader::new(config(dir.path()), session)
            .run(&periods)
            .await
            .unwrap();

        let (session, calls) = RecordingSession::new(dir.path());
        let report = Downloader::new(config(dir.path()), session)
            .run(&periods)
            .await
            .unwrap();

        assert!(report.downloaded.is_empty());
        assert_eq!(report.skipped.len(), 2);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_missing_periods_are_selected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("bts_airline_ontime_performance_january_2022.zip"),
            b"x",
        )
        .unwrap();
        let (session, calls) = RecordingSession::new(dir.path());

        let report = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 1), p(2022, 2)])
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.downloaded.len(), 1);
        let selects: Vec<_> = calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Select(period) => Some(*period),
                _ => None,
            })
            .collect();
        assert_eq!(selects, vec![p(2022, 2)]);
    }

    #[tokio::test]
    async fn test_export_timeout_aborts_and_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.mode = ExportMode::Hang;

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 3), p(2022, 4)])
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(err.to_string().contains("2022-03"));
        assert!(!dir
            .path()
            .join("bts_airline_ontime_performance_march_2022.zip")
            .exists());
        assert_eq!(close_count(&calls), 1);
        // 失敗時は待機しない・後続期間に進まない
        let recorded = calls.lock().unwrap();
        assert!(!recorded.contains(&Call::Settle));
        assert!(!recorded.contains(&Call::Select(p(2022, 4))));
    }

    #[tokio::test]
    async fn test_missing_field_is_fatal_before_any_download() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.missing_field = Some("Div5TailNum");

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 1)])
            .await
            .unwrap_err();

        match &err {
            ScraperError::Period { period, source } => {
                assert_eq!(*period, p(2022, 1));
                match &**source {
                    ScraperError::FieldNotFound(label) => assert_eq!(label, "Div5TailNum"),
                    other => panic!("unexpected source: {other:?}"),
                }
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Initialize,
                Call::CheckFields(REQUIRED_FIELDS.len()),
                Call::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_initialize_failure_still_closes_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.fail_initialize = true;

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 1), p(2022, 2)])
            .await
            .unwrap_err();

        match &err {
            ScraperError::Period { period, source } => {
                assert_eq!(*period, p(2022, 1));
                assert!(matches!(**source, ScraperError::BrowserInit(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(close_count(&calls), 1);
        assert_eq!(*calls.lock().unwrap(), vec![Call::Initialize, Call::Close]);
    }

    #[tokio::test]
    async fn test_close_failure_fails_successful_run() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.fail_close = true;

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 1)])
            .await
            .unwrap_err();

        assert!(matches!(err, ScraperError::Teardown(_)));
        // 取得済みのファイルは残る
        assert!(dir
            .path()
            .join("bts_airline_ontime_performance_january_2022.zip")
            .exists());
        assert_eq!(close_count(&calls), 1);
    }

    #[tokio::test]
    async fn test_close_failure_keeps_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.mode = ExportMode::Hang;
        session.fail_close = true;

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 3)])
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(!matches!(err, ScraperError::Teardown(_)));
        assert_eq!(close_count(&calls), 1);
    }

    #[tokio::test]
    async fn test_selection_failure_keeps_prior_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, calls) = RecordingSession::new(dir.path());
        session.reject_year = Some(2023);

        let err = Downloader::new(config(dir.path()), session)
            .run(&[p(2022, 12), p(2023, 1), p(2023, 2)])
            .await
            .unwrap_err();

        match &err {
            ScraperError::Period { period, source } => {
                assert_eq!(*period, p(2023, 1));
                assert!(matches!(**source, ScraperError::Selection(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(dir
            .path()
            .join("bts_airline_ontime_performance_december_2022.zip")
            .exists());
        assert!(!dir
            .path()
            .join("bts_airline_ontime_performance_january_2023.zip")
            .exists());
        assert_eq!(close_count(&calls), 1);
        assert!(!calls.lock().unwrap().contains(&Call::Select(p(2023, 2))));
    }

    #[tokio::test]
    async fn test_empty_range_creates_directory_only() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("bts-data");
        let (session, calls) = RecordingSession::new(&target);

        let report = Downloader::new(config(&target), session)
            .run(&[])
            .await
            .unwrap();

        assert_eq!(report, DownloadReport::default());
        assert!(target.is_dir());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_field_set_is_applied() {
        static FIELDS: &[FieldLabel] = &[FieldLabel::exact("FlightDate")];
        let dir = tempfile::tempdir().unwrap();
        let (session, calls) = RecordingSession::new(dir.path());

        Downloader::new(config(dir.path()), session)
            .with_fields(FIELDS)
            .run(&[p(2022, 1)])
            .await
            .unwrap();

        assert!(calls.lock().unwrap().contains(&Call::CheckFields(1)));
    }
}
