use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tower::Service;
use tracing::info;

use crate::bts::BtsFormSession;
use crate::config::DownloaderConfig;
use crate::downloader::{DownloadReport, Downloader};
use crate::error::ScraperError;
use crate::period::Period;

/// ダウンロードリクエスト
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub periods: Vec<Period>,
    pub config: DownloaderConfig,
}

impl DownloadRequest {
    pub fn new(periods: Vec<Period>) -> Self {
        Self {
            periods,
            config: DownloaderConfig::default(),
        }
    }

    pub fn with_download_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.download_path = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.config.export_timeout = timeout;
        self
    }

    pub fn with_config(mut self, config: DownloaderConfig) -> Self {
        self.config = config;
        self
    }
}

/// tower::Serviceを実装したダウンロードサービス
///
/// リクエストごとにブラウザを1つ起動し、完了時に必ず閉じる
#[derive(Debug, Clone, Default)]
pub struct DownloadService {}

impl DownloadService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<DownloadRequest> for DownloadService {
    type Response = DownloadReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DownloadRequest) -> Self::Future {
        info!(
            "Download request received: {} period(s), headless={}",
            req.periods.len(),
            req.config.headless
        );

        Box::pin(async move {
            let session = BtsFormSession::new(req.config.clone());
            Downloader::new(req.config, session).run(&req.periods).await
        })
    }
}
