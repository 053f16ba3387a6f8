//! BTS Airline On-Time Performance ダウンローダー
//!
//! - 公開APIのないデータ選択フォームをブラウザで操作し、年月ごとのZIPを取得
//! - 取得済みのファイルはスキップ（再実行で途中から再開できる）
//! - ダウンロード済みZIPからCSVを展開
//!
//! # 使用例
//!
//! ```rust,ignore
//! use bts_downloader::{period, DownloadRequest, DownloadService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = DownloadService::new();
//!
//!     let periods = period::parse_range("2022-01", "2022-02").unwrap();
//!     let request = DownloadRequest::new(periods)
//!         .with_download_path("./bts-data")
//!         .with_headless(true);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("downloaded: {:?}", report.downloaded);
//!
//!     bts_downloader::extract::extract_all("./bts-data".as_ref()).unwrap();
//! }
//! ```

pub mod artifact;
pub mod bts;
pub mod config;
pub mod downloader;
pub mod error;
pub mod extract;
pub mod period;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use bts::{BtsFormSession, FieldLabel, REQUIRED_FIELDS};
pub use config::DownloaderConfig;
pub use downloader::{DownloadReport, Downloader};
pub use error::ScraperError;
pub use period::Period;
pub use service::{DownloadRequest, DownloadService};
pub use traits::ExportSession;
