use std::path::PathBuf;
use std::time::Duration;

/// BTS データ選択フォーム
pub const BTS_FORM_URL: &str =
    "https://www.transtats.bts.gov/DL_SelectFields.aspx?gnoyr_VQ=FGJ&QO_fu146_anzr=b0-gvzr";

/// エクスポート待機の上限（サーバー側の生成に時間がかかる）
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
/// 終了前の待機（完了通知が得られなかった場合のみ使用）
pub const DEFAULT_DRAIN_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub download_path: PathBuf,
    pub headless: bool,
    pub export_timeout: Duration,
    pub drain_delay: Duration,
    pub form_url: String,
    pub chrome_executable: Option<PathBuf>,
    pub debug: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            download_path: PathBuf::from("bts-data"),
            headless: true,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
            drain_delay: DEFAULT_DRAIN_DELAY,
            form_url: BTS_FORM_URL.to_string(),
            chrome_executable: None,
            debug: false,
        }
    }
}

impl DownloaderConfig {
    pub fn new(download_path: impl Into<PathBuf>) -> Self {
        Self {
            download_path: download_path.into(),
            ..Default::default()
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn with_drain_delay(mut self, delay: Duration) -> Self {
        self.drain_delay = delay;
        self
    }

    pub fn with_form_url(mut self, url: impl Into<String>) -> Self {
        self.form_url = url.into();
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
