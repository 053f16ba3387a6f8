//! BTS フォームセッション実装
//!
//! ブラウザ1プロセス・1ページを実行全体で使い回す

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::artifact;
use crate::config::DownloaderConfig;
use crate::error::ScraperError;
use crate::period::Period;
use crate::traits::ExportSession;

use super::fields::FieldLabel;

const YEAR_SELECTOR: &str = "#cboYear";
const MONTH_SELECTOR: &str = "#cboPeriod";
const TRIGGER_LABEL: &str = "Download";
/// 選択後のポストバック待ち
const SELECT_SETTLE_MS: u64 = 500;

/// BTS データ選択フォームのセッション
pub struct BtsFormSession {
    config: DownloaderConfig,
    staging_dir: PathBuf,
    browser: Option<Browser>,
    page: Option<Arc<Page>>,
    handler_task: Option<JoinHandle<()>>,
    /// 開始済みで完了通知を受けていないダウンロード (GUID)
    in_flight: HashSet<String>,
}

impl BtsFormSession {
    pub fn new(config: DownloaderConfig) -> Self {
        let staging_dir = artifact::staging_dir(&config.download_path);
        Self {
            config,
            staging_dir,
            browser: None,
            page: None,
            handler_task: None,
            in_flight: HashSet::new(),
        }
    }

    fn get_page(&self) -> Result<&Arc<Page>, ScraperError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScraperError::BrowserInit("ブラウザが初期化されていません".into()))
    }

    async fn launch(&mut self) -> Result<Arc<Page>, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .no_sandbox()
            .request_timeout(Duration::from_secs(60))
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        self.handler_task = Some(tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        }));

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()));
        // 以降で失敗しても close() で確実に終了できるよう先に保持する
        self.browser = Some(browser);
        let page = Arc::new(page?);
        self.page = Some(page.clone());
        Ok(page)
    }

    async fn enable_downloads(&self, page: &Page) -> Result<(), ScraperError> {
        std::fs::create_dir_all(&self.staging_dir)?;
        let staging = self
            .staging_dir
            .canonicalize()
            .unwrap_or_else(|_| self.staging_dir.clone());

        // GUID名で保存し、進捗イベントを受け取る
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ダウンロード設定エラー: {}", e)))?;

        page.execute(params)
            .await
            .map_err(|e| ScraperError::BrowserInit(format!("ダウンロード設定エラー: {}", e)))?;

        debug!("Download staging directory: {:?}", staging);
        Ok(())
    }

    async fn check_field(&self, page: &Page, field: &FieldLabel) -> Result<(), ScraperError> {
        let result: i64 = page
            .evaluate(check_field_script(field).as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        match result {
            1 => {
                debug!("Checked field: {}", field.text);
                Ok(())
            }
            0 => Err(ScraperError::FieldNotFound(field.text.to_string())),
            n if n > 1 => Err(ScraperError::AmbiguousField {
                label: field.text.to_string(),
                matches: n as usize,
            }),
            _ => Err(ScraperError::Selection(format!(
                "チェックできませんでした: {}",
                field.text
            ))),
        }
    }

    async fn select_option(
        &self,
        page: &Page,
        selector: &str,
        value: &str,
    ) -> Result<(), ScraperError> {
        let outcome: String = page
            .evaluate(select_option_script(selector, value).as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;

        match outcome.as_str() {
            "ok" => {
                sleep(Duration::from_millis(SELECT_SETTLE_MS)).await;
                Ok(())
            }
            "missing" => Err(ScraperError::ElementNotFound(selector.to_string())),
            other => Err(ScraperError::Selection(format!(
                "{} に {} を選択できません ({})",
                selector, value, other
            ))),
        }
    }

    /// デバッグスクリーンショット
    async fn log_screenshot(&self, page: &Page) {
        if !self.config.debug {
            return;
        }
        match page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(screenshot) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&screenshot);
                debug!("Form screenshot: data:image/png;base64,{}", encoded);
            }
            Err(e) => debug!("Failed to capture screenshot: {}", e),
        }
    }

    /// 他のダウンロードの進捗を記録する（完了通知のないものは settle で待つ）
    fn note_progress(&mut self, guid: &str, state: &DownloadProgressState) {
        match state {
            DownloadProgressState::InProgress => {
                self.in_flight.insert(guid.to_string());
            }
            _ => {
                self.in_flight.remove(guid);
            }
        }
    }

    fn clear_staging(&self) {
        if !self.staging_dir.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.staging_dir) {
            warn!("Failed to remove staging directory {:?}: {}", self.staging_dir, e);
        }
    }
}

#[async_trait]
impl ExportSession for BtsFormSession {
    async fn initialize(&mut self) -> Result<(), ScraperError> {
        info!(
            "Launching browser (headless={})...",
            self.config.headless
        );
        let page = self.launch().await?;
        self.enable_downloads(&page).await?;

        page.goto(self.config.form_url.as_str())
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        info!("Opened form: {}", self.config.form_url);
        Ok(())
    }

    async fn check_fields(&mut self, fields: &[FieldLabel]) -> Result<(), ScraperError> {
        let page = self.get_page()?.clone();
        info!("Checking {} output fields...", fields.len());

        for field in fields {
            if let Err(e) = self.check_field(&page, field).await {
                self.log_screenshot(&page).await;
                return Err(e);
            }
        }

        info!("All output fields checked");
        Ok(())
    }

    async fn select_period(&mut self, period: Period) -> Result<(), ScraperError> {
        let page = self.get_page()?.clone();

        self.select_option(&page, YEAR_SELECTOR, &period.year().to_string())
            .await?;
        self.select_option(&page, MONTH_SELECTOR, &period.month().to_string())
            .await?;

        debug!("Selected {}", period);
        Ok(())
    }

    async fn export(&mut self) -> Result<PathBuf, ScraperError> {
        let page = self.get_page()?.clone();

        // クリック前に購読しておく
        let mut will_begin = page
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(|e| ScraperError::Download(format!("イベント購読エラー: {}", e)))?;
        let mut progress = page
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(|e| ScraperError::Download(format!("イベント購読エラー: {}", e)))?;

        let clicked: bool = page
            .evaluate(trigger_script(TRIGGER_LABEL).as_str())
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?
            .into_value()
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        if !clicked {
            return Err(ScraperError::ElementNotFound(format!(
                "{} ボタン",
                TRIGGER_LABEL
            )));
        }

        let begin = will_begin
            .next()
            .await
            .ok_or_else(|| ScraperError::Download("ダウンロード開始イベントを受信できません".into()))?;
        info!(
            "Export started: {} (guid={})",
            begin.suggested_filename, begin.guid
        );
        self.in_flight.insert(begin.guid.clone());

        while let Some(event) = progress.next().await {
            if event.guid != begin.guid {
                self.note_progress(&event.guid, &event.state);
                continue;
            }
            match event.state {
                DownloadProgressState::Completed => {
                    self.in_flight.remove(&begin.guid);
                    let staged = self.staging_dir.join(&begin.guid);
                    info!(
                        "Export finished: {} bytes -> {:?}",
                        event.received_bytes, staged
                    );
                    return Ok(staged);
                }
                DownloadProgressState::Canceled => {
                    self.in_flight.remove(&begin.guid);
                    return Err(ScraperError::Download(format!(
                        "ダウンロードがキャンセルされました: {}",
                        begin.suggested_filename
                    )));
                }
                _ => debug!(
                    "Download progress: {}/{} bytes",
                    event.received_bytes, event.total_bytes
                ),
            }
        }

        Err(ScraperError::Download(
            "ダウンロード完了前にイベントストリームが終了しました".into(),
        ))
    }

    async fn settle(&mut self, fallback: Duration) -> Result<(), ScraperError> {
        if self.in_flight.is_empty() {
            debug!("All downloads confirmed complete");
            return Ok(());
        }

        warn!(
            "{} download(s) unconfirmed, waiting {:?} before closing",
            self.in_flight.len(),
            fallback
        );
        sleep(fallback).await;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.page = None;
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        info!("Closing browser...");

        let mut result = Ok(());
        if let Err(e) = browser.close().await {
            warn!("Browser close failed, killing process: {}", e);
            if let Some(Err(kill_err)) = browser.kill().await {
                result = Err(ScraperError::Teardown(kill_err.to_string()));
            }
        }
        if let Err(e) = browser.wait().await {
            debug!("Failed to wait for browser process: {}", e);
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        self.in_flight.clear();
        self.clear_staging();

        info!("Browser closed");
        result
    }
}

impl Drop for BtsFormSession {
    fn drop(&mut self) {
        // Browser の Drop がプロセスを終了させる
        if self.browser.is_some() {
            warn!("Form session dropped without close(); browser process will be killed");
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

/// JS文字列リテラル
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// ラベルに対応するチェックボックスをチェックする
///
/// 戻り値: 1 = チェック済み, 0 = 見つからない, 2以上 = 一致数, -1 = チェック不可
fn check_field_script(field: &FieldLabel) -> String {
    format!(
        r#"
        (function() {{
            var wanted = {label};
            var exact = {exact};
            var norm = function(s) {{ return (s || '').replace(/\s+/g, ' ').trim(); }};
            var hit = function(text) {{
                text = norm(text);
                if (exact) return text === wanted;
                return text.toLowerCase().indexOf(wanted.toLowerCase()) >= 0;
            }};
            var matches = [];
            var add = function(input) {{
                if (input && input.type === 'checkbox' && matches.indexOf(input) < 0) {{
                    matches.push(input);
                }}
            }};
            var labels = document.querySelectorAll('label');
            for (var i = 0; i < labels.length; i++) {{
                if (!hit(labels[i].textContent)) continue;
                var input = labels[i].control
                    || (labels[i].htmlFor ? document.getElementById(labels[i].htmlFor) : null)
                    || labels[i].querySelector('input');
                add(input);
            }}
            var aria = document.querySelectorAll('input[type=checkbox][aria-label]');
            for (var j = 0; j < aria.length; j++) {{
                if (hit(aria[j].getAttribute('aria-label'))) add(aria[j]);
            }}
            if (matches.length !== 1) return matches.length;
            if (!matches[0].checked) matches[0].click();
            return matches[0].checked ? 1 : -1;
        }})()
        "#,
        label = js_string(field.text),
        exact = field.exact,
    )
}

/// select要素の値を設定する
///
/// 戻り値: "ok" / "missing" / "rejected" / "disabled"
fn select_option_script(selector: &str, value: &str) -> String {
    format!(
        r#"
        (function() {{
            var select = document.querySelector({selector});
            if (!select) return 'missing';
            var value = {value};
            var option = null;
            for (var i = 0; i < select.options.length; i++) {{
                var o = select.options[i];
                if (o.value === value || o.textContent.trim() === value) {{
                    option = o;
                    break;
                }}
            }}
            if (!option) return 'rejected';
            if (option.disabled) return 'disabled';
            select.value = option.value;
            select.dispatchEvent(new Event('input', {{ bubbles: true }}));
            select.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return select.value === option.value ? 'ok' : 'rejected';
        }})()
        "#,
        selector = js_string(selector),
        value = js_string(value),
    )
}

/// エクスポートボタンをクリックする
fn trigger_script(label: &str) -> String {
    format!(
        r#"
        (function() {{
            var wanted = {label};
            var candidates = document.querySelectorAll(
                'button, input[type=button], input[type=submit]');
            for (var i = 0; i < candidates.length; i++) {{
                var el = candidates[i];
                var text = (el.tagName === 'INPUT' ? el.value : el.textContent) || '';
                if (text.trim() === wanted) {{
                    el.click();
                    return true;
                }}
            }}
            return false;
        }})()
        "#,
        label = js_string(label),
    )
}
