use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::bts::FieldLabel;
use crate::error::ScraperError;
use crate::period::Period;

/// エクスポートフォームを操作するセッション
///
/// 呼び出し順: initialize → check_fields →（期間ごとに select_period → export）→ settle → close
#[async_trait]
pub trait ExportSession: Send {
    /// ブラウザ起動とフォームへの遷移
    async fn initialize(&mut self) -> Result<(), ScraperError>;

    /// 出力フィールドを全てチェック（1つでも見つからなければエラー）
    async fn check_fields(&mut self, fields: &[FieldLabel]) -> Result<(), ScraperError>;

    /// 年 → 月の順に選択
    async fn select_period(&mut self, period: Period) -> Result<(), ScraperError>;

    /// エクスポートを実行し、完了したファイルの一時パスを返す
    async fn export(&mut self) -> Result<PathBuf, ScraperError>;

    /// 書き込み中のダウンロードが落ち着くまで待機
    async fn settle(&mut self, fallback: Duration) -> Result<(), ScraperError> {
        tokio::time::sleep(fallback).await;
        Ok(())
    }

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;
}
