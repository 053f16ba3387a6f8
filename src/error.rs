use std::path::PathBuf;

use thiserror::Error;

use crate::period::Period;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("必須フィールドが見つかりません: {0}")]
    FieldNotFound(String),

    #[error("フィールドが一意に特定できません: {label} ({matches}件一致)")]
    AmbiguousField { label: String, matches: usize },

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("選択エラー: {0}")]
    Selection(String),

    #[error("JavaScriptエラー: {0}")]
    JavaScript(String),

    #[error("ダウンロードエラー: {0}")]
    Download(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("ブラウザ終了エラー: {0}")]
    Teardown(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("アーカイブ読み込みエラー: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("想定外のアーカイブ構成: {path:?} (エントリ数 {entries}, 期待値 1)")]
    ArchiveShape { path: PathBuf, entries: usize },

    #[error("期間指定が不正です: {0}")]
    InvalidPeriod(String),

    #[error("{period} の処理中にエラー: {source}")]
    Period {
        period: Period,
        #[source]
        source: Box<ScraperError>,
    },
}

impl ScraperError {
    /// 期間情報を付与する
    pub fn during(self, period: Period) -> Self {
        match self {
            // 二重に包まない
            err @ ScraperError::Period { .. } => err,
            other => ScraperError::Period {
                period,
                source: Box::new(other),
            },
        }
    }

    /// タイムアウト起因かどうか
    pub fn is_timeout(&self) -> bool {
        match self {
            ScraperError::Timeout(_) => true,
            ScraperError::Period { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
