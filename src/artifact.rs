//! 成果物ファイルの命名・存在確認・配置

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ScraperError;
use crate::period::Period;

const FILE_PREFIX: &str = "bts_airline_ontime_performance";
const STAGING_DIR: &str = ".bts-staging";

/// 期間に対応する正規ファイル名
pub fn canonical_file_name(period: Period) -> String {
    format!(
        "{}_{}_{}.zip",
        FILE_PREFIX,
        period.month_name(),
        period.year()
    )
}

pub fn canonical_path(download_dir: &Path, period: Period) -> PathBuf {
    download_dir.join(canonical_file_name(period))
}

/// 取得済みか確認（存在のみ。内容の検証やロックは行わない）
pub fn is_present(download_dir: &Path, period: Period) -> bool {
    canonical_path(download_dir, period).is_file()
}

/// ブラウザのダウンロード先（出力先と同一ファイルシステム）
pub fn staging_dir(download_dir: &Path) -> PathBuf {
    download_dir.join(STAGING_DIR)
}

/// 一時ファイルを正規パスへ移動
///
/// 同一ファイルシステムでは rename のみ。別デバイスの場合は出力先ディレクトリ内の
/// `.part` にコピーしてから rename するため、正規パスに書きかけのファイルは現れない。
pub fn persist(staged: &Path, destination: &Path) -> Result<PathBuf, ScraperError> {
    if !staged.is_file() {
        return Err(ScraperError::Download(format!(
            "一時ファイルが見つかりません: {:?}",
            staged
        )));
    }

    match std::fs::rename(staged, destination) {
        Ok(()) => {}
        Err(e) => {
            debug!("rename failed ({}), falling back to copy: {:?}", e, staged);
            let partial = destination.with_extension("zip.part");
            std::fs::copy(staged, &partial)?;
            std::fs::rename(&partial, destination)?;
            std::fs::remove_file(staged)?;
        }
    }

    info!("Saved {:?} -> {:?}", staged, destination);
    Ok(destination.to_path_buf())
}
