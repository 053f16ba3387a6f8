//! ダウンロード済みZIPからCSVを取り出す
//!
//! 各アーカイブはエントリを1つだけ持つ前提。それ以外は構成エラーとして扱う。

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::ZipArchive;

use crate::error::ScraperError;

/// ディレクトリ内の全ZIPを同名のCSVとして展開
pub fn extract_all(download_dir: &Path) -> Result<Vec<PathBuf>, ScraperError> {
    info!("Extracting csv's from zip files in {:?}", download_dir);

    let mut archives: Vec<PathBuf> = std::fs::read_dir(download_dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|path| path.is_file() && is_zip(path))
        .collect();
    archives.sort();

    let mut written = Vec::with_capacity(archives.len());
    for archive in &archives {
        let csv_path = extract_archive(archive)?;
        info!("... extracted {:?}", csv_path);
        written.push(csv_path);
    }
    Ok(written)
}

fn is_zip(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

/// 唯一のエントリを `<stem>.csv` として隣に書き出す（元のZIPは残す）
pub fn extract_archive(archive_path: &Path) -> Result<PathBuf, ScraperError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    if archive.len() != 1 {
        return Err(ScraperError::ArchiveShape {
            path: archive_path.to_path_buf(),
            entries: archive.len(),
        });
    }

    let csv_path = archive_path.with_extension("csv");
    let dir = csv_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // 同じディレクトリの一時ファイルに書いてから rename
    let mut entry = archive.by_index(0)?;
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    std::io::copy(&mut entry, &mut staged)?;
    staged.flush()?;
    staged
        .persist(&csv_path)
        .map_err(|e| ScraperError::FileIO(e.error))?;

    Ok(csv_path)
}
