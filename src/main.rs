use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use tower::ServiceExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bts_downloader::{
    extract, period, DownloadRequest, DownloadService, DownloaderConfig, Period, ScraperError,
};

/// Airline On-Time Performance data from the Bureau of Transportation Statistics
/// (https://www.transtats.bts.gov/)
#[derive(Debug, Parser)]
#[command(name = "bts-downloader", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download monthly archives between START_DATE and END_DATE (YYYY-MM, inclusive)
    Download {
        start_date: String,
        end_date: String,
        #[command(flatten)]
        options: DownloadOptions,
    },
    /// Download every month of START_YEAR..=END_YEAR, latest month first
    DownloadYears {
        start_year: i32,
        end_year: i32,
        #[command(flatten)]
        options: DownloadOptions,
    },
    /// Extract csv's from downloaded zip files
    Extract {
        #[arg(default_value = "bts-data")]
        download_folder: PathBuf,
    },
}

#[derive(Debug, Args)]
struct DownloadOptions {
    #[arg(long, default_value = "bts-data", value_name = "PATH")]
    download_folder: PathBuf,

    /// Show the browser window
    #[arg(long = "no-headless", action = ArgAction::SetFalse)]
    headless: bool,

    /// Upper bound on a single export, in minutes
    #[arg(long, default_value_t = 20, value_name = "MINUTES")]
    timeout_mins: u64,

    /// Wait before closing the browser, used only when some download never reported completion
    #[arg(long, default_value_t = 60, value_name = "SECONDS")]
    drain_secs: u64,

    /// Chrome/Chromium executable (auto-detected when omitted)
    #[arg(long, value_name = "PATH")]
    chrome: Option<PathBuf>,

    /// Log a screenshot when form setup fails
    #[arg(long)]
    debug: bool,
}

impl DownloadOptions {
    fn into_config(self) -> DownloaderConfig {
        let mut config = DownloaderConfig::new(self.download_folder)
            .with_headless(self.headless)
            .with_export_timeout(Duration::from_secs(self.timeout_mins.saturating_mul(60)))
            .with_drain_delay(Duration::from_secs(self.drain_secs))
            .with_debug(self.debug);
        if let Some(chrome) = self.chrome {
            config = config.with_chrome_executable(chrome);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Download {
            start_date,
            end_date,
            options,
        } => match period::parse_range(&start_date, &end_date) {
            Ok(periods) => download(periods, options).await,
            Err(e) => Err(e),
        },
        Command::DownloadYears {
            start_year,
            end_year,
            options,
        } => match period::years_descending(start_year, end_year) {
            Ok(periods) => download(periods, options).await,
            Err(e) => Err(e),
        },
        Command::Extract { download_folder } => {
            extract::extract_all(&download_folder).map(|written| {
                info!("Extracted {} archive(s)", written.len());
            })
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn download(periods: Vec<Period>, options: DownloadOptions) -> Result<(), ScraperError> {
    let request = DownloadRequest::new(periods).with_config(options.into_config());
    let report = DownloadService::new().oneshot(request).await?;

    for path in &report.downloaded {
        println!("{}", path.display());
    }
    Ok(())
}
