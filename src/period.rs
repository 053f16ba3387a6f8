//! 取得対象期間（年月）
//!
//! 日付範囲（`YYYY-MM`）からの昇順列挙と、年の上下限からの降順列挙を提供する

use std::fmt;

use chrono::{Datelike, Month, NaiveDate};

use crate::error::ScraperError;

/// 1か月分の取得単位
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, ScraperError> {
        if !(1..=12).contains(&month) {
            return Err(ScraperError::InvalidPeriod(format!(
                "月は1〜12で指定してください: {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// 英語の月名（小文字）
    pub fn month_name(&self) -> String {
        let month = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .unwrap_or(Month::January);
        month.name().to_lowercase()
    }

    /// `YYYY-MM` または `YYYY-MM-DD` を日付として解釈
    pub fn parse_date(input: &str) -> Result<NaiveDate, ScraperError> {
        let input = input.trim();
        NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", input), "%Y-%m-%d"))
            .map_err(|_| {
                ScraperError::InvalidPeriod(format!("YYYY-MM 形式で指定してください: {}", input))
            })
    }

    fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// 開始日〜終了日に含まれる月初を昇順で列挙
///
/// 開始日が月初でない場合は翌月から始まる。終了日はその月を含む。
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Vec<Period> {
    let mut current = Period {
        year: start.year(),
        month: start.month(),
    };
    if start.day() > 1 {
        current = current.next();
    }
    let last = Period {
        year: end.year(),
        month: end.month(),
    };

    let mut periods = Vec::new();
    while current <= last {
        periods.push(current);
        current = current.next();
    }
    periods
}

/// 文字列の範囲指定から期間を列挙
pub fn parse_range(start: &str, end: &str) -> Result<Vec<Period>, ScraperError> {
    let start = Period::parse_date(start)?;
    let end = Period::parse_date(end)?;
    Ok(month_range(start, end))
}

/// 年の上下限から最新月を先頭に降順で列挙
///
/// 開始年が終了年より後なら空。chrono で扱えない年はエラー。
pub fn years_descending(start_year: i32, end_year: i32) -> Result<Vec<Period>, ScraperError> {
    let supported = NaiveDate::MIN.year()..=NaiveDate::MAX.year();
    for year in [start_year, end_year] {
        if !supported.contains(&year) {
            return Err(ScraperError::InvalidPeriod(format!(
                "対応していない年です: {} ({}〜{})",
                year,
                supported.start(),
                supported.end()
            )));
        }
    }

    Ok((start_year..=end_year)
        .rev()
        .flat_map(|year| (1..=12).rev().map(move |month| Period { year, month }))
        .collect())
}
