//! 出力フィールド定義
//!
//! フォーム上のチェックボックスをラベル文字列で特定する。
//! いくつかのフィールドは初期状態でチェック済みのためここには含めない。

/// チェックボックスのラベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLabel {
    pub text: &'static str,
    /// false の場合は大文字小文字を無視した部分一致（一致は1件でなければならない）
    pub exact: bool,
}

impl FieldLabel {
    pub const fn exact(text: &'static str) -> Self {
        Self { text, exact: true }
    }

    pub const fn contains(text: &'static str) -> Self {
        Self { text, exact: false }
    }
}

/// On-Time Performance のダウンロードに必要な全フィールド
pub const REQUIRED_FIELDS: &[FieldLabel] = &[
    FieldLabel::contains("Year"),
    FieldLabel::contains("Quarter"),
    FieldLabel::exact("Month"),
    FieldLabel::contains("DayofMonth"),
    FieldLabel::contains("DayOfWeek"),
    FieldLabel::contains("FlightDate"),
    FieldLabel::exact("Reporting_Airline"),
    FieldLabel::contains("DOT_ID_Reporting_Airline"),
    FieldLabel::contains("IATA_CODE_Reporting_Airline"),
    FieldLabel::contains("Tail_Number"),
    FieldLabel::contains("Flight_Number_Reporting_Airline"),
    FieldLabel::exact("Origin"),
    FieldLabel::contains("OriginCityName"),
    FieldLabel::exact("OriginState"),
    FieldLabel::contains("OriginStateFips"),
    FieldLabel::contains("OriginStateName"),
    FieldLabel::contains("OriginWac"),
    FieldLabel::exact("Dest"),
    FieldLabel::contains("DestCityName"),
    FieldLabel::exact("DestState"),
    FieldLabel::contains("DestStateFips"),
    FieldLabel::contains("DestStateName"),
    FieldLabel::contains("DestWac"),
    FieldLabel::contains("CRSDepTime"),
    FieldLabel::exact("DepTime"),
    FieldLabel::exact("DepDelay"),
    FieldLabel::contains("DepDelayMinutes"),
    FieldLabel::contains("DepDel15"),
    FieldLabel::contains("DepartureDelayGroups"),
    FieldLabel::contains("DepTimeBlk"),
    FieldLabel::contains("TaxiOut"),
    FieldLabel::exact("WheelsOff"),
    FieldLabel::exact("WheelsOn"),
    FieldLabel::contains("TaxiIn"),
    FieldLabel::contains("CRSArrTime"),
    FieldLabel::exact("ArrTime"),
    FieldLabel::exact("ArrDelay"),
    FieldLabel::contains("ArrDelayMinutes"),
    FieldLabel::contains("ArrDel15"),
    FieldLabel::contains("ArrivalDelayGroups"),
    FieldLabel::contains("ArrTimeBlk"),
    FieldLabel::contains("Cancelled"),
    FieldLabel::contains("CancellationCode"),
    FieldLabel::contains("Diverted"),
    FieldLabel::contains("CRSElapsedTime"),
    FieldLabel::exact("ActualElapsedTime"),
    FieldLabel::contains("AirTime"),
    FieldLabel::contains("Flights"),
    FieldLabel::exact("Distance"),
    FieldLabel::contains("DistanceGroup"),
    FieldLabel::contains("CarrierDelay"),
    FieldLabel::contains("WeatherDelay"),
    FieldLabel::contains("NASDelay"),
    FieldLabel::contains("SecurityDelay"),
    FieldLabel::contains("LateAircraftDelay"),
    FieldLabel::contains("FirstDepTime"),
    FieldLabel::contains("TotalAddGTime"),
    FieldLabel::contains("LongestAddGTime"),
    FieldLabel::contains("DivAirportLandings"),
    FieldLabel::contains("DivReachedDest"),
    FieldLabel::contains("DivActualElapsedTime"),
    FieldLabel::contains("DivArrDelay"),
    FieldLabel::contains("DivDistance"),
    FieldLabel::exact("Div1Airport"),
    FieldLabel::contains("Div1AirportID"),
    FieldLabel::contains("Div1AirportSeqID"),
    FieldLabel::contains("Div1WheelsOn"),
    FieldLabel::contains("Div1TotalGTime"),
    FieldLabel::contains("Div1LongestGTime"),
    FieldLabel::contains("Div1WheelsOff"),
    FieldLabel::contains("Div1TailNum"),
    FieldLabel::exact("Div2Airport"),
    FieldLabel::contains("Div2AirportID"),
    FieldLabel::contains("Div2AirportSeqID"),
    FieldLabel::contains("Div2WheelsOn"),
    FieldLabel::contains("Div2TotalGTime"),
    FieldLabel::contains("Div2LongestGTime"),
    FieldLabel::contains("Div2WheelsOff"),
    FieldLabel::contains("Div2TailNum"),
    FieldLabel::exact("Div3Airport"),
    FieldLabel::contains("Div3AirportID"),
    FieldLabel::contains("Div3AirportSeqID"),
    FieldLabel::contains("Div3WheelsOn"),
    FieldLabel::contains("Div3TotalGTime"),
    FieldLabel::contains("Div3LongestGTime"),
    FieldLabel::contains("Div3WheelsOff"),
    FieldLabel::contains("Div3TailNum"),
    FieldLabel::exact("Div4Airport"),
    FieldLabel::contains("Div4AirportID"),
    FieldLabel::contains("Div4AirportSeqID"),
    FieldLabel::contains("Div4WheelsOn"),
    FieldLabel::contains("Div4TotalGTime"),
    FieldLabel::contains("Div4LongestGTime"),
    FieldLabel::contains("Div4WheelsOff"),
    FieldLabel::contains("Div4TailNum"),
    FieldLabel::exact("Div5Airport"),
    FieldLabel::contains("Div5AirportID"),
    FieldLabel::contains("Div5AirportSeqID"),
    FieldLabel::contains("Div5WheelsOn"),
    FieldLabel::contains("Div5TotalGTime"),
    FieldLabel::contains("Div5LongestGTime"),
    FieldLabel::contains("Div5WheelsOff"),
    FieldLabel::contains("Div5TailNum"),
];
