//! Acquisition timestamps and compositing periods. Product filenames embed a
//! 15-character `YYYYMMDDTHHMMSS` token; extraction is strict and fails
//! loudly with `TimestampExtraction` so a file is never silently merged into
//! an arbitrary group.

use crate::types::{TsmError, TsmResult};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Temporal aggregation granularity for compositing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Seasonal,
    Annual,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Seasonal => "seasonal",
            Period::Annual => "annual",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Period {
    type Err = TsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Period::Daily),
            "weekly" => Ok(Period::Weekly),
            "monthly" => Ok(Period::Monthly),
            "seasonal" => Ok(Period::Seasonal),
            "annual" => Ok(Period::Annual),
            other => Err(TsmError::Config(format!(
                "invalid aggregation period '{}', choose daily, weekly, monthly, seasonal or annual",
                other
            ))),
        }
    }
}

/// The date/period bucket a raster is grouped into for compositing.
/// Ordered by period start so emitted composites sort chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AcquisitionKey {
    /// First calendar day of the bucket
    pub start: NaiveDate,
    /// Filename-safe bucket label, e.g. `20180105` or `Winter_2018`
    pub label: String,
}

impl fmt::Display for AcquisitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl AcquisitionKey {
    /// Truncate an acquisition timestamp to the requested granularity
    pub fn for_period(timestamp: NaiveDateTime, period: Period) -> Self {
        let date = timestamp.date();
        match period {
            Period::Daily => Self {
                start: date,
                label: date.format("%Y%m%d").to_string(),
            },
            Period::Weekly => {
                let monday =
                    date - Duration::days(date.weekday().num_days_from_monday() as i64);
                Self {
                    start: monday,
                    label: monday.format("%Y%m%d").to_string(),
                }
            }
            Period::Monthly => {
                let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                    .expect("first of month is always valid");
                Self {
                    start: first,
                    label: first.format("%Y%m").to_string(),
                }
            }
            Period::Seasonal => {
                // December counts toward the following January's winter so a
                // Dec-Feb season forms one contiguous bucket
                let (season, year, start_month, start_year) = match date.month() {
                    12 => ("Winter", date.year() + 1, 12, date.year()),
                    1 | 2 => ("Winter", date.year(), 12, date.year() - 1),
                    3..=5 => ("Spring", date.year(), 3, date.year()),
                    6..=8 => ("Summer", date.year(), 6, date.year()),
                    _ => ("Fall", date.year(), 9, date.year()),
                };
                Self {
                    start: NaiveDate::from_ymd_opt(start_year, start_month, 1)
                        .expect("season start is always valid"),
                    label: format!("{}_{}", season, year),
                }
            }
            Period::Annual => {
                let first = NaiveDate::from_ymd_opt(date.year(), 1, 1)
                    .expect("January 1st is always valid");
                Self {
                    start: first,
                    label: first.format("%Y").to_string(),
                }
            }
        }
    }
}

/// Extract the embedded acquisition timestamp from a product or raster
/// filename. The token must be a full `YYYYMMDDTHHMMSS` group delimited by
/// underscores or the string edges, as in Sentinel-3 product identifiers.
pub fn extract_timestamp(file_name: &str) -> TsmResult<NaiveDateTime> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN
        .get_or_init(|| Regex::new(r"(?:^|_)(20\d{6}T\d{6})(?:[_.]|$)").expect("valid regex"));

    let caps = re
        .captures(file_name)
        .ok_or_else(|| TsmError::TimestampExtraction(file_name.to_string()))?;

    NaiveDateTime::parse_from_str(&caps[1], "%Y%m%dT%H%M%S")
        .map_err(|_| TsmError::TimestampExtraction(file_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_timestamp_from_product_name() {
        let ts = extract_timestamp(
            "TSM_S3A_OL_2_WFR____20180105T093000_20180105T093300_0179_026_364_2160.SEN3.tif",
        )
        .unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2018, 1, 5).unwrap());
        assert_eq!(ts.format("%H%M%S").to_string(), "093000");
    }

    #[test]
    fn test_extraction_fails_loudly() {
        for name in ["TSM_no_token.tif", "TSM_2018_partial.tif", "TSM_20180105T09.tif"] {
            let err = extract_timestamp(name).unwrap_err();
            assert!(matches!(err, TsmError::TimestampExtraction(_)));
        }
    }

    fn key(date: &str, period: Period) -> AcquisitionKey {
        let ts = NaiveDateTime::parse_from_str(date, "%Y%m%dT%H%M%S").unwrap();
        AcquisitionKey::for_period(ts, period)
    }

    #[test]
    fn test_daily_key() {
        assert_eq!(key("20180105T093000", Period::Daily).label, "20180105");
    }

    #[test]
    fn test_weekly_key_is_iso_monday() {
        // 2018-01-05 is a Friday; its ISO week starts Monday 2018-01-01
        let k = key("20180105T093000", Period::Weekly);
        assert_eq!(k.label, "20180101");
        // A Sunday maps back to the same Monday
        assert_eq!(key("20180107T000000", Period::Weekly).label, "20180101");
    }

    #[test]
    fn test_monthly_and_annual_keys() {
        assert_eq!(key("20180915T120000", Period::Monthly).label, "201809");
        assert_eq!(key("20180915T120000", Period::Annual).label, "2018");
    }

    #[test]
    fn test_seasonal_keys() {
        assert_eq!(key("20180105T093000", Period::Seasonal).label, "Winter_2018");
        assert_eq!(key("20181215T093000", Period::Seasonal).label, "Winter_2019");
        assert_eq!(key("20180401T000000", Period::Seasonal).label, "Spring_2018");
        assert_eq!(key("20180701T000000", Period::Seasonal).label, "Summer_2018");
        assert_eq!(key("20181001T000000", Period::Seasonal).label, "Fall_2018");
    }

    #[test]
    fn test_december_and_january_share_a_winter_bucket() {
        let dec = key("20181215T000000", Period::Seasonal);
        let jan = key("20190110T000000", Period::Seasonal);
        assert_eq!(dec, jan);
        assert_eq!(dec.start, NaiveDate::from_ymd_opt(2018, 12, 1).unwrap());
    }

    #[test]
    fn test_period_from_str() {
        assert_eq!("daily".parse::<Period>().unwrap(), Period::Daily);
        assert_eq!("Seasonal".parse::<Period>().unwrap(), Period::Seasonal);
        assert!("hourly".parse::<Period>().is_err());
    }
}
