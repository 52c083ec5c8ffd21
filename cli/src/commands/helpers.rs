use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, TimeZone};

/// Parse a YYYY-MM-DD date (default today) into local-midnight epoch
/// milliseconds, the representation record dates use.
pub(crate) fn parse_date_ms(date: Option<String>) -> Result<i64> {
    let date = match date {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{s}', expected YYYY-MM-DD"))?,
        None => Local::now().date_naive(),
    };
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid date")?;
    let local = Local
        .from_local_datetime(&midnight)
        .earliest()
        .context("Date does not exist in the local timezone")?;
    Ok(local.timestamp_millis())
}

pub(crate) fn format_date_ms(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .earliest()
        .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_round_trips_through_format() {
        let ms = parse_date_ms(Some("2024-03-15".to_string())).unwrap();
        assert_eq!(format_date_ms(ms), "2024-03-15");
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date_ms(Some("15/03/2024".to_string())).is_err());
        assert!(parse_date_ms(Some("not-a-date".to_string())).is_err());
    }

    #[test]
    fn test_parse_date_defaults_to_today() {
        let ms = parse_date_ms(None).unwrap();
        assert_eq!(format_date_ms(ms), Local::now().format("%Y-%m-%d").to_string());
    }
}
