//! Date-Range Resolver - `start_date` / `end_date`

use crate::accumulator::TermGroup;
use crate::predicate::{CompareOp, Predicate};
use crate::registry::DateBound;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::debug;
use trail_foundation::{Error, Result};

/// Bound on `column` from the first included value.
///
/// Later values and negated values are ignored. A malformed date is
/// [`Error::InvalidDate`]; whether that aborts the query is the caller's
/// policy.
pub fn resolve(
    field: &str,
    column: &str,
    bound: DateBound,
    group: &TermGroup,
    offset: FixedOffset,
) -> Result<Predicate> {
    let Some(value) = group.included.first() else {
        debug!(field = %field, "Date field has no included value");
        return Ok(Predicate::True);
    };

    let instant =
        bound_instant(value, bound, offset).ok_or_else(|| Error::invalid_date(field, value))?;

    let op = match bound {
        DateBound::Start => CompareOp::Gte,
        DateBound::End => CompareOp::Lte,
    };
    Ok(Predicate::compare(column, op, instant.timestamp()))
}

/// `YYYY-MM-DD` at 00:00:00 (start) or 23:59:59 (end) local time, as UTC
pub fn bound_instant(value: &str, bound: DateBound, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let date = parse_date(value)?;
    let time = match bound {
        DateBound::Start => NaiveTime::from_hms_opt(0, 0, 0)?,
        DateBound::End => NaiveTime::from_hms_opt(23, 59, 59)?,
    };
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
}

/// Exactly four-digit year, two-digit month and day
fn parse_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_start_of_day() {
        let instant = bound_instant("2024-01-15", DateBound::Start, utc()).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_end_of_day() {
        let instant = bound_instant("2024-01-15", DateBound::End, utc()).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_offset_is_subtracted() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = bound_instant("2024-01-15", DateBound::Start, plus_two).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 14, 22, 0, 0).unwrap());

        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        let instant = bound_instant("2024-01-15", DateBound::End, minus_five).unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2024, 1, 16, 4, 59, 59).unwrap());
    }

    #[test]
    fn test_rejects_malformed_dates() {
        for bad in ["2024-1-15", "15-01-2024", "2024/01/15", "2024-02-30", "yesterday", "20240115"] {
            assert!(bound_instant(bad, DateBound::Start, utc()).is_none(), "{}", bad);
        }
    }

    #[test]
    fn test_first_value_wins() {
        let group = TermGroup::new("start_date")
            .include("2024-01-15")
            .include("2030-01-01");
        let predicate =
            resolve("start_date", "created_timestamp", DateBound::Start, &group, utc()).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().timestamp();
        assert_eq!(
            predicate,
            Predicate::compare("created_timestamp", CompareOp::Gte, expected)
        );
    }

    #[test]
    fn test_invalid_date_error() {
        let group = TermGroup::new("end_date").include("2024-13-01");
        let err = resolve("end_date", "created_timestamp", DateBound::End, &group, utc())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDate { ref field, ref value }
            if field == "end_date" && value == "2024-13-01"));
    }

    #[test]
    fn test_negated_only_is_no_constraint() {
        let group = TermGroup::new("start_date").exclude("2024-01-15");
        let predicate =
            resolve("start_date", "created_timestamp", DateBound::Start, &group, utc()).unwrap();
        assert!(predicate.is_true());
    }
}
