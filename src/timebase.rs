//! Time base normalization
//!
//! Converts each stream's raw timestamp into integer milliseconds on the
//! stream's elapsed-time axis.
//! - DIY tick counts are re-zeroed at the first reading
//! - Bio clock strings (`h:m:s[.ms]`) are already elapsed and just converted

use crate::error::AlignError;
use crate::types::{RawReading, RawTimestamp, Reading};

/// Time base normalizer
pub struct TimeBase;

impl TimeBase {
    /// Place every reading on the elapsed-time axis.
    ///
    /// Tick timestamps are measured from the first reading's tick. Clock
    /// timestamps are converted as-is. Fails on the first malformed timestamp.
    pub fn normalize(readings: Vec<RawReading>) -> Result<Vec<Reading>, AlignError> {
        let origin = match readings.first().map(|r| &r.timestamp) {
            Some(RawTimestamp::Ticks(tick)) => *tick,
            _ => 0,
        };

        readings
            .into_iter()
            .map(|raw| {
                let elapsed_time = match &raw.timestamp {
                    RawTimestamp::Ticks(tick) => tick.checked_sub(origin).ok_or_else(|| {
                        AlignError::format(&tick.to_string(), "timestamp out of range")
                    })?,
                    RawTimestamp::Clock(clock) => parse_clock_millis(clock)?,
                };
                Ok(Reading {
                    elapsed_time,
                    values: raw.values,
                    labels: raw.labels,
                })
            })
            .collect()
    }
}

/// Parse `hours:minutes:seconds[:thousandths]` (fields split on `:` or `.`)
/// into milliseconds.
pub fn parse_clock_millis(clock: &str) -> Result<i64, AlignError> {
    let fields = clock
        .split([':', '.'])
        .map(|field| {
            field
                .trim()
                .parse::<i64>()
                .map_err(|_| AlignError::format(clock, format!("non-numeric field {field:?}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (hours, minutes, seconds, thousandths) = match fields.as_slice() {
        [h, m, s] => (*h, *m, *s, 0),
        [h, m, s, ms] => (*h, *m, *s, *ms),
        other => {
            return Err(AlignError::format(
                clock,
                format!("expected 3 or 4 fields, found {}", other.len()),
            ))
        }
    };

    hours
        .checked_mul(60)
        .and_then(|v| v.checked_add(minutes))
        .and_then(|v| v.checked_mul(60))
        .and_then(|v| v.checked_add(seconds))
        .and_then(|v| v.checked_mul(1000))
        .and_then(|v| v.checked_add(thousandths))
        .ok_or_else(|| AlignError::format(clock, "timestamp out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(t: i64) -> RawReading {
        RawReading {
            timestamp: RawTimestamp::Ticks(t),
            values: vec![1.0],
            labels: vec!["p1".to_string()],
        }
    }

    fn clock(c: &str) -> RawReading {
        RawReading {
            timestamp: RawTimestamp::Clock(c.to_string()),
            values: vec![0.5],
            labels: Vec::new(),
        }
    }

    #[test]
    fn test_ticks_rezeroed_at_first_reading() {
        let readings = TimeBase::normalize(vec![tick(1_000_250), tick(1_000_300), tick(1_001_250)]).unwrap();
        let elapsed: Vec<i64> = readings.iter().map(|r| r.elapsed_time).collect();
        assert_eq!(elapsed, vec![0, 50, 1000]);
        assert_eq!(readings[0].labels, vec!["p1".to_string()]);
    }

    #[test]
    fn test_clock_with_subseconds() {
        assert_eq!(parse_clock_millis("01:02:03.456").unwrap(), 3_723_456);
        assert_eq!(parse_clock_millis("0:0:55:120").unwrap(), 55_120);
    }

    #[test]
    fn test_clock_without_subseconds() {
        assert_eq!(parse_clock_millis("00:01:05").unwrap(), 65_000);
    }

    #[test]
    fn test_clock_fourth_field_is_literal_thousandths() {
        assert_eq!(parse_clock_millis("00:00:01.5").unwrap(), 1_005);
    }

    #[test]
    fn test_clock_rejects_wrong_field_count() {
        assert!(matches!(parse_clock_millis("00:01"), Err(AlignError::Format { .. })));
        assert!(matches!(parse_clock_millis("0:0:0:0:0"), Err(AlignError::Format { .. })));
    }

    #[test]
    fn test_clock_rejects_non_numeric() {
        assert!(matches!(parse_clock_millis("00:aa:05"), Err(AlignError::Format { .. })));
        assert!(matches!(parse_clock_millis(""), Err(AlignError::Format { .. })));
    }

    #[test]
    fn test_clock_overflow_is_format_error() {
        assert!(matches!(parse_clock_millis("9223372036854775:0:0"), Err(AlignError::Format { .. })));
        assert!(matches!(
            parse_clock_millis("0:0:9223372036854776"),
            Err(AlignError::Format { .. })
        ));
    }

    #[test]
    fn test_tick_span_overflow_is_format_error() {
        let err = TimeBase::normalize(vec![tick(i64::MAX), tick(-10)]).unwrap_err();
        assert!(matches!(err, AlignError::Format { .. }));
    }

    #[test]
    fn test_bio_stream_normalization_keeps_length() {
        let readings = TimeBase::normalize(vec![clock("0:0:0.000"), clock("0:0:0.040"), clock("0:0:0.100")]).unwrap();
        let elapsed: Vec<i64> = readings.iter().map(|r| r.elapsed_time).collect();
        assert_eq!(elapsed, vec![0, 40, 100]);
    }

    #[test]
    fn test_malformed_clock_aborts_stream() {
        assert!(TimeBase::normalize(vec![clock("0:0:1"), clock("bad")]).is_err());
    }

    #[test]
    fn test_empty_stream() {
        assert!(TimeBase::normalize(Vec::new()).unwrap().is_empty());
    }
}
