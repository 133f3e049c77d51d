//! Row inclusion policy
//!
//! Decides whether one spreadsheet record yields a certificate. Malformed
//! fields exclude the row with a warning; a score below the configured
//! minimum is a normal "not certified" outcome and is only logged.

use crate::reader::{Field, Record};
use chrono::NaiveDate;

/// Run-level inclusion policy. Date bounds are inclusive at both endpoints.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub min_score: f64,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        FilterPolicy {
            min_score: 80.0,
            date_start: None,
            date_end: None,
        }
    }
}

/// Normalized tuple for a record that passed the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct CertifiedRow {
    pub date: NaiveDate,
    pub score: f64,
    pub name: String,
    pub org_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exclusion {
    /// Unparseable training date. Row-level warning.
    InvalidDate,
    /// Unparseable score. Row-level warning.
    InvalidScore,
    /// Training date outside the configured bounds. Silent skip.
    OutOfRange,
    /// Score below the minimum. Info-level log only, no warning.
    BelowMinimum { name: String, score: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    Certified(CertifiedRow),
    Excluded(Exclusion),
}

impl FilterPolicy {
    pub fn evaluate(&self, record: &Record) -> RowDecision {
        let Some(date) = parse_date(&record.date) else {
            return RowDecision::Excluded(Exclusion::InvalidDate);
        };

        if let Some(start) = self.date_start {
            if date < start {
                return RowDecision::Excluded(Exclusion::OutOfRange);
            }
        }
        if let Some(end) = self.date_end {
            if date > end {
                return RowDecision::Excluded(Exclusion::OutOfRange);
            }
        }

        let Some(score) = parse_score(&record.score) else {
            return RowDecision::Excluded(Exclusion::InvalidScore);
        };

        let name = display_text(&record.name);
        if score < self.min_score {
            return RowDecision::Excluded(Exclusion::BelowMinimum { name, score });
        }

        let email = match display_text(&record.email) {
            s if s.is_empty() => None,
            s => Some(s),
        };

        RowDecision::Certified(CertifiedRow {
            date,
            score,
            name,
            org_id: normalize_org_id(&record.org_id),
            email,
        })
    }
}

/// Text date formats accepted in the date column.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Excel serial day 0 is 1899-12-30 in the 1900 date system.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch")
}

pub fn parse_date(field: &Field) -> Option<NaiveDate> {
    match field {
        Field::Date(date) => Some(*date),
        Field::Number(serial) => {
            // Serial dates exported as plain floats. 2958465 = 9999-12-31.
            if *serial < 1.0 || *serial > 2_958_465.0 {
                return None;
            }
            excel_epoch().checked_add_days(chrono::Days::new(serial.trunc() as u64))
        }
        Field::Text(text) => {
            let text = text.trim();
            for fmt in DATE_FORMATS {
                if fmt.contains("%H") {
                    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, fmt) {
                        return Some(dt.date());
                    }
                } else if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
                    return Some(d);
                }
            }
            None
        }
        Field::Empty | Field::Boolean(_) => None,
    }
}

pub fn parse_score(field: &Field) -> Option<f64> {
    match field {
        Field::Number(v) => Some(*v),
        // Comma decimal separators show up in locale-formatted exports.
        Field::Text(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        Field::Empty | Field::Date(_) | Field::Boolean(_) => None,
    }
}

/// Whole-number identifiers stored as floats become integer text; empty or
/// missing identifiers become the empty string.
pub fn normalize_org_id(field: &Field) -> String {
    match field {
        Field::Empty => String::new(),
        Field::Number(v) if v.fract() == 0.0 => format!("{}", *v as i64),
        Field::Number(v) => v.to_string(),
        Field::Text(s) => s.clone(),
        Field::Date(d) => d.format("%d/%m/%Y").to_string(),
        Field::Boolean(b) => b.to_string(),
    }
}

fn display_text(field: &Field) -> String {
    match field {
        Field::Empty => String::new(),
        Field::Text(s) => s.clone(),
        Field::Number(v) if v.fract() == 0.0 => format!("{}", *v as i64),
        Field::Number(v) => v.to_string(),
        Field::Date(d) => d.format("%d/%m/%Y").to_string(),
        Field::Boolean(b) => b.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: Field, score: Field) -> Record {
        Record {
            row: 2,
            date,
            name: Field::Text("Jane Doe".into()),
            score,
            org_id: Field::Number(212345678.0),
            email: Field::Text("jane@example.com".into()),
        }
    }

    #[test]
    fn certifies_a_clean_row() {
        let policy = FilterPolicy::default();
        let decision = policy.evaluate(&record(
            Field::Text("2025-03-10".into()),
            Field::Number(91.0),
        ));
        match decision {
            RowDecision::Certified(row) => {
                assert_eq!(row.date, date(2025, 3, 10));
                assert_eq!(row.score, 91.0);
                assert_eq!(row.name, "Jane Doe");
                assert_eq!(row.org_id, "212345678");
                assert_eq!(row.email.as_deref(), Some("jane@example.com"));
            }
            other => panic!("expected Certified, got {other:?}"),
        }
    }

    #[test]
    fn invalid_date_excludes_with_warning_reason() {
        let policy = FilterPolicy::default();
        let decision = policy.evaluate(&record(
            Field::Text("not a date".into()),
            Field::Number(95.0),
        ));
        assert_eq!(decision, RowDecision::Excluded(Exclusion::InvalidDate));
    }

    #[test]
    fn invalid_score_excludes_with_warning_reason() {
        let policy = FilterPolicy::default();
        let decision = policy.evaluate(&record(
            Field::Text("2025-03-10".into()),
            Field::Text("n/a".into()),
        ));
        assert_eq!(decision, RowDecision::Excluded(Exclusion::InvalidScore));
    }

    #[test]
    fn below_minimum_carries_name_and_score() {
        let policy = FilterPolicy::default();
        let decision = policy.evaluate(&record(
            Field::Text("2025-03-10".into()),
            Field::Number(50.0),
        ));
        assert_eq!(
            decision,
            RowDecision::Excluded(Exclusion::BelowMinimum {
                name: "Jane Doe".into(),
                score: 50.0
            })
        );
    }

    #[test]
    fn score_equal_to_minimum_is_certified() {
        let policy = FilterPolicy::default();
        let decision = policy.evaluate(&record(
            Field::Text("2025-03-10".into()),
            Field::Number(80.0),
        ));
        assert!(matches!(decision, RowDecision::Certified(_)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let policy = FilterPolicy {
            min_score: 80.0,
            date_start: Some(date(2025, 3, 1)),
            date_end: Some(date(2025, 3, 31)),
        };
        let at = |d: &str| {
            policy.evaluate(&record(Field::Text(d.into()), Field::Number(90.0)))
        };
        assert!(matches!(at("2025-03-01"), RowDecision::Certified(_)));
        assert!(matches!(at("2025-03-31"), RowDecision::Certified(_)));
        assert_eq!(
            at("2025-02-28"),
            RowDecision::Excluded(Exclusion::OutOfRange)
        );
        assert_eq!(
            at("2025-04-01"),
            RowDecision::Excluded(Exclusion::OutOfRange)
        );
    }

    #[test]
    fn serial_dates_decode_against_the_1900_system() {
        // 45718 = 2025-03-02.
        assert_eq!(
            parse_date(&Field::Number(45718.0)),
            Some(date(2025, 3, 2))
        );
        assert_eq!(parse_date(&Field::Number(-3.0)), None);
    }

    #[test]
    fn text_date_formats() {
        assert_eq!(
            parse_date(&Field::Text("10/03/2025".into())),
            Some(date(2025, 3, 10))
        );
        assert_eq!(
            parse_date(&Field::Text("2025-03-10 14:30:00".into())),
            Some(date(2025, 3, 10))
        );
    }

    #[test]
    fn comma_decimal_scores_parse() {
        assert_eq!(parse_score(&Field::Text("87,5".into())), Some(87.5));
        assert_eq!(parse_score(&Field::Empty), None);
    }

    #[test]
    fn org_id_normalization() {
        assert_eq!(normalize_org_id(&Field::Number(212345678.0)), "212345678");
        assert_eq!(normalize_org_id(&Field::Number(1.5)), "1.5");
        assert_eq!(normalize_org_id(&Field::Empty), "");
        assert_eq!(normalize_org_id(&Field::Text("AB-12".into())), "AB-12");
    }
}
