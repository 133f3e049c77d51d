//! Certificate job derived from a certified record

use chrono::{Datelike, NaiveDate};

/// Per-row payload consumed by the template engine. Created transiently for
/// each certified record, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateJob {
    pub name: String,
    pub title: String,
    /// Training date, dd/mm/YYYY.
    pub training_date: String,
    /// Edition date with ordinal suffix, e.g. "3rd March 2025".
    pub edition_date: String,
    pub org_id: String,
    pub email: Option<String>,
}

impl CertificateJob {
    pub fn new(
        name: String,
        title: String,
        training_date: NaiveDate,
        edition_date: NaiveDate,
        org_id: String,
        email: Option<String>,
    ) -> Self {
        CertificateJob {
            name,
            title,
            training_date: training_date.format("%d/%m/%Y").to_string(),
            edition_date: format_date_with_suffix(edition_date),
            org_id,
            email,
        }
    }
}

/// "1st January 2025", "22nd March 2025", "13th April 2025".
pub fn format_date_with_suffix(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match day {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{}{} {}", day, suffix, date.format("%B %Y"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(format_date_with_suffix(date(2025, 1, 1)), "1st January 2025");
        assert_eq!(format_date_with_suffix(date(2025, 3, 22)), "22nd March 2025");
        assert_eq!(format_date_with_suffix(date(2025, 5, 23)), "23rd May 2025");
        assert_eq!(format_date_with_suffix(date(2025, 8, 25)), "25th August 2025");
        // Teens always take "th", including 11th/12th/13th.
        assert_eq!(format_date_with_suffix(date(2025, 4, 11)), "11th April 2025");
        assert_eq!(format_date_with_suffix(date(2025, 4, 12)), "12th April 2025");
        assert_eq!(format_date_with_suffix(date(2025, 4, 13)), "13th April 2025");
        assert_eq!(format_date_with_suffix(date(2025, 4, 21)), "21st April 2025");
    }

    #[test]
    fn job_formats_training_date() {
        let job = CertificateJob::new(
            "Jane Doe".into(),
            "Safety Level 3".into(),
            date(2025, 3, 7),
            date(2025, 8, 25),
            "212345678".into(),
            Some("jane@example.com".into()),
        );
        assert_eq!(job.training_date, "07/03/2025");
        assert_eq!(job.edition_date, "25th August 2025");
    }
}
