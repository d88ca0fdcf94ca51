// piiscan-core/src/engines/detectors.rs
//! Built-in detectors that run after the custom rules.
//!
//! The private-identifier detector looks for ten-digit numbers whose first six
//! digits form a real `ddMMyy` date of birth. The postcode detector recognises UK
//! postcodes. Five independent date-shape detectors look for dates written in
//! text; their matches may overlap and are reported as-is.
//!
//! License: MIT OR APACHE 2.0

use chrono::NaiveDate;
use log::error;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::failure::{Classification, FailurePart};

fn build(pattern: &str, case_insensitive: bool) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .unwrap_or_else(|e| {
            error!("Built-in detector pattern failed to compile, detector disabled: {}", e);
            // matches nothing
            Regex::new("$^").unwrap_or_else(|_| unreachable!())
        })
}

static PRIVATE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| build(r"\b[0-3][0-9][0-1][0-9][0-9]{6}\b", false));

static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    build(
        r"\b((GIR 0AA)|((([A-Z--QVX][0-9][0-9]?)|(([A-Z--QVX][A-Z--IJZ][0-9][0-9]?)|(([A-Z--QVX][0-9][A-HJKSTUW])|([A-Z--QVX][A-Z--IJZ][0-9][ABEHMNPRVWXY]))))\s?[0-9][A-Z--CIKMOV]{2}))\b",
        true,
    )
});

const DAY: &str = "(3[01]|[12][0-9]|0?[1-9])";
const MONTH: &str = "(1[0-2]|0?[1-9])";
const SEP: &str = "[ ]?[/-][ ]?";
const MONTH_NAMES: &str = r"((Jan(uary)?)|(Feb(ruary)?)|(Mar(ch)?)|(Apr(il)?)|(May)|(June?)|(July?)|(Aug(ust)?)|(Sep(tember)?)|(Oct(ober)?)|(Nov(ember)?)|(Dec(ember)?))";

/// Day and month in either order, separated by `/` or `-`.
fn day_and_month() -> String {
    format!("(?:{m}{s}{d}|{d}{s}{m})", m = MONTH, d = DAY, s = SEP)
}

static DATE_YEAR_FIRST: Lazy<Regex> = Lazy::new(|| {
    build(
        &format!(r"\b(?:[0-9]{{2}})?[0-9]{{2}}{}{}(\b|T)", SEP, day_and_month()),
        false,
    )
});

static DATE_YEAR_LAST: Lazy<Regex> = Lazy::new(|| {
    build(
        &format!(r"\b{}{}(?:[0-9]{{2}})?[0-9]{{2}}(\b|T)", day_and_month(), SEP),
        false,
    )
});

static DATE_YEAR_MISSING: Lazy<Regex> = Lazy::new(|| build(&format!(r"\b{}(\b|T)", day_and_month()), false));

static SYMBOL_THEN_MONTH: Lazy<Regex> =
    Lazy::new(|| build(&format!(r"\d+((th)|(rd)|(st)|[\-/\\])?\s?{}", MONTH_NAMES), true));

static MONTH_THEN_SYMBOL: Lazy<Regex> =
    Lazy::new(|| build(&format!(r"{}[\s\-/\\]?\d+((th)|(rd)|(st))?", MONTH_NAMES), true));

/// Two-digit years 00-29 are read as 20xx, 30-99 as 19xx.
fn two_digit_year(yy: i32) -> i32 {
    if yy < 30 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// True when `digits` starts with six ASCII digits forming a valid `ddMMyy` date.
pub fn is_valid_ddmmyy(digits: &str) -> bool {
    let Some(prefix) = digits.get(..6) else { return false };
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (Ok(day), Ok(month), Ok(year)) = (
        prefix[0..2].parse::<u32>(),
        prefix[2..4].parse::<u32>(),
        prefix[4..6].parse::<i32>(),
    ) else {
        return false;
    };
    NaiveDate::from_ymd_opt(two_digit_year(year), month, day).is_some()
}

fn collect(regex: &Regex, value: &str, classification: Classification, trim: bool, out: &mut Vec<FailurePart>) {
    for m in regex.find_iter(value) {
        let word = if trim { m.as_str().trim_end() } else { m.as_str() };
        out.push(FailurePart::from_byte_match(value, word, m.start(), classification));
    }
}

/// Which optional detectors are switched off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorSettings {
    pub ignore_postcodes: bool,
    pub ignore_dates_in_text: bool,
}

/// Runs every enabled detector over `value`, in a fixed order.
pub fn detect(value: &str, settings: DetectorSettings) -> Vec<FailurePart> {
    let mut parts: Vec<FailurePart> = PRIVATE_IDENTIFIER
        .find_iter(value)
        .filter(|m| is_valid_ddmmyy(m.as_str()))
        .map(|m| FailurePart::from_byte_match(value, m.as_str(), m.start(), Classification::PrivateIdentifier))
        .collect();

    if !settings.ignore_postcodes {
        collect(&POSTCODE, value, Classification::Postcode, false, &mut parts);
    }

    if !settings.ignore_dates_in_text {
        for regex in [
            &*DATE_YEAR_FIRST,
            &*DATE_YEAR_LAST,
            &*DATE_YEAR_MISSING,
            &*SYMBOL_THEN_MONTH,
            &*MONTH_THEN_SYMBOL,
        ] {
            collect(regex, value, Classification::Date, true, &mut parts);
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(parts: &[FailurePart], classification: Classification) -> Vec<&str> {
        parts
            .iter()
            .filter(|p| p.classification == classification)
            .map(|p| p.word.as_str())
            .collect()
    }

    #[test]
    fn test_ddmmyy_validation() {
        assert!(is_valid_ddmmyy("010101"));
        assert!(is_valid_ddmmyy("290200")); // 2000 is a leap year
        assert!(!is_valid_ddmmyy("290281"));
        assert!(!is_valid_ddmmyy("321299"));
        assert!(!is_valid_ddmmyy("01a101"));
        assert!(!is_valid_ddmmyy("0101"));
    }

    #[test]
    fn test_private_identifier_requires_valid_date() {
        let parts = detect("hey there,0101010101 excited to see you", DetectorSettings::default());
        assert_eq!(
            parts,
            vec![FailurePart::new("0101010101", Classification::PrivateIdentifier, 10)]
        );
        assert!(detect("2902810123", DetectorSettings::default()).is_empty());
    }

    #[test]
    fn test_postcode_detection_and_toggle() {
        let parts = detect("Patient lives at DD3 7LB", DetectorSettings::default());
        assert_eq!(parts, vec![FailurePart::new("DD3 7LB", Classification::Postcode, 17)]);

        let lower = detect("moved to dd3 7lb", DetectorSettings::default());
        assert_eq!(words(&lower, Classification::Postcode), vec!["dd3 7lb"]);

        let settings = DetectorSettings {
            ignore_postcodes: true,
            ..Default::default()
        };
        assert!(detect("Patient lives at DD3 7LB", settings).is_empty());
    }

    #[test]
    fn test_postcode_excludes_invalid_letters() {
        // Q is never a valid first letter
        assert!(words(&detect("QD3 7LB", DetectorSettings::default()), Classification::Postcode).is_empty());
    }

    #[test]
    fn test_date_shapes() {
        let settings = DetectorSettings::default();
        assert!(words(&detect("seen on 2001-12-25", settings), Classification::Date).contains(&"2001-12-25"));
        assert!(words(&detect("seen on 25/12/2001", settings), Classification::Date).contains(&"25/12/2001"));
        assert!(words(&detect("seen on 25/12", settings), Classification::Date).contains(&"25/12"));
        assert!(words(&detect("born 3rd March", settings), Classification::Date).contains(&"3rd March"));
        assert!(words(&detect("born March 3rd", settings), Classification::Date).contains(&"March 3rd"));
    }

    #[test]
    fn test_date_detectors_can_be_disabled() {
        let settings = DetectorSettings {
            ignore_dates_in_text: true,
            ..Default::default()
        };
        assert!(detect("born March 3rd on 25/12/2001", settings).is_empty());
    }
}
