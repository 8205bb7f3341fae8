//! Local submission filtering.
//!
//! Everything here is pure: the master list is borrowed, never mutated, and
//! the same inputs always give the same output in the same order.

use crate::models::{FilterOptions, FilterSpec, Submission};
use chrono::NaiveDate;
use std::collections::BTreeSet;

// ==============================================================================
// DATE PARSING
// ==============================================================================

const ISO_FORMAT: &str = "%Y-%m-%d";
const SLASH_FORMAT: &str = "%d/%m/%Y";

/// Checks a ten character date layout: digits everywhere except the two
/// separator positions.
fn has_layout(text: &str, separator: u8, positions: [usize; 2]) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| {
            if positions.contains(&i) {
                *b == separator
            } else {
                b.is_ascii_digit()
            }
        })
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    if !has_layout(text, b'-', [4, 7]) {
        return None;
    }
    NaiveDate::parse_from_str(text, ISO_FORMAT).ok()
}

/// `DD/MM/YYYY` with smart day resolution: a day of 29-31 past the end of
/// its month resolves to the month's last day (`31/04/2024` is 2024-04-30).
fn parse_slash(text: &str) -> Option<NaiveDate> {
    if !has_layout(text, b'/', [2, 5]) {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, SLASH_FORMAT) {
        return Some(date);
    }

    let day: u32 = text[0..2].parse().ok()?;
    let month: u32 = text[3..5].parse().ok()?;
    let year: i32 = text[6..10].parse().ok()?;
    if !(29..=31).contains(&day) || !(1..=12).contains(&month) || year < 1 {
        return None;
    }
    (28..day).rev().find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
}

/// Parses a sown date as strict `YYYY-MM-DD`, falling back to `DD/MM/YYYY`.
/// Anything else is unknown.
pub fn parse_sown_date(text: &str) -> Option<NaiveDate> {
    parse_iso(text).or_else(|| parse_slash(text))
}

/// Parses a filter bound. Blank or malformed bounds impose no constraint.
pub fn parse_bound(bound: Option<&str>) -> Option<NaiveDate> {
    bound.filter(|b| !b.trim().is_empty()).and_then(parse_iso)
}

// ==============================================================================
// OPTIONS
// ==============================================================================

fn sorted_distinct<'a, I>(values: I) -> Vec<String>
where
    I: Iterator<Item = Option<&'a str>>,
{
    values
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct non-blank values per dimension, lexicographically sorted.
pub fn derive_options(master: &[Submission]) -> FilterOptions {
    let user_ids: Vec<String> = master
        .iter()
        .filter_map(Submission::user_id_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    FilterOptions {
        user_ids,
        crop_types: sorted_distinct(master.iter().map(|s| Some(s.cultivo.as_str()))),
        crop_statuses: sorted_distinct(master.iter().map(Submission::crop_status)),
    }
}

// ==============================================================================
// PREDICATE
// ==============================================================================

/// A `FilterSpec` with its date bounds resolved once per `apply` call.
struct Predicate<'a> {
    spec: &'a FilterSpec,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl<'a> Predicate<'a> {
    fn new(spec: &'a FilterSpec) -> Self {
        Self {
            spec,
            start: parse_bound(spec.start_date.as_deref()),
            end: parse_bound(spec.end_date.as_deref()),
        }
    }

    fn user_matches(&self, submission: &Submission) -> bool {
        let selected = &self.spec.selected_user_ids;
        selected.is_empty()
            || submission
                .user_id_string()
                .is_some_and(|id| selected.contains(&id))
    }

    fn crop_type_matches(&self, submission: &Submission) -> bool {
        let selected = &self.spec.selected_crop_types;
        selected.is_empty() || selected.contains(&submission.cultivo)
    }

    fn crop_status_matches(&self, submission: &Submission) -> bool {
        let selected = &self.spec.selected_crop_status;
        selected.is_empty()
            || submission
                .crop_status()
                .is_some_and(|status| selected.contains(status))
    }

    fn date_matches(&self, submission: &Submission) -> bool {
        if self.start.is_none() && self.end.is_none() {
            return true;
        }
        let Some(sown) = submission.fecha_siembra.as_deref().and_then(parse_sown_date) else {
            return false;
        };
        let after_start = self.start.map_or(true, |start| sown >= start);
        let before_end = self.end.map_or(true, |end| sown <= end);
        after_start && before_end
    }

    fn matches(&self, submission: &Submission) -> bool {
        self.user_matches(submission)
            && self.crop_type_matches(submission)
            && self.crop_status_matches(submission)
            && self.date_matches(submission)
    }
}

/// Records of `master` satisfying every dimension of `spec`, in master order.
pub fn apply(master: &[Submission], spec: &FilterSpec) -> Vec<Submission> {
    let predicate = Predicate::new(spec);
    master
        .iter()
        .filter(|s| predicate.matches(s))
        .cloned()
        .collect()
}
