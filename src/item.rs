use std::cmp::Ordering;

use serde::Serialize;

/// Canonical publication record shared by both pipelines.
///
/// Records are built fresh on every load and never mutated afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub venue: String,
    pub publisher: String,
    pub volume: String,
    pub number: String,
    pub pages: String,
    /// Always a resolvable URL when non-empty.
    pub doi: String,
    pub url: String,
    #[serde(rename = "abstract")]
    pub abstract_: String,
    pub bibtex: String,
}

pub const UNTITLED: &str = "(untitled)";

/// Descending by year (records without one last), then by title ignoring case.
pub fn by_year_then_title(a: &Publication, b: &Publication) -> Ordering {
    match (a.year, b.year) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
}

pub fn sort_publications(list: &mut [Publication]) {
    list.sort_by(by_year_then_title);
}

/// Collapse runs of whitespace to a single space and trim.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
