//! Raw JSON records to canonical publications.
//!
//! Raw records come from hand-edited data files, so every field may be
//! missing, mistyped or oddly cased. Nothing here fails: a bad field degrades
//! to its empty value and the rest of the record survives.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    doi,
    error::{Error, Result},
    item::{Publication, UNTITLED, normalize_ws, sort_publications},
};

static AUTHOR_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[;,]\s*").unwrap());

/// Parse a JSON document (a list of records, or an object with a
/// `publications` list) into sorted canonical records.
pub fn parse_json(text: &str) -> Result<Vec<Publication>> {
    let value: Value = serde_json::from_str(text)?;
    normalize_all(&value)
}

/// Any other document shape is an error, so callers can fall back.
pub fn normalize_all(document: &Value) -> Result<Vec<Publication>> {
    let records = match document {
        Value::Array(list) => list,
        Value::Object(obj) => match obj.get("publications") {
            Some(Value::Array(list)) => list,
            _ => {
                return Err(Error::Document(
                    "object without a `publications` list".to_string(),
                ));
            }
        },
        other => return Err(Error::Document(format!("top-level {}", json_kind(other)))),
    };
    let empty = Map::new();
    let mut out: Vec<Publication> = records
        .iter()
        .map(|r| normalize(r.as_object().unwrap_or(&empty)))
        .collect();
    sort_publications(&mut out);
    Ok(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn normalize(raw: &Map<String, Value>) -> Publication {
    let text = |key: &str| raw.get(key).map(scalar_text).unwrap_or_default();
    let clean = |key: &str| normalize_ws(&text(key));

    let authors = parse_authors(raw.get("authors"));
    let year = coerce_year(raw.get("year"));
    let kind = match clean("type").to_lowercase() {
        t if t.is_empty() => "misc".to_string(),
        t => t,
    };
    let title = match clean("title") {
        t if t.is_empty() => UNTITLED.to_string(),
        t => t,
    };

    let journal = clean("journal");
    let booktitle = clean("booktitle");
    let venue = [clean("venue"), journal.clone(), booktitle.clone()]
        .into_iter()
        .find(|v| !v.is_empty())
        .unwrap_or_default();

    let id = match clean("id") {
        id if id.is_empty() => derived_key(&authors, year),
        id => id,
    };

    let raw_doi = clean("doi");
    let bibtex = match text("bibtex").trim() {
        "" => {
            let venue_field = if !journal.is_empty() {
                Some(("journal", journal.as_str()))
            } else if !venue.is_empty() {
                Some(("booktitle", venue.as_str()))
            } else {
                None
            };
            minimal_bibtex(&MinimalEntry {
                kind: &kind,
                key: &id,
                title: &title,
                authors: &authors,
                year,
                venue: venue_field,
                doi: &raw_doi,
            })
        }
        bib => bib.to_string(),
    };

    Publication {
        id,
        kind,
        title,
        authors,
        year,
        venue,
        publisher: clean("publisher"),
        volume: clean("volume"),
        number: clean("number"),
        pages: clean("pages"),
        doi: doi::to_resolver_url(&raw_doi),
        url: clean("url"),
        abstract_: clean("abstract"),
        bibtex,
    }
}

/// Text of a scalar JSON value; containers and null read as empty.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn parse_authors(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .map(|a| normalize_ws(&scalar_text(a)))
            .filter(|a| !a.is_empty())
            .collect(),
        Some(Value::String(s)) => AUTHOR_SPLIT_RE
            .split(s.trim())
            .map(normalize_ws)
            .filter(|a| !a.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Integral, non-zero years only.
fn coerce_year(value: Option<&Value>) -> Option<i32> {
    let year = match value? {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 {
                    return None;
                }
                f as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    i32::try_from(year).ok().filter(|y| *y != 0)
}

/// `<first word of first author><year>`, lowercased; `key` without authors.
fn derived_key(authors: &[String], year: Option<i32>) -> String {
    let stem = authors
        .first()
        .and_then(|a| a.split(' ').next())
        .map(str::to_lowercase)
        .unwrap_or_else(|| "key".to_string());
    match year {
        Some(y) => format!("{stem}{y}"),
        None => stem,
    }
}

pub struct MinimalEntry<'a> {
    pub kind: &'a str,
    pub key: &'a str,
    pub title: &'a str,
    pub authors: &'a [String],
    pub year: Option<i32>,
    pub venue: Option<(&'a str, &'a str)>,
    pub doi: &'a str,
}

/// Synthesize a BibTeX entry from canonical fields.
///
/// Values are emitted as-is inside braces; a `}` in a value yields broken BibTeX.
pub fn minimal_bibtex(entry: &MinimalEntry<'_>) -> String {
    let year = entry.year.map(|y| y.to_string()).unwrap_or_default();
    let mut fields = vec![
        format!("title={{{}}}", entry.title),
        format!("author={{{}}}", entry.authors.join(" and ")),
        format!("year={{{year}}}"),
    ];
    if let Some((name, value)) = entry.venue {
        fields.push(format!("{name}={{{value}}}"));
    }
    if !entry.doi.is_empty() {
        fields.push(format!("doi={{{}}}", entry.doi));
    }
    format!(
        "@{}{{{},\n  {}\n}}",
        entry.kind,
        entry.key,
        fields.join(",\n  ")
    )
}
