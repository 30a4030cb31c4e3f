use std::collections::BTreeMap;

use biblatex::{Field, Pair, RawBibliography, RawChunk};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::{
    doi,
    error::{Error, Result},
    item::{Publication, UNTITLED, normalize_ws},
};

/// A parsed BibTeX entry before normalization: entry type, citation key and
/// verbatim tag values keyed by lowercase tag name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub entry_type: String,
    pub key: String,
    pub tags: BTreeMap<String, String>,
}

impl RawEntry {
    fn tag(&self, name: &str) -> &str {
        self.tags.get(name).map(String::as_str).unwrap_or("")
    }

    /// Entry type and tag values exactly as written, with `@string`
    /// abbreviations expanded.
    fn resolve(entry: &biblatex::RawEntry<'_>, strings: &[Pair<'_>]) -> Self {
        RawEntry {
            entry_type: entry.kind.v.to_lowercase(),
            key: entry.key.v.to_string(),
            tags: entry
                .fields
                .iter()
                .map(|pair| (pair.key.v.to_lowercase(), field_text(&pair.value.v, strings, 0)))
                .collect(),
        }
    }
}

/// Nesting limit for abbreviations defined in terms of other abbreviations.
const MAX_STRING_DEPTH: usize = 8;

/// Concatenate the parts of a field value. An abbreviation with no `@string`
/// definition reads as its own name, so `journal = EJOR` yields `EJOR`.
fn field_text(field: &Field<'_>, strings: &[Pair<'_>], depth: usize) -> String {
    field
        .iter()
        .map(|chunk| match chunk.v {
            RawChunk::Normal(text) => text.to_string(),
            RawChunk::Abbreviation(name) => strings
                .iter()
                .rev()
                .find(|def| def.key.v.eq_ignore_ascii_case(name))
                .filter(|_| depth < MAX_STRING_DEPTH)
                .map(|def| field_text(&def.value.v, strings, depth + 1))
                .unwrap_or_else(|| name.to_string()),
        })
        .collect()
}

/// Display grouping for BibTeX-sourced publications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Journals,
    Intl,
    National,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Journals, Bucket::Intl, Bucket::National];

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Journals => "journals",
            Bucket::Intl => "intl",
            Bucket::National => "national",
        }
    }

    /// Page element the bucket renders into.
    pub fn container_id(self) -> &'static str {
        match self {
            Bucket::Journals => "list-journals",
            Bucket::Intl => "list-intl",
            Bucket::National => "list-national",
        }
    }
}

pub fn classify(entry_type: &str, language: &str) -> Bucket {
    match entry_type.to_lowercase().as_str() {
        "article" => Bucket::Journals,
        "inproceedings" if language.to_lowercase().contains("french") => Bucket::National,
        _ => Bucket::Intl,
    }
}

pub fn classify_entry(entry: &RawEntry) -> Bucket {
    classify(&entry.entry_type, entry.tag("language"))
}

static BARE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=(\s*)(https?://[^\s,}]+)").unwrap());
static DOI_URL_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)doi\s*=\s*\{\s*https?://(?:dx\.)?doi\.org/").unwrap()
});

/// Text repairs applied once when a strict parse fails.
fn cleanup(text: &str) -> String {
    // Wrap bare URL values in braces.
    let text = BARE_URL_RE.replace_all(text, "=${1}{${2}}");
    // Keep only the DOI itself inside doi fields.
    DOI_URL_PREFIX_RE
        .replace_all(&text, "doi = {")
        .into_owned()
}

fn parse_strict(text: &str) -> std::result::Result<Vec<RawEntry>, String> {
    let bib = RawBibliography::parse(text).map_err(|e| e.to_string())?;
    Ok(bib
        .entries
        .iter()
        .map(|entry| RawEntry::resolve(&entry.v, &bib.abbreviations))
        .collect())
}

/// Parse BibTeX text, retrying once on a cleaned-up copy if the strict parse fails.
pub fn parse_bibliography(text: &str) -> Result<Vec<RawEntry>> {
    match parse_strict(text) {
        Ok(entries) => Ok(entries),
        Err(err) => {
            warn!(error = %err, "strict BibTeX parse failed, retrying after cleanup");
            let entries = parse_strict(&cleanup(text)).map_err(Error::Parse)?;
            debug!(count = entries.len(), "cleanup parse succeeded");
            Ok(entries)
        }
    }
}

/// Re-serialize an entry for the copy control.
pub fn to_bib(entry: &RawEntry) -> String {
    if entry.entry_type.is_empty() {
        return String::new();
    }
    let mut out = format!("@{}{{{}", entry.entry_type, entry.key);
    for (name, value) in &entry.tags {
        out.push_str(",\n  ");
        out.push_str(name);
        out.push_str("={");
        out.push_str(value);
        out.push('}');
    }
    out.push_str("\n}");
    out
}

/// `Last, First` becomes `First Last`; anything else is kept.
fn display_name(name: &str) -> String {
    match name.split_once(',') {
        Some((last, first)) if !first.contains(',') && !first.trim().is_empty() => {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => name.trim().to_string(),
    }
}

static AND_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+and\s+").unwrap());

fn split_authors(field: &str) -> Vec<String> {
    let field = normalize_ws(field);
    AND_RE
        .split(&field)
        .map(display_name)
        .filter(|a| !a.is_empty())
        .collect()
}

/// Leading digits only, so `2021a` still files under 2021.
fn leading_year(field: &str) -> Option<i32> {
    let field = field.trim();
    let end = field
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(field.len());
    field[..end].parse::<i32>().ok().filter(|y| *y != 0)
}

pub fn to_publication(entry: &RawEntry) -> Publication {
    let clean = |name: &str| normalize_ws(entry.tag(name));
    let title = match clean("title") {
        t if t.is_empty() => UNTITLED.to_string(),
        t => t,
    };
    let venue = match clean("journal") {
        v if v.is_empty() => clean("booktitle"),
        v => v,
    };
    let kind = match entry.entry_type.as_str() {
        "" => "misc".to_string(),
        t => t.to_string(),
    };

    Publication {
        id: entry.key.clone(),
        kind,
        title,
        authors: split_authors(entry.tag("author")),
        year: leading_year(entry.tag("year")),
        venue,
        publisher: clean("publisher"),
        volume: clean("volume"),
        number: clean("number"),
        pages: clean("pages"),
        doi: doi::to_resolver_url(&clean("doi")),
        url: clean("url"),
        abstract_: clean("abstract"),
        bibtex: to_bib(entry),
    }
}
