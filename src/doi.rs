use once_cell::sync::Lazy;
use std::borrow::Cow;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;

pub const RESOLVER_BASE: &str = "https://doi.org/";

/// Everything except the characters a URI component may carry unescaped.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static ABSOLUTE_URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?:").unwrap());

/// Turn a DOI field into a link target.
///
/// Absolute URLs pass through; anything else is treated as a bare DOI and
/// percent-encoded as a single path component under the resolver.
pub fn to_resolver_url(doi: &str) -> String {
    let doi = doi.trim();
    if doi.is_empty() || ABSOLUTE_URL_RE.is_match(doi) {
        return doi.to_string();
    }
    format!(
        "{RESOLVER_BASE}{}",
        utf8_percent_encode(doi, COMPONENT_ENCODE_SET)
    )
}

/// Human-readable form of a link target: percent-escapes decoded, so
/// `https://doi.org/10.1000%2Fxyz` reads `https://doi.org/10.1000/xyz`.
pub fn readable(url: &str) -> Cow<'_, str> {
    percent_decode_str(url).decode_utf8_lossy()
}
