use std::{fs, ops::Range, path::Path};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::{
    error::{Error, Result},
    render::{RenderTarget, escape_html},
};

pub const BIB_TEMPLATE: &str = include_str!("templates/bib.html");
pub const CATALOGUE_TEMPLATE: &str = include_str!("templates/catalogue.html");

static VALUE_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\svalue\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+))"#).unwrap()
});
static SELECTED_ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\sselected\b(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>/"']+))?"#).unwrap()
});
static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)(<option\b[^>]*?)(\s*/?>)([^<]*)").unwrap());

/// An HTML document whose elements are addressed by `id`.
///
/// Only element content is rewritten; the rest of the template is kept
/// byte for byte.
#[derive(Clone, Debug)]
pub struct Page {
    html: String,
}

impl Page {
    pub fn new(html: impl Into<String>) -> Self {
        Page { html: html.into() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading page template");
        Ok(Page::new(fs::read_to_string(path)?))
    }

    pub fn into_html(self) -> String {
        self.html
    }

    /// Fill the footer `year` element, when the template has one.
    pub fn stamp_year(&mut self, year: i32) {
        if let Some(range) = self.inner_range("year") {
            self.html.replace_range(range, &year.to_string());
        }
    }

    /// Byte range of the opening tag of the element with the given id, and
    /// its lowercased tag name.
    fn open_tag(&self, id: &str) -> Option<(Range<usize>, String)> {
        let open_re = Regex::new(&format!(
            r#"(?is)<([a-z][a-z0-9-]*)\b[^>]*\sid\s*=\s*["']{}["'][^>]*>"#,
            regex::escape(id)
        ))
        .ok()?;
        let caps = open_re.captures(&self.html)?;
        Some((caps.get(0)?.range(), caps.get(1)?.as_str().to_lowercase()))
    }

    /// Byte range of the content of the element with the given id.
    fn inner_range(&self, id: &str) -> Option<Range<usize>> {
        let (open, tag) = self.open_tag(id)?;
        if self.html[open.clone()].ends_with("/>") {
            return None;
        }

        // Walk same-name tags after the opening one until nesting returns to zero.
        let tag_re = Regex::new(&format!(r"(?is)<(/?){}\b[^>]*>", regex::escape(&tag))).ok()?;
        let rest = &self.html[open.end..];
        let mut depth = 1usize;
        for m in tag_re.captures_iter(rest) {
            let whole = m.get(0)?;
            let closing = m.get(1).is_some_and(|c| !c.as_str().is_empty());
            if closing {
                depth -= 1;
                if depth == 0 {
                    return Some(open.end..open.end + whole.start());
                }
            } else if !whole.as_str().ends_with("/>") {
                depth += 1;
            }
        }
        None
    }
}

/// Opening tag with its `value` attribute set to `value`.
fn with_value_attr(tag: &str, value: &str) -> String {
    let tag = VALUE_ATTR_RE.replace_all(tag, "");
    let (head, end) = match tag.strip_suffix("/>") {
        Some(head) => (head.trim_end(), " />"),
        None => (tag.strip_suffix('>').unwrap_or(&*tag).trim_end(), ">"),
    };
    format!(r#"{head} value="{}"{end}"#, escape_html(value))
}

/// Options of a `<select>` with only the option matching `value` selected.
/// An option's value is its `value` attribute, or its text without one. A
/// value no option carries gets an option of its own.
fn with_selected_option(options: &str, value: &str) -> String {
    let mut found = false;
    let mut html = OPTION_RE
        .replace_all(options, |caps: &Captures| {
            let tag = SELECTED_ATTR_RE.replace_all(&caps[1], "");
            let text = &caps[3];
            let option_value = VALUE_ATTR_RE
                .captures(&tag)
                .and_then(|v| v.get(1).or_else(|| v.get(2)).or_else(|| v.get(3)))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| text.trim().to_string());
            let mark = if !found && option_value.eq_ignore_ascii_case(value) {
                found = true;
                " selected"
            } else {
                ""
            };
            format!("{tag}{mark}{}{text}", &caps[2])
        })
        .into_owned();
    if !found && !value.is_empty() {
        let value = escape_html(value);
        html.push_str(&format!(r#"<option value="{value}" selected>{value}</option>"#));
    }
    html
}

impl RenderTarget for Page {
    fn contains(&self, id: &str) -> bool {
        self.inner_range(id).is_some()
    }

    fn replace(&mut self, id: &str, html: &str) -> Result<()> {
        let range = self
            .inner_range(id)
            .ok_or_else(|| Error::MissingContainer(id.to_string()))?;
        self.html.replace_range(range, html);
        Ok(())
    }

    fn prepend(&mut self, id: &str, html: &str) -> Result<()> {
        let range = self
            .inner_range(id)
            .ok_or_else(|| Error::MissingContainer(id.to_string()))?;
        self.html.insert_str(range.start, html);
        Ok(())
    }

    fn set_value(&mut self, id: &str, value: &str) {
        let Some((open, tag)) = self.open_tag(id) else {
            debug!(id, "no such control");
            return;
        };
        if tag == "select" {
            if let Some(range) = self.inner_range(id) {
                let options = with_selected_option(&self.html[range.clone()], value);
                self.html.replace_range(range, &options);
            }
        } else {
            let updated = with_value_attr(&self.html[open.clone()], value);
            self.html.replace_range(open, &updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_nested_content() {
        let mut page = Page::new(
            r#"<body><div id="list"><div>old <div>deep</div></div></div><p>after</p></body>"#,
        );
        page.replace("list", "new").expect("replace");
        assert_eq!(
            page.into_html(),
            r#"<body><div id="list">new</div><p>after</p></body>"#
        );
    }

    #[test]
    fn does_not_confuse_data_attributes() {
        let mut page = Page::new(
            r#"<div data-id="list">x</div><section class="a" id='list'>y</section>"#,
        );
        page.replace("list", "z").expect("replace");
        assert_eq!(
            page.into_html(),
            r#"<div data-id="list">x</div><section class="a" id='list'>z</section>"#
        );
    }

    #[test]
    fn prepend_keeps_existing_content() {
        let mut page = Page::new(r#"<section id="publications"><h2>Pubs</h2></section>"#);
        page.prepend("publications", "<div>note</div>").expect("prepend");
        assert_eq!(
            page.into_html(),
            r#"<section id="publications"><div>note</div><h2>Pubs</h2></section>"#
        );
    }

    #[test]
    fn missing_and_void_elements_are_not_containers() {
        let mut page = Page::new(r#"<input id="pub-search" /><div id="open">"#);
        assert!(!page.contains("pub-search"));
        assert!(!page.contains("open"));
        assert!(!page.contains("absent"));
        assert!(matches!(
            page.replace("absent", "x"),
            Err(Error::MissingContainer(id)) if id == "absent"
        ));
    }

    #[test]
    fn sets_input_value() {
        let mut page = Page::new(r#"<input id="pub-search" type="search" value="old"><input id="q" />"#);
        page.set_value("pub-search", r#"a "b""#);
        page.set_value("q", "x");
        page.set_value("absent", "ignored");
        assert_eq!(
            page.into_html(),
            r#"<input id="pub-search" type="search" value="a &quot;b&quot;"><input id="q" value="x" />"#
        );
    }

    #[test]
    fn selects_matching_option() {
        let mut page = Page::new(concat!(
            r#"<select id="pub-type"><option value="">All</option>"#,
            r#"<option value="article" selected>Article</option>"#,
            r#"<option value="misc">Other</option></select>"#,
        ));
        page.set_value("pub-type", "MISC");
        assert_eq!(
            page.into_html(),
            concat!(
                r#"<select id="pub-type"><option value="">All</option>"#,
                r#"<option value="article">Article</option>"#,
                r#"<option value="misc" selected>Other</option></select>"#,
            )
        );
    }

    #[test]
    fn unknown_option_value_is_added() {
        let mut page = Page::new(r#"<select id="pub-type"><option value="">All</option></select>"#);
        page.set_value("pub-type", "thesis");
        assert_eq!(
            page.into_html(),
            r#"<select id="pub-type"><option value="">All</option><option value="thesis" selected>thesis</option></select>"#
        );
    }

    #[test]
    fn stamps_footer_year() {
        let mut page = Page::new(r#"<footer>&copy; <span id="year"></span></footer>"#);
        page.stamp_year(2026);
        assert_eq!(
            page.into_html(),
            r#"<footer>&copy; <span id="year">2026</span></footer>"#
        );
    }

    #[test]
    fn bundled_templates_satisfy_contracts() {
        let bib = Page::new(BIB_TEMPLATE);
        for id in ["list-journals", "list-intl", "list-national", "publications", "year"] {
            assert!(bib.contains(id), "bib template lacks #{id}");
        }
        let catalogue = Page::new(CATALOGUE_TEMPLATE);
        for id in ["pub-list", "pub-year", "pub-type", "publications"] {
            assert!(catalogue.contains(id), "catalogue template lacks #{id}");
        }
    }
}
