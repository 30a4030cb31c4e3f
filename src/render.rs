use std::fmt::Write as _;

use crate::{
    copy::{COPY_LABEL, encode_payload},
    error::Result,
    item::Publication,
};

/// Something that can show rendered publications, addressed by container id.
pub trait RenderTarget {
    fn contains(&self, id: &str) -> bool;
    /// Replace the content of container `id`.
    fn replace(&mut self, id: &str, html: &str) -> Result<()>;
    /// Insert `html` at the start of container `id`, keeping what is there.
    fn prepend(&mut self, id: &str, html: &str) -> Result<()>;
    /// Show `value` as the current value of form control `id`. No-op when the
    /// control is absent.
    fn set_value(&mut self, id: &str, value: &str);
}

/// Which page the blocks are rendered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Variant {
    /// Bucketed BibTeX lists: venue shown as a chip.
    Bucketed,
    /// Filterable JSON list: venue and publisher shown together.
    Catalogue,
}

pub const EMPTY_NOTICE: &str = r#"<p class="muted">No publications found.</p>"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn external_link(href: &str, class: &str, text: &str) -> String {
    format!(
        r#"<a class="{class}" href="{}" target="_blank" rel="noopener">{text}</a>"#,
        escape_html(href)
    )
}

/// One `<article>` block.
pub fn render_publication(p: &Publication, variant: Variant) -> String {
    let title = escape_html(&p.title);
    let title = if p.url.is_empty() {
        format!(r#"<span class="title">{title}</span>"#)
    } else {
        external_link(&p.url, "title", &title)
    };
    let year = p
        .year
        .map(|y| format!(r#"<span class="year-badge" title="Year">{y}</span>"#))
        .unwrap_or_default();

    let venue = match variant {
        Variant::Bucketed if !p.venue.is_empty() => {
            format!(r#"<span class="chip">{}</span>"#, escape_html(&p.venue))
        }
        Variant::Bucketed => String::new(),
        Variant::Catalogue => {
            let joined = [p.venue.as_str(), p.publisher.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" — ");
            escape_html(&joined)
        }
    };

    let mut html = String::new();
    let _ = writeln!(
        html,
        r#"<article class="pub" data-id="{}" data-type="{}">"#,
        escape_html(&p.id),
        escape_html(&p.kind)
    );
    let _ = writeln!(html, "  <div>{title}{year}</div>");
    let _ = writeln!(
        html,
        r#"  <div class="meta authors">{}</div>"#,
        escape_html(&p.authors.join(", "))
    );
    if !venue.is_empty() {
        let _ = writeln!(html, r#"  <div class="meta venue">{venue}</div>"#);
    }
    if !p.abstract_.is_empty() {
        let _ = writeln!(
            html,
            r#"  <details><summary class="muted">Abstract</summary><p>{}</p></details>"#,
            escape_html(&p.abstract_)
        );
    }
    html.push_str("  <div class=\"actions\">\n");
    if !p.bibtex.is_empty() {
        let _ = writeln!(
            html,
            r#"    <button class="btn" type="button" data-bib="{}">{COPY_LABEL}</button>"#,
            encode_payload(&p.bibtex)
        );
    }
    if !p.doi.is_empty() {
        let _ = writeln!(html, "    {}", external_link(&p.doi, "btn", "DOI"));
    }
    if !p.url.is_empty() {
        let _ = writeln!(html, "    {}", external_link(&p.url, "btn", "Open"));
    }
    html.push_str("  </div>\n</article>\n");
    html
}

pub fn render_html<'a>(list: impl IntoIterator<Item = &'a Publication>, variant: Variant) -> String {
    let blocks: String = list
        .into_iter()
        .map(|p| render_publication(p, variant))
        .collect();
    if blocks.is_empty() {
        EMPTY_NOTICE.to_string()
    } else {
        blocks
    }
}

/// Replace the content of `container` with one block per publication, in
/// list order. Callers sort first.
pub fn render_list<'a>(
    target: &mut dyn RenderTarget,
    container: &str,
    list: impl IntoIterator<Item = &'a Publication>,
    variant: Variant,
) -> Result<()> {
    target.replace(container, &render_html(list, variant))
}

/// Inline, distinctly styled failure notice.
pub fn error_notice(reason: &str) -> String {
    format!(
        concat!(
            r#"<div class="meta pub-error" role="alert" style="color:#b91c1c;padding:8px 12px;"#,
            r#"border:1px solid #fecaca;background:#fef2f2;border-radius:8px">"#,
            "Failed to load publications.",
            r#"<br><small>{}</small></div>"#,
        ),
        escape_html(reason)
    )
}

/// `<option>` list for the year selector; `selected` marks the active filter.
pub fn year_options(years: &[i32], selected: &str) -> String {
    let mut html = String::from(r#"<option value="">All years</option>"#);
    for y in years {
        let mark = if y.to_string() == selected { " selected" } else { "" };
        let _ = write!(html, "<option{mark}>{y}</option>");
    }
    html
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{copy::decode_payload, error::Error};

    /// Container contents kept in memory, for tests that need no page.
    #[derive(Default)]
    pub(crate) struct MemoryTarget {
        pub containers: BTreeMap<String, String>,
        pub values: BTreeMap<String, String>,
    }

    impl MemoryTarget {
        pub fn with(ids: &[&str]) -> Self {
            MemoryTarget {
                containers: ids.iter().map(|id| (id.to_string(), String::new())).collect(),
                ..Default::default()
            }
        }
    }

    impl RenderTarget for MemoryTarget {
        fn contains(&self, id: &str) -> bool {
            self.containers.contains_key(id)
        }

        fn replace(&mut self, id: &str, html: &str) -> Result<()> {
            let slot = self
                .containers
                .get_mut(id)
                .ok_or_else(|| Error::MissingContainer(id.to_string()))?;
            *slot = html.to_string();
            Ok(())
        }

        fn prepend(&mut self, id: &str, html: &str) -> Result<()> {
            let slot = self
                .containers
                .get_mut(id)
                .ok_or_else(|| Error::MissingContainer(id.to_string()))?;
            slot.insert_str(0, html);
            Ok(())
        }

        fn set_value(&mut self, id: &str, value: &str) {
            self.values.insert(id.to_string(), value.to_string());
        }
    }

    fn publication(title: &str) -> Publication {
        Publication {
            id: "p1".to_string(),
            kind: "article".to_string(),
            title: title.to_string(),
            authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
            year: Some(2024),
            venue: "Journal".to_string(),
            publisher: "Press".to_string(),
            bibtex: "@article{p1, title={Café}}".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn escapes_all_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn escaped_text_never_contains_raw_markup() {
        proptest::proptest!(|(s in "\\PC*")| {
            let out = escape_html(&s);
            proptest::prop_assert!(!out.contains('<') && !out.contains('>') && !out.contains('"'));
        })
    }

    #[test]
    fn script_title_renders_as_text() {
        let html = render_publication(&publication("<script>alert(1)</script>"), Variant::Catalogue);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn block_contents() {
        let mut p = publication("Paper");
        p.url = "https://example.org/p".to_string();
        p.doi = "https://doi.org/10.1%2Fx".to_string();
        p.abstract_ = "We study things.".to_string();
        let html = render_publication(&p, Variant::Catalogue);
        assert!(html.contains(r#"<a class="title" href="https://example.org/p""#));
        assert!(html.contains(r#"<span class="year-badge" title="Year">2024</span>"#));
        assert!(html.contains("Ada Lovelace, Alan Turing"));
        assert!(html.contains("Journal — Press"));
        assert!(html.contains("<details>"));
        assert!(html.contains(r#"href="https://doi.org/10.1%2Fx""#));
        assert!(html.contains(">Open</a>"));
        assert!(html.contains(">Copy BibTeX</button>"));
    }

    #[test]
    fn bucketed_variant_uses_chip_without_publisher() {
        let html = render_publication(&publication("Paper"), Variant::Bucketed);
        assert!(html.contains(r#"<span class="chip">Journal</span>"#));
        assert!(!html.contains("Press"));
        assert!(!html.contains("<details>"));
        assert!(html.contains(r#"<span class="title">Paper</span>"#));
    }

    #[test]
    fn copy_payload_decodes_to_entry_bibtex() {
        let p = publication("Paper");
        let html = render_publication(&p, Variant::Catalogue);
        let start = html.find("data-bib=\"").expect("payload") + "data-bib=\"".len();
        let end = start + html[start..].find('"').expect("end quote");
        assert_eq!(decode_payload(&html[start..end]).expect("decode"), p.bibtex);
    }

    #[test]
    fn empty_list_renders_placeholder() {
        let mut target = MemoryTarget::with(&["pub-list"]);
        render_list(&mut target, "pub-list", std::iter::empty(), Variant::Catalogue).expect("render");
        assert_eq!(target.containers["pub-list"], EMPTY_NOTICE);
    }

    #[test]
    fn render_keeps_list_order() {
        let a = Publication { title: "First".into(), year: Some(2001), ..Default::default() };
        let b = Publication { title: "Second".into(), year: Some(2030), ..Default::default() };
        let html = render_html([&a, &b], Variant::Bucketed);
        assert!(html.find("First").expect("a") < html.find("Second").expect("b"));
    }

    #[test]
    fn missing_container_is_an_error() {
        let mut target = MemoryTarget::default();
        let err = render_list(&mut target, "pub-list", std::iter::empty(), Variant::Catalogue).unwrap_err();
        assert!(matches!(err, Error::MissingContainer(id) if id == "pub-list"));
    }

    #[test]
    fn year_options_mark_selection() {
        assert_eq!(
            year_options(&[2024, 2021], "2021"),
            r#"<option value="">All years</option><option>2024</option><option selected>2021</option>"#
        );
    }

    #[test]
    fn error_notice_escapes_reason() {
        let html = error_notice("<b>404</b>");
        assert!(html.contains("&lt;b&gt;404&lt;/b&gt;"));
        assert!(html.contains("pub-error"));
    }
}
