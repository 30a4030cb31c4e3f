use std::collections::BTreeSet;

use crate::{
    doi,
    error::Result,
    item::Publication,
    render::{self, RenderTarget, Variant},
};

pub const LIST_ID: &str = "pub-list";
pub const YEAR_ID: &str = "pub-year";
pub const SEARCH_ID: &str = "pub-search";
pub const TYPE_ID: &str = "pub-type";

/// The loaded publications. Written once by the loader, read by everything else.
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    publications: Vec<Publication>,
    years: Vec<i32>,
}

impl Catalogue {
    pub fn new(publications: Vec<Publication>) -> Self {
        let years = publications
            .iter()
            .filter_map(|p| p.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .rev()
            .collect();
        Catalogue {
            publications,
            years,
        }
    }

    pub fn publications(&self) -> &[Publication] {
        &self.publications
    }

    /// Distinct years, newest first, as computed at load time.
    pub fn years(&self) -> &[i32] {
        &self.years
    }
}

/// Current values of the search, year and type controls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    pub query: String,
    pub year: String,
    pub kind: String,
}

impl Filters {
    pub fn matches(&self, p: &Publication) -> bool {
        let query = self.query.trim().to_lowercase();
        let kind = self.kind.trim().to_lowercase();
        let year = self.year.trim();

        let in_query = query.is_empty() || {
            let doi = doi::readable(&p.doi);
            let mut haystack = vec![
                p.title.as_str(),
                p.venue.as_str(),
                p.publisher.as_str(),
                p.doi.as_str(),
                &*doi,
            ];
            haystack.extend(p.authors.iter().map(String::as_str));
            haystack.join(" ").to_lowercase().contains(&query)
        };
        let in_year = year.is_empty() || p.year.is_some_and(|y| y.to_string() == year);
        let in_kind = kind.is_empty() || p.kind.to_lowercase() == kind;
        in_query && in_year && in_kind
    }
}

/// Re-renders the list whenever a control value changes.
pub struct FilterController<'a> {
    catalogue: &'a Catalogue,
    filters: Filters,
}

impl<'a> FilterController<'a> {
    pub fn new(catalogue: &'a Catalogue) -> Self {
        FilterController {
            catalogue,
            filters: Filters::default(),
        }
    }

    pub fn with_filters(catalogue: &'a Catalogue, filters: Filters) -> Self {
        FilterController { catalogue, filters }
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn filtered(&self) -> Vec<&'a Publication> {
        self.catalogue
            .publications()
            .iter()
            .filter(|p| self.filters.matches(p))
            .collect()
    }

    /// Fill the year selector once, after load. No-op without a selector.
    pub fn populate_years(&self, target: &mut dyn RenderTarget) -> Result<()> {
        if !target.contains(YEAR_ID) {
            return Ok(());
        }
        target.replace(
            YEAR_ID,
            &render::year_options(self.catalogue.years(), self.filters.year.trim()),
        )
    }

    /// Show the active query and type in their controls.
    pub fn sync_controls(&self, target: &mut dyn RenderTarget) {
        for (id, value) in [(SEARCH_ID, &self.filters.query), (TYPE_ID, &self.filters.kind)] {
            let value = value.trim();
            if !value.is_empty() {
                target.set_value(id, value);
            }
        }
    }

    pub fn apply(&self, target: &mut dyn RenderTarget) -> Result<()> {
        render::render_list(target, LIST_ID, self.filtered(), Variant::Catalogue)
    }

    pub fn set_query(&mut self, query: &str, target: &mut dyn RenderTarget) -> Result<()> {
        self.filters.query = query.to_string();
        self.apply(target)
    }

    pub fn set_year(&mut self, year: &str, target: &mut dyn RenderTarget) -> Result<()> {
        self.filters.year = year.to_string();
        self.apply(target)
    }

    pub fn set_kind(&mut self, kind: &str, target: &mut dyn RenderTarget) -> Result<()> {
        self.filters.kind = kind.to_string();
        self.apply(target)
    }
}
