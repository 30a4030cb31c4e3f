use std::collections::BTreeMap;

use tracing::{error, info};

use crate::{
    bibtex::{self, Bucket},
    error::{Error, Result},
    filter::{Catalogue, FilterController, Filters, LIST_ID},
    item::{Publication, sort_publications},
    loader::{CandidateChain, Fetch, Origin, load_json},
    location::Location,
    render::{self, RenderTarget, Variant},
};

/// Element that receives the failure notice.
pub const NOTICE_ID: &str = "publications";

/// Publications rendered per bucket.
pub type BucketCounts = BTreeMap<Bucket, usize>;

#[derive(Debug, PartialEq, Eq)]
pub struct CatalogueSummary {
    pub origin: Origin,
    pub total: usize,
    pub shown: usize,
}

/// Run `f`; on failure put a visible notice on the page before returning the error.
fn with_notice<T>(
    target: &mut dyn RenderTarget,
    f: impl FnOnce(&mut dyn RenderTarget) -> Result<T>,
) -> Result<T> {
    f(&mut *target).inspect_err(|err| {
        error!(error = %err, "failed to load publications");
        if target.contains(NOTICE_ID) {
            // Only the load error is returned, not a failure to write the notice.
            let _ = target.prepend(NOTICE_ID, &render::error_notice(&err.to_string()));
        }
    })
}

fn guard(target: &dyn RenderTarget, ids: &[&str]) -> Result<()> {
    match ids.iter().find(|id| !target.contains(id)) {
        Some(id) => Err(Error::MissingContainer(id.to_string())),
        None => Ok(()),
    }
}

/// Group entries by bucket, each sorted newest first.
pub fn bucketize(entries: &[bibtex::RawEntry]) -> BTreeMap<Bucket, Vec<Publication>> {
    let mut buckets: BTreeMap<Bucket, Vec<Publication>> =
        Bucket::ALL.iter().map(|b| (*b, Vec::new())).collect();
    for entry in entries {
        buckets
            .entry(bibtex::classify_entry(entry))
            .or_default()
            .push(bibtex::to_publication(entry));
    }
    for list in buckets.values_mut() {
        sort_publications(list);
    }
    buckets
}

/// The `.bib` pipeline: fetch, parse, classify and render the three lists.
pub fn render_bibliography(
    target: &mut dyn RenderTarget,
    root: &Location,
    fetcher: &dyn Fetch,
) -> Result<BucketCounts> {
    with_notice(target, |target| {
        let ids: Vec<_> = Bucket::ALL.iter().map(|b| b.container_id()).collect();
        guard(target, &ids)?;

        let (_, text) = CandidateChain::for_root(root, fetcher).run()?;
        let entries = bibtex::parse_bibliography(&text)?;

        let mut counts = BucketCounts::new();
        for (bucket, list) in bucketize(&entries) {
            render::render_list(target, bucket.container_id(), &list, Variant::Bucketed)?;
            counts.insert(bucket, list.len());
        }
        info!(
            "rendered J={}, I={}, N={}",
            counts[&Bucket::Journals],
            counts[&Bucket::Intl],
            counts[&Bucket::National]
        );
        Ok(counts)
    })
}

/// The JSON pipeline: load (with embedded fallback), fill the year selector,
/// and render the list through the filter controls.
pub fn render_catalogue(
    target: &mut dyn RenderTarget,
    source: &Location,
    fetcher: &dyn Fetch,
    filters: Filters,
) -> Result<CatalogueSummary> {
    with_notice(target, |target| {
        guard(target, &[LIST_ID])?;

        let (list, origin) = load_json(source, fetcher);
        let catalogue = Catalogue::new(list);
        let controller = FilterController::with_filters(&catalogue, filters);
        controller.populate_years(target)?;
        controller.sync_controls(target);
        controller.apply(target)?;

        let shown = controller.filtered().len();
        info!(total = catalogue.publications().len(), shown, filters = ?controller.filters(), "rendered catalogue");
        Ok(CatalogueSummary {
            origin,
            total: catalogue.publications().len(),
            shown,
        })
    })
}
