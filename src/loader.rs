use std::{fs, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::{
    bibtex,
    error::{Error, Result},
    item::{Publication, sort_publications},
    location::Location,
    normalize,
};

/// Candidate `.bib` files relative to the site root, in priority order.
pub const BIB_CANDIDATES: [&str; 2] = ["data/publications.bib", "publications.bib"];
pub const DEFAULT_JSON_SOURCE: &str = "data/publications.json";

const EMBEDDED_PUBLICATIONS: &str = include_str!("embedded.json");

pub trait Fetch {
    fn fetch(&self, location: &Location) -> Result<String>;
}

/// Reads files from disk and URLs over HTTP, bypassing caches.
pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_connect(Some(timeout.min(Duration::from_secs(5))))
            .timeout_global(Some(timeout))
            .build();
        Fetcher {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Fetch for Fetcher {
    fn fetch(&self, location: &Location) -> Result<String> {
        let fail = |reason: String| Error::Fetch {
            location: location.clone(),
            reason,
        };
        match location {
            Location::Url(url) => {
                let mut res = self
                    .agent
                    .get(url.as_str())
                    .header("Cache-Control", "no-cache, no-store")
                    .header("Pragma", "no-cache")
                    .call()
                    .map_err(|e| fail(e.to_string()))?;
                res.body_mut()
                    .read_to_string()
                    .map_err(|e| fail(e.to_string()))
            }
            Location::Path(path) => fs::read_to_string(path).map_err(|e| fail(e.to_string())),
        }
    }
}

#[derive(Debug)]
pub enum FetchState {
    NotStarted,
    Fetching(usize),
    Success { index: usize, text: String },
    AllFailed(Error),
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FetchState::Success { .. } | FetchState::AllFailed(_))
    }
}

/// Tries each candidate once, in order; the first successful fetch wins.
pub struct CandidateChain<'a> {
    candidates: Vec<Location>,
    fetcher: &'a dyn Fetch,
    state: FetchState,
    last_error: Option<Error>,
}

impl<'a> CandidateChain<'a> {
    pub fn new(candidates: Vec<Location>, fetcher: &'a dyn Fetch) -> Self {
        CandidateChain {
            candidates,
            fetcher,
            state: FetchState::NotStarted,
            last_error: None,
        }
    }

    /// The `.bib` candidates under a site root.
    pub fn for_root(root: &Location, fetcher: &'a dyn Fetch) -> Self {
        Self::new(
            BIB_CANDIDATES.iter().map(|rel| root.join(rel)).collect(),
            fetcher,
        )
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Perform one transition. Terminal states stay put.
    pub fn step(&mut self) {
        let state = std::mem::replace(&mut self.state, FetchState::NotStarted);
        self.state = match state {
            FetchState::NotStarted if self.candidates.is_empty() => self.exhausted(),
            FetchState::NotStarted => FetchState::Fetching(0),
            FetchState::Fetching(index) => {
                let location = &self.candidates[index];
                debug!(%location, "fetching publications");
                match self.fetcher.fetch(location) {
                    Ok(text) => FetchState::Success { index, text },
                    Err(err) => {
                        warn!(%location, error = %err, "fetch failed");
                        self.last_error = Some(err);
                        if index + 1 < self.candidates.len() {
                            FetchState::Fetching(index + 1)
                        } else {
                            self.exhausted()
                        }
                    }
                }
            }
            terminal => terminal,
        };
    }

    fn exhausted(&mut self) -> FetchState {
        let last = self.last_error.take().unwrap_or(Error::NoCandidates);
        FetchState::AllFailed(Error::AllFailed {
            last: Box::new(last),
        })
    }

    /// Step to a terminal state, returning the winning location and its text.
    pub fn run(mut self) -> Result<(Location, String)> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        while !self.state.is_terminal() {
            if let FetchState::Fetching(i) = self.state {
                spinner.set_message(format!("fetching {}", self.candidates[i]));
            }
            self.step();
        }
        spinner.finish_and_clear();
        match self.state {
            FetchState::Success { index, text } => {
                let location = self.candidates.swap_remove(index);
                info!(%location, bytes = text.len(), "loaded publications");
                Ok((location, text))
            }
            FetchState::AllFailed(err) => Err(err),
            FetchState::NotStarted | FetchState::Fetching(_) => {
                unreachable!("loop exits on terminal states only")
            }
        }
    }
}

/// Where the JSON pipeline's records came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    Source(Location),
    Embedded,
}

/// Load JSON publications, falling back to the bundled sample on any failure.
pub fn load_json(source: &Location, fetcher: &dyn Fetch) -> (Vec<Publication>, Origin) {
    match fetcher
        .fetch(source)
        .and_then(|text| normalize::parse_json(&text))
    {
        Ok(list) => {
            info!(%source, count = list.len(), "loaded publications");
            (list, Origin::Source(source.clone()))
        }
        Err(err) => {
            warn!(%source, error = %err, "using embedded publications");
            (embedded(), Origin::Embedded)
        }
    }
}

pub fn embedded() -> Vec<Publication> {
    normalize::parse_json(EMBEDDED_PUBLICATIONS).unwrap_or_default()
}

/// Load a `.bib` or JSON source strictly, with no fallback.
pub fn load_any(location: &Location, fetcher: &dyn Fetch) -> Result<Vec<Publication>> {
    let text = fetcher.fetch(location)?;
    if location.extension().as_deref() == Some("bib") {
        let mut list: Vec<Publication> = bibtex::parse_bibliography(&text)?
            .iter()
            .map(bibtex::to_publication)
            .collect();
        sort_publications(&mut list);
        Ok(list)
    } else {
        normalize::parse_json(&text)
    }
}
