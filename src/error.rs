use thiserror::Error;

use crate::location::Location;

#[derive(Error, Debug)]
pub enum Error {
    /// A container the page contract requires is absent from the template.
    #[error("missing publications container #{0}")]
    MissingContainer(String),

    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: Location, reason: String },

    #[error("no candidate sources to fetch")]
    NoCandidates,

    /// Every candidate source failed; carries the last failure seen.
    #[error("no publication source could be loaded (last error: {last})")]
    AllFailed { last: Box<Error> },

    #[error("failed to parse BibTeX: {0}")]
    Parse(String),

    #[error("failed to parse JSON publications: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is neither a list nor an object with a `publications` list.
    #[error("unrecognized publications document: {0}")]
    Document(String),

    #[error("invalid copy payload: {0}")]
    Payload(String),

    #[error("clipboard write failed: {0}")]
    Clipboard(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
