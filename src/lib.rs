//! Render a publication list for a static web page.
//!
//! Publication data comes from a `.bib` file or a JSON file. Records are
//! normalized into [`item::Publication`], sorted newest first and rendered as
//! HTML blocks into containers of a page template:
//!
//! - the BibTeX pipeline ([`pipeline::render_bibliography`]) tries candidate
//!   files in order and splits entries into journal, international and
//!   national lists;
//! - the JSON pipeline ([`pipeline::render_catalogue`]) falls back to a
//!   bundled sample and renders one list through search, year and type filters.
//!
//! Rendering goes through [`render::RenderTarget`], so normalization,
//! classification and filtering can be exercised without a page.

pub mod bibtex;
pub mod copy;
pub mod doi;
pub mod error;
pub mod filter;
pub mod item;
pub mod loader;
pub mod location;
pub mod normalize;
pub mod page;
pub mod pipeline;
pub mod render;

pub use error::{Error, Result};
pub use item::Publication;
