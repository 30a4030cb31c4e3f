use std::path::PathBuf;

use clap::{Parser, Subcommand};

use publist::location::Location;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Network timeout for remote sources, in seconds
    #[arg(long, global = true, default_value_t = 10, value_name = "SECS")]
    pub timeout: u64,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the BibTeX publication lists (journals, international, national)
    Bib {
        /// Site root holding `data/publications.bib` or `publications.bib`
        #[arg(long, default_value = ".", value_name = "LOC")]
        root: Location,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Render the filterable publication list from JSON
    Json {
        /// JSON source; the bundled sample is used when it cannot be loaded
        #[arg(long, default_value = "data/publications.json", value_name = "LOC")]
        source: Location,
        #[command(flatten)]
        page: PageArgs,
        /// Free-text search over title, venue, publisher, DOI and authors
        #[arg(long, default_value = "")]
        query: String,
        /// Only this year
        #[arg(long, default_value = "")]
        year: String,
        /// Only this entry type
        #[arg(long = "type", default_value = "")]
        kind: String,
    },
    /// Print the canonical records of a `.bib` or JSON source as JSON
    Normalize {
        #[arg(value_name = "LOC")]
        source: Location,
    },
    /// Decode a "Copy BibTeX" payload and copy the BibTeX (to stdout)
    Copy {
        #[arg(value_name = "PAYLOAD")]
        payload: String,
    },
}

#[derive(clap::Args, Debug)]
pub struct PageArgs {
    /// HTML template with the publication containers; a bundled page is used otherwise
    #[arg(long, value_name = "FILE")]
    pub page: Option<PathBuf>,
    /// Where to write the rendered page (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
