use std::{fs, path::Path, time::Instant};

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use owo_colors::{OwoColorize, Stream::Stderr};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use publist::{
    copy::{CopyControl, StdoutClipboard},
    filter::Filters,
    loader::{self, Fetcher, Origin},
    page::{BIB_TEMPLATE, CATALOGUE_TEMPLATE, Page},
    pipeline,
};

use crate::cli::{Cli, Command, PageArgs};

mod cli;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "publist=debug" } else { "publist=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let fetcher = Fetcher::new(std::time::Duration::from_secs(args.timeout));

    match args.command {
        Command::Bib { root, page } => {
            let mut target = open_page(&page, BIB_TEMPLATE)?;
            let result = pipeline::render_bibliography(&mut target, &root, &fetcher);
            // The page is written either way: on failure it carries the notice.
            write_page(target, page.output.as_deref())?;
            let counts = result?;
            let summary = counts
                .iter()
                .map(|(bucket, n)| format!("{} {}", bucket.label(), n))
                .collect::<Vec<_>>()
                .join("  ");
            eprintln!("{} {}", "✓".if_supports_color(Stderr, |t| t.green()), summary);
        }
        Command::Json {
            source,
            page,
            query,
            year,
            kind,
        } => {
            let mut target = open_page(&page, CATALOGUE_TEMPLATE)?;
            let filters = Filters { query, year, kind };
            let result = pipeline::render_catalogue(&mut target, &source, &fetcher, filters);
            write_page(target, page.output.as_deref())?;
            let summary = result?;
            let origin = match summary.origin {
                Origin::Source(location) => location.to_string(),
                Origin::Embedded => "embedded sample".to_string(),
            };
            eprintln!(
                "{} {} of {} from {}",
                "✓".if_supports_color(Stderr, |t| t.green()),
                summary.shown,
                summary.total,
                origin
            );
        }
        Command::Normalize { source } => {
            let list = loader::load_any(&source, &fetcher)
                .with_context(|| format!("failed to load {source}"))?;
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        Command::Copy { payload } => {
            let mut control = CopyControl::from_payload(payload);
            let now = Instant::now();
            control.activate(&mut StdoutClipboard, now)?;
            eprintln!(
                "{}",
                control.label(now).if_supports_color(Stderr, |t| t.green())
            );
        }
    }
    Ok(())
}

fn open_page(args: &PageArgs, bundled: &str) -> anyhow::Result<Page> {
    let mut page = match &args.page {
        Some(path) => Page::load(path)
            .with_context(|| format!("failed to read page template {}", path.display()))?,
        None => Page::new(bundled),
    };
    page.stamp_year(chrono::Local::now().year());
    Ok(page)
}

fn write_page(page: Page, output: Option<&Path>) -> anyhow::Result<()> {
    let html = page.into_html();
    match output {
        Some(path) => fs::write(path, html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{html}"),
    }
    Ok(())
}
