use std::path::PathBuf;

use anyhow::bail;
use box_office_scraping::{
    api::NumbersClient,
    config::Config,
    pipeline::{self, RunOptions},
    sheet::Sheet,
};
use box_office_scraping_utils::fs_util::read_toml_or_default;
use clap::Parser;
use log::info;

/// Fills movie details from The Numbers into a spreadsheet, keyed by the title column.
#[derive(Parser)]
struct Opts {
    /// CSV or TSV file to read titles from and write results into.
    sheet_path: PathBuf,
    /// TOML file overriding columns, site and fetch settings.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    start_row: u64,
    /// Number of rows to process; defaults to every row up to the end of the sheet.
    #[arg(long)]
    num_movies: Option<usize>,
    /// Field delimiter; inferred from the file extension if omitted.
    #[arg(long)]
    delimiter: Option<char>,
    /// Scrape and log, but do not write the sheet.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let opts = Opts::parse();

    let config: Config = read_toml_or_default(opts.config.as_ref())?;
    let delimiter = match opts.delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => bail!("Delimiter must be a single ASCII character, got {c:?}"),
        None => None,
    };
    let mut sheet = Sheet::load(&opts.sheet_path, delimiter)?;
    let client = NumbersClient::new(&config.site, &config.fetch)?;

    let options = RunOptions::builder()
        .start_row(opts.start_row as usize)
        .num_movies(opts.num_movies)
        .request_interval(config.fetch.request_interval())
        .dry_run(opts.dry_run)
        .build();
    let summary = pipeline::run(&client, &mut sheet, &config.columns, &options).await?;
    info!(
        "All done: columns updated for {} rows of {:?}.",
        summary.written(),
        opts.sheet_path
    );
    Ok(())
}
