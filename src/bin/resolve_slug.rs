use std::path::PathBuf;

use box_office_scraping::{
    api::NumbersClient, config::Config, resolver::Resolver, schema::MovieTitle,
};
use box_office_scraping_utils::fs_util::read_toml_or_default;
use clap::Parser;

/// Scrapes a single title from the live site and prints the record as JSON.
#[derive(Parser)]
struct Opts {
    title: String,
    #[arg(long)]
    year: Option<u16>,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let config: Config = read_toml_or_default(opts.config.as_ref())?;
    let client = NumbersClient::new(&config.site, &config.fetch)?;
    let title = MovieTitle::parse(&opts.title).with_fallback_year(opts.year);
    let record = Resolver::new(&client, &title).scrape().await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
