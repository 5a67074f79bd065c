use std::path::PathBuf;

use box_office_scraping::{
    parser::{international, movie_page},
    slug::canonical_slug,
};
use clap::Parser;
use scraper::Html;

/// Runs the movie page extractors over a saved page.
#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let html = Html::parse_document(&fs_err::read_to_string(opts.input_file)?);
    println!("canonical slug = {:?}", canonical_slug(&html));
    println!("{}", serde_json::to_string_pretty(&movie_page::parse(&html))?);
    for pair in international::parse_table(&html) {
        println!("  {:?} {}", pair.country, pair.revenue);
    }
    Ok(())
}
