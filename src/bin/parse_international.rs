use std::path::PathBuf;

use box_office_scraping::parser::international;
use clap::Parser;

/// Parses a saved international iframe.
#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    let pairs = international::parse_chart(&fs_err::read_to_string(opts.input_file)?);
    println!("{} territories", pairs.len());
    for pair in pairs {
        println!("  {:?} {}", pair.country, pair.revenue);
    }
    Ok(())
}
