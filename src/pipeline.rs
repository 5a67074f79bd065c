use std::time::Duration;

use getset::CopyGetters;
use log::{error, info, warn};
use tokio::time::sleep;
use typed_builder::TypedBuilder;

use crate::{
    api::PageSource, config::ColumnLayout, resolver::Resolver, schema::MovieTitle, sheet::Sheet,
};

#[derive(Clone, Debug, TypedBuilder)]
pub struct RunOptions {
    /// First spreadsheet row holding a title.
    pub start_row: usize,
    /// How many rows to visit; `None` goes to the end of the sheet.
    #[builder(default)]
    pub num_movies: Option<usize>,
    #[builder(default)]
    pub request_interval: Duration,
    /// Scrape without writing the spreadsheet back.
    #[builder(default)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Summary {
    written: usize,
    skipped: usize,
    empty: usize,
}

/// Scrapes every titled row in range, writing and saving after each one.
///
/// A row that fails is logged and left untouched; the loop carries on.
pub async fn run<S: PageSource>(
    source: &S,
    sheet: &mut Sheet,
    layout: &ColumnLayout,
    options: &RunOptions,
) -> anyhow::Result<Summary> {
    let start = options.start_row.max(1);
    let past_last = sheet.last_row() + 1;
    let end = match options.num_movies {
        Some(n) => start.saturating_add(n).min(past_last),
        None => past_last,
    };
    let mut summary = Summary::default();

    for row in start..end {
        let Some(title) = title_at(sheet, layout, row) else {
            summary.empty += 1;
            continue;
        };
        info!("Row {row}: {:?}", title.raw());

        match Resolver::new(source, &title).scrape().await {
            Ok(record) => {
                sheet.write_record(row, layout, &record)?;
                summary.written += 1;
                info!(
                    "  → Written: Genre, Prod Countries, Finance, Director, Cast, {} territories.",
                    record.territories.len()
                );
            }
            Err(e) => {
                summary.skipped += 1;
                warn!("  → Skipping row {row}: {e:#}");
            }
        }

        if !options.dry_run {
            // Keep going even if this save fails; the next one may succeed.
            match sheet.save() {
                Ok(()) => info!("  → Saved {:?} through row {row}.", sheet.path()),
                Err(e) => error!("  !! Failed to save after row {row}: {e:#}"),
            }
        }
        if row + 1 < end {
            sleep(options.request_interval).await;
        }
    }

    info!(
        "Done: {} written, {} skipped, {} rows without a title.",
        summary.written, summary.skipped, summary.empty
    );
    Ok(summary)
}

fn title_at(sheet: &Sheet, layout: &ColumnLayout, row: usize) -> Option<MovieTitle> {
    let cell = sheet.cell(row, layout.title)?.trim();
    if cell.is_empty() {
        return None;
    }
    let year = layout
        .year
        .and_then(|column| sheet.cell(row, column))
        .and_then(|year| year.trim().parse().ok());
    Some(MovieTitle::parse(cell).with_fallback_year(year))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;
    use scraper::Html;

    use crate::{
        api::PageSource,
        config::ColumnLayout,
        schema::Slug,
        sheet::{ColumnRef, Sheet},
    };

    use super::{run, title_at, RunOptions};

    struct FakeSite(HashMap<String, String>);

    impl PageSource for FakeSite {
        async fn movie_page(&self, slug: &Slug) -> anyhow::Result<Html> {
            let html = self.0.get(slug.as_str()).ok_or_else(|| anyhow!("404"))?;
            Ok(Html::parse_document(html))
        }

        async fn search_page(&self, _: &str) -> anyhow::Result<Html> {
            Err(anyhow!("search down"))
        }

        async fn international_chart(&self, _: &Slug) -> Option<String> {
            Some("google.visualization.arrayToDataTable([['Region','Box Office'],['Japan',5],['Korea',7]]);".to_owned())
        }
    }

    #[tokio::test]
    async fn writes_found_rows_and_skips_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Data_Capture.csv");
        std::fs::write(
            &path,
            "Header,Title\nx,\ny,Jurassic World\nz,Unknown Movie\nw,Jurassic World,,,,old\n",
        )
        .unwrap();
        let site = FakeSite(HashMap::from([(
            "Jurassic-World".to_owned(),
            r#"<table><tr><td>Genre:</td><td>Action</td></tr></table>"#.to_owned(),
        )]));

        let mut sheet = Sheet::load(&path, None).unwrap();
        let layout = ColumnLayout::default();
        let options = RunOptions::builder().start_row(2).build();
        let summary = run(&site, &mut sheet, &layout, &options).await.unwrap();
        assert_eq!(summary.written(), 2);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.empty(), 1);

        let sheet = Sheet::load(&path, None).unwrap();
        let col = |s: &str| s.parse::<ColumnRef>().unwrap();
        assert_eq!(sheet.cell(3, col("F")), Some("Action"));
        assert_eq!(sheet.cell(3, col("M")), Some("Japan"));
        assert_eq!(sheet.cell(3, col("P")), Some("$7"));
        assert_eq!(sheet.cell(4, col("F")), None);
        assert_eq!(sheet.cell(5, col("A")), Some("w"));
        assert_eq!(sheet.cell(5, col("F")), Some("Action"));
        assert_eq!(sheet.cell(5, col("Q")), Some(""));
    }

    #[tokio::test]
    async fn dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let original = "a,Jurassic World\n";
        std::fs::write(&path, original).unwrap();
        let site = FakeSite(HashMap::from([(
            "Jurassic-World".to_owned(),
            "<p></p>".to_owned(),
        )]));
        let mut sheet = Sheet::load(&path, None).unwrap();
        let options = RunOptions::builder()
            .start_row(1)
            .num_movies(Some(1))
            .dry_run(true)
            .build();
        run(&site, &mut sheet, &ColumnLayout::default(), &options)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn huge_movie_count_stops_at_the_last_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,Jurassic World\nb,\n").unwrap();
        let site = FakeSite(HashMap::from([(
            "Jurassic-World".to_owned(),
            "<p></p>".to_owned(),
        )]));
        let mut sheet = Sheet::load(&path, None).unwrap();
        let options = RunOptions::builder()
            .start_row(1)
            .num_movies(Some(usize::MAX))
            .dry_run(true)
            .build();
        let summary = run(&site, &mut sheet, &ColumnLayout::default(), &options)
            .await
            .unwrap();
        assert_eq!(summary.written(), 1);
        assert_eq!(summary.empty(), 1);
    }

    #[test]
    fn year_column_backs_up_the_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "Dune,2021\nDune (1984),2021\n").unwrap();
        let sheet = Sheet::load(&path, None).unwrap();
        let layout = ColumnLayout::builder()
            .title("A".parse().unwrap())
            .year(Some("B".parse().unwrap()))
            .build();
        assert_eq!(title_at(&sheet, &layout, 1).unwrap().year(), Some(2021));
        assert_eq!(title_at(&sheet, &layout, 2).unwrap().year(), Some(1984));
        assert_eq!(title_at(&sheet, &layout, 3), None);
    }
}
