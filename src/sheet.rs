//! The spreadsheet: a delimited text file addressed by row number and column letters.

use std::{
    fmt::Display,
    iter,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use csv::StringRecord;
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::{config::ColumnLayout, schema::MovieRecord};

/// Zero-based column index, written and parsed as spreadsheet letters (`A`, `Z`, `AA`, …).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ColumnRef(usize);

impl ColumnRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Rows are numbered from 1")]
pub struct RowZero;

#[derive(Debug, thiserror::Error)]
pub enum ColumnError {
    #[error("Column reference is empty")]
    Empty,
    #[error("Column reference {0:?} must consist of letters A-Z only")]
    NotLetters(String),
    #[error("Column reference {0:?} is too large")]
    TooLarge(String),
}

impl FromStr for ColumnRef {
    type Err = ColumnError;

    fn from_str(s: &str) -> Result<Self, ColumnError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColumnError::Empty);
        }
        let mut number = 0usize;
        for c in s.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(ColumnError::NotLetters(s.to_owned()));
            }
            let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
            number = number
                .checked_mul(26)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(|| ColumnError::TooLarge(s.to_owned()))?;
        }
        Ok(Self(number - 1))
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut letters = vec![];
        let mut n = self.0 + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        f.write_str(&String::from_utf8_lossy(&letters))
    }
}

impl<'de> Deserialize<'de> for ColumnRef {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        String::deserialize(d)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

/// A whole spreadsheet held in memory.
///
/// Rows are 1-based to match what a spreadsheet program shows.
/// Rows may have different lengths; cells outside what is written are kept as they were.
#[derive(Debug)]
pub struct Sheet {
    path: PathBuf,
    delimiter: u8,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Loads `path`.  Without an explicit delimiter, `.tsv` files are tab-separated
    /// and everything else is comma-separated.
    ///
    /// Blank lines are kept as empty rows so row numbers match the file.
    pub fn load(path: impl Into<PathBuf>, delimiter: Option<u8>) -> anyhow::Result<Self> {
        let path = path.into();
        let delimiter = delimiter.unwrap_or_else(|| default_delimiter(&path));
        let text = fs_err::read_to_string(&path)?;
        let rows = read_rows(&text, delimiter).with_context(|| format!("While reading {path:?}"))?;
        debug!("Loaded {} rows from {path:?}", rows.len());
        Ok(Self {
            path,
            delimiter,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of the last row present in the file.
    pub fn last_row(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, column: ColumnRef) -> Option<&str> {
        self.rows
            .get(row.checked_sub(1)?)?
            .get(column.index())
            .map(String::as_str)
    }

    /// Sets a cell, growing the sheet with empty cells as needed.
    pub fn set(
        &mut self,
        row: usize,
        column: ColumnRef,
        value: impl Into<String>,
    ) -> Result<(), RowZero> {
        if row == 0 {
            return Err(RowZero);
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() <= column.index() {
            cells.resize_with(column.index() + 1, String::new);
        }
        cells[column.index()] = value.into();
        Ok(())
    }

    /// Writes every output column of `row`.  Territory slots beyond `record.territories` are blanked.
    pub fn write_record(
        &mut self,
        row: usize,
        layout: &ColumnLayout,
        record: &MovieRecord,
    ) -> Result<(), RowZero> {
        let details = &record.details;
        self.set(row, layout.genre, &details.genre)?;
        self.set(row, layout.director, &details.director)?;
        for (&column, name) in layout.cast.iter().zip(&details.cast) {
            self.set(row, column, name)?;
        }
        self.set(row, layout.production_countries, &details.production_countries)?;
        self.set(row, layout.finance, &details.finance)?;
        let mut territories = record.territories.iter();
        for &(country_column, revenue_column) in &layout.territories {
            let (country, revenue) = territories
                .next()
                .map_or(("", ""), |pair| (&pair.country[..], pair.revenue.as_str()));
            self.set(row, country_column, country)?;
            self.set(row, revenue_column, revenue)?;
        }
        Ok(())
    }

    /// Writes the sheet next to the original and renames it into place.
    pub fn save(&self) -> anyhow::Result<()> {
        let tmp = self.path.with_extension("tmp");
        (|| {
            let mut builder = csv::WriterBuilder::new();
            builder.flexible(true).delimiter(self.delimiter);
            let mut bytes = vec![];
            for row in &self.rows {
                if row.is_empty() {
                    bytes.push(b'\n');
                } else {
                    let mut writer = builder.from_writer(&mut bytes);
                    writer.write_record(row)?;
                    writer.flush()?;
                }
            }
            fs_err::write(&tmp, bytes)?;
            fs_err::rename(&tmp, &self.path)?;
            anyhow::Ok(())
        })()
        .with_context(|| format!("While saving {:?}", self.path))
    }
}

/// Parses every record, inserting an empty row for each blank line the `csv` reader skips.
fn read_rows(text: &str, delimiter: u8) -> csv::Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());
    let mut rows = vec![];
    let mut record = StringRecord::new();
    let mut consumed = 0;
    while reader.read_record(&mut record)? {
        rows.extend(iter::repeat_with(Vec::new).take(blank_lines_at(text, consumed)));
        rows.push(record.iter().map(str::to_owned).collect());
        consumed = reader.position().byte() as usize;
    }
    rows.extend(iter::repeat_with(Vec::new).take(blank_lines_at(text, consumed)));
    Ok(rows)
}

/// Counts the blank lines starting at byte `start`, right after a record (or at the top).
fn blank_lines_at(text: &str, start: usize) -> usize {
    let rest = &text[start..];
    let mut run = &rest[..rest.len() - rest.trim_start_matches(['\r', '\n']).len()];
    match text[..start].chars().next_back() {
        // The previous record's terminator has not been consumed yet.
        Some(c) if c != '\r' && c != '\n' => {
            run = run
                .strip_prefix("\r\n")
                .or_else(|| run.strip_prefix(['\r', '\n']))
                .unwrap_or(run);
        }
        Some('\r') => run = run.strip_prefix('\n').unwrap_or(run),
        _ => {}
    }
    run.replace("\r\n", "\n").len()
}

fn default_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ColumnLayout,
        schema::{MovieDetails, MovieRecord, Revenue, TerritoryPair},
        slug::slugify,
    };

    use super::{ColumnRef, Sheet};

    fn col(s: &str) -> ColumnRef {
        s.parse().unwrap()
    }

    #[test]
    fn column_letters() {
        for (letters, index) in [("A", 0), ("Z", 25), ("AA", 26), ("AB", 27), ("AZ", 51), ("BA", 52), ("ZZ", 701), ("AAA", 702)] {
            assert_eq!(col(letters).index(), index, "{letters}");
            assert_eq!(col(letters).to_string(), letters);
        }
        assert_eq!(col("ab"), col("AB"));
        assert!("".parse::<ColumnRef>().is_err());
        assert!("A1".parse::<ColumnRef>().is_err());
        assert!("ZZZZZZZZZZZZZZZZZZZZZ".parse::<ColumnRef>().is_err());
    }

    #[test]
    fn load_set_and_save_preserves_other_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(
            &path,
            "Id,Title,Notes\n1,Jurassic World,\"keep, me\"\n2,,\n",
        )
        .unwrap();

        let mut sheet = Sheet::load(&path, None).unwrap();
        assert_eq!(sheet.last_row(), 3);
        assert_eq!(sheet.cell(2, col("B")), Some("Jurassic World"));
        assert_eq!(sheet.cell(3, col("B")), Some(""));
        assert_eq!(sheet.cell(4, col("B")), None);
        assert_eq!(sheet.cell(0, col("B")), None);

        sheet.set(2, col("E"), "Action").unwrap();
        sheet.set(4, col("B"), "Dune").unwrap();
        sheet.save().unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            saved,
            "Id,Title,Notes\n1,Jurassic World,\"keep, me\",,Action\n2,,\n,Dune\n"
        );
        assert!(!dir.path().join("data.tmp").exists());
    }

    #[test]
    fn blank_lines_keep_their_row_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "Header,Title\n\nx,Jurassic World\n").unwrap();

        let mut sheet = Sheet::load(&path, None).unwrap();
        assert_eq!(sheet.last_row(), 3);
        assert_eq!(sheet.cell(2, col("B")), None);
        assert_eq!(sheet.cell(3, col("B")), Some("Jurassic World"));

        sheet.set(3, col("F"), "Action").unwrap();
        sheet.save().unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Header,Title\n\nx,Jurassic World,,,,Action\n"
        );
        assert_eq!(Sheet::load(&path, None).unwrap().last_row(), 3);
    }

    #[test]
    fn blank_lines_with_crlf_and_at_the_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "\r\na\r\n\r\n\r\nb\r\n\n").unwrap();
        let sheet = Sheet::load(&path, None).unwrap();
        assert_eq!(sheet.last_row(), 6);
        assert_eq!(sheet.cell(1, col("A")), None);
        assert_eq!(sheet.cell(2, col("A")), Some("a"));
        assert_eq!(sheet.cell(5, col("A")), Some("b"));
        assert_eq!(sheet.cell(6, col("A")), None);

        sheet.save().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\na\n\n\nb\n\n");
    }

    #[test]
    fn quoted_line_breaks_are_not_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "\"a\n\nb\",c\nd\n").unwrap();
        let sheet = Sheet::load(&path, None).unwrap();
        assert_eq!(sheet.last_row(), 2);
        assert_eq!(sheet.cell(1, col("A")), Some("a\n\nb"));
        assert_eq!(sheet.cell(2, col("A")), Some("d"));
    }

    #[test]
    fn row_zero_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a\n").unwrap();
        let mut sheet = Sheet::load(&path, None).unwrap();
        assert!(sheet.set(0, col("A"), "x").is_err());
        assert_eq!(sheet.last_row(), 1);
        assert_eq!(sheet.cell(1, col("A")), Some("a"));
    }

    #[test]
    fn tsv_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.tsv");
        std::fs::write(&path, "a\tb, c\n").unwrap();
        let sheet = Sheet::load(&path, None).unwrap();
        assert_eq!(sheet.cell(1, col("B")), Some("b, c"));
    }

    #[test]
    fn write_record_blanks_unused_territories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "").unwrap();
        let mut sheet = Sheet::load(&path, None).unwrap();
        let layout = ColumnLayout::default();
        sheet.set(3, col("AB"), "stale").unwrap();

        let record = MovieRecord {
            slug: slugify("Jurassic World"),
            details: MovieDetails {
                genre: "Action".into(),
                director: "Colin Trevorrow".into(),
                cast: ["Chris Pratt".into(), "Bryce Dallas Howard".into(), String::new()],
                production_countries: "United States".into(),
                finance: "$652,306,625".into(),
            },
            territories: vec![TerritoryPair {
                country: "China".into(),
                revenue: Revenue::from_amount("228739535"),
            }],
        };
        sheet.write_record(3, &layout, &record).unwrap();

        assert_eq!(sheet.cell(3, col("F")), Some("Action"));
        assert_eq!(sheet.cell(3, col("G")), Some("Colin Trevorrow"));
        assert_eq!(sheet.cell(3, col("I")), Some("Bryce Dallas Howard"));
        assert_eq!(sheet.cell(3, col("J")), Some(""));
        assert_eq!(sheet.cell(3, col("K")), Some("United States"));
        assert_eq!(sheet.cell(3, col("L")), Some("$652,306,625"));
        assert_eq!(sheet.cell(3, col("M")), Some("China"));
        assert_eq!(sheet.cell(3, col("N")), Some("$228,739,535"));
        assert_eq!(sheet.cell(3, col("O")), Some(""));
        assert_eq!(sheet.cell(3, col("AB")), Some(""));
        assert_eq!(sheet.cell(3, col("A")), Some(""));
    }
}
