use box_office_scraping_utils::regex;
use derive_more::{AsRef, Display};
use getset::{CopyGetters, Getters};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;
use url::form_urlencoded;

/// The path segment identifying a movie page, e.g. `Black-Panther-(2018)`.
///
/// Stored in percent-encoded form, normalized so that `Black-Panther-%282018%29`
/// and `Black-Panther-(2018)` compare equal.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display, AsRef, Serialize)]
#[as_ref(forward)]
pub struct Slug(String);

impl Slug {
    /// Normalizes a raw path segment as found in a link or in page metadata.
    pub fn from_segment(segment: &str) -> Self {
        let decoded = urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_owned());
        Self::encode(&decoded)
    }

    pub(crate) fn encode(plain: &str) -> Self {
        Self(form_urlencoded::byte_serialize(plain.as_bytes()).collect())
    }

    /// Whether the site handed us something other than a movie page,
    /// such as its custom search form or the budgets listing.
    pub fn is_placeholder(&self) -> bool {
        let lower = self.0.to_lowercase();
        lower.contains("custom-search") || lower.contains("budgets")
    }

    /// The release year embedded as `(YYYY)`, which the site uses to tell remakes apart.
    pub fn year(&self) -> Option<u16> {
        let decoded = urlencoding::decode(&self.0).ok()?;
        regex!(r"\((\d{4})\)")
            .captures(&decoded)
            .and_then(|caps| caps[1].parse().ok())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A title cell split into the name and an optional release year.
#[derive(Clone, PartialEq, Eq, Debug, Getters, CopyGetters)]
pub struct MovieTitle {
    /// The cell exactly as written, used to guess the slug.
    #[getset(get = "pub")]
    raw: String,
    /// The title without a trailing `(YYYY)`, used for searching.
    #[getset(get = "pub")]
    name: String,
    #[getset(get_copy = "pub")]
    year: Option<u16>,
}

impl MovieTitle {
    pub fn parse(cell: &str) -> Self {
        let raw = cell.trim().to_owned();
        let split = regex!(r"^(.*?)\s*\((\d{4})\)\s*$")
            .captures(&raw)
            .filter(|caps| !caps[1].trim().is_empty())
            .map(|caps| (caps[1].trim().to_owned(), caps[2].parse().ok()));
        let (name, year) = split.unwrap_or_else(|| (raw.clone(), None));
        Self { raw, name, year }
    }

    /// Supplies a year from a dedicated column when the title itself has none.
    pub fn with_fallback_year(mut self, year: Option<u16>) -> Self {
        self.year = self.year.or(year);
        self
    }
}

impl std::fmt::Display for MovieTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Box office amount rendered as `$1,234,567`, or empty when the source was unreadable.
#[derive(Clone, Default, PartialEq, Eq, Debug, Display, AsRef, Serialize)]
#[as_ref(forward)]
pub struct Revenue(String);

impl Revenue {
    /// Truncates toward zero, matching how the site's chart values are reported in whole dollars.
    pub fn from_amount(amount: &str) -> Self {
        match amount.parse::<f64>() {
            Ok(value) if value.is_finite() && value >= 0.0 => {
                let dollars = value.trunc() as u64;
                Self(format!("${}", dollars.to_formatted_string(&Locale::en)))
            }
            _ => Self::default(),
        }
    }

    /// Reads an already formatted cell such as `$12,345,678` or `12345678.00`.
    pub fn from_display(text: &str) -> Self {
        let digits = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect::<String>();
        Self::from_amount(&digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct TerritoryPair {
    pub country: String,
    pub revenue: Revenue,
}

/// Fields read from a movie page's summary and cast-and-crew tabs.
#[derive(Clone, Default, PartialEq, Eq, Debug, Serialize)]
pub struct MovieDetails {
    pub genre: String,
    pub director: String,
    pub cast: [String; 3],
    pub production_countries: String,
    pub finance: String,
}

/// One spreadsheet row's worth of data.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct MovieRecord {
    pub slug: Slug,
    pub details: MovieDetails,
    pub territories: Vec<TerritoryPair>,
}
