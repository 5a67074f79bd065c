use std::time::Duration;

use serde::Deserialize;
use typed_builder::TypedBuilder;
use url::Url;

use crate::sheet::ColumnRef;

/// Settings read from the optional TOML file.  Every key has a default.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub columns: ColumnLayout,
}

#[derive(Clone, Debug, Deserialize, TypedBuilder)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    #[builder(default = default_base_url())]
    pub base_url: Url,
    #[builder(default = DEFAULT_USER_AGENT.to_owned())]
    pub user_agent: String,
}
impl Default for SiteConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

fn default_base_url() -> Url {
    Url::parse("https://www.the-numbers.com/").expect("Constant URL is valid")
}

#[derive(Clone, Debug, Deserialize, TypedBuilder)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    /// Attempts per page before giving up.
    #[builder(default = 3)]
    pub max_retries: u32,
    #[builder(default = 5)]
    pub retry_delay_secs: u64,
    #[builder(default = 8)]
    pub timeout_secs: u64,
    /// The international chart is fetched once, but with a longer timeout.
    #[builder(default = 15)]
    pub international_timeout_secs: u64,
    /// Pause between spreadsheet rows.
    #[builder(default = 1)]
    pub request_interval_secs: u64,
}
impl Default for FetchConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
impl FetchConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn international_timeout(&self) -> Duration {
        Duration::from_secs(self.international_timeout_secs)
    }
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(self.request_interval_secs)
    }
}

/// Where each field lives in the spreadsheet.
#[derive(Clone, Debug, Deserialize, TypedBuilder)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnLayout {
    #[builder(default = col("B"))]
    pub title: ColumnRef,
    /// Optional column holding the release year, consulted when the title has none.
    #[builder(default)]
    pub year: Option<ColumnRef>,
    #[builder(default = col("F"))]
    pub genre: ColumnRef,
    #[builder(default = col("G"))]
    pub director: ColumnRef,
    #[builder(default = [col("H"), col("I"), col("J")])]
    pub cast: [ColumnRef; 3],
    #[builder(default = col("K"))]
    pub production_countries: ColumnRef,
    #[builder(default = col("L"))]
    pub finance: ColumnRef,
    /// (country, revenue) column pairs, filled in order.
    #[builder(default = default_territories())]
    pub territories: Vec<(ColumnRef, ColumnRef)>,
}
impl Default for ColumnLayout {
    fn default() -> Self {
        Self::builder().build()
    }
}

fn col(letters: &str) -> ColumnRef {
    letters.parse().expect("Constant column letters are valid")
}

fn default_territories() -> Vec<(ColumnRef, ColumnRef)> {
    [
        ("M", "N"),
        ("O", "P"),
        ("Q", "R"),
        ("S", "T"),
        ("U", "V"),
        ("W", "X"),
        ("Y", "Z"),
        ("AA", "AB"),
    ]
    .into_iter()
    .map(|(country, revenue)| (col(country), col(revenue)))
    .collect()
}
