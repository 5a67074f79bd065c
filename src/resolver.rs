//! Finding the right movie page for a title and scraping it.
//!
//! Resolution escalates through three strategies:
//! 1. guess a slug from the title and follow the page's canonical slug,
//! 2. if that lands on a search or budgets page, pick a movie from the site's search,
//! 3. if the chosen movie has no international data, try the search's pick instead.

use anyhow::{bail, Context};
use log::{debug, info, warn};
use scraper::Html;

use crate::{
    api::PageSource,
    parser::{international, movie_page, search},
    schema::{MovieRecord, MovieTitle, Slug, TerritoryPair},
    slug::{canonical_slug, slugify},
};

/// Resolves and scrapes one title.  The search page is fetched at most once.
pub struct Resolver<'a, S> {
    source: &'a S,
    title: &'a MovieTitle,
    searched: Option<Option<Slug>>,
}

impl<'a, S: PageSource> Resolver<'a, S> {
    pub fn new(source: &'a S, title: &'a MovieTitle) -> Self {
        Self {
            source,
            title,
            searched: None,
        }
    }

    /// Scrapes every field for the title.
    ///
    /// Fails only if no movie page could be found; missing fields are left empty.
    pub async fn scrape(mut self) -> anyhow::Result<MovieRecord> {
        let (slug, page) = self.resolve().await?;
        let details = movie_page::parse(&page);
        let (slug, territories) = self.territories(slug, &page).await;
        Ok(MovieRecord {
            slug,
            details,
            territories,
        })
    }

    /// Strategies 1 and 2: the slug and page to extract from.
    pub async fn resolve(&mut self) -> anyhow::Result<(Slug, Html)> {
        let guessed = slugify(self.title.raw());
        let page = self
            .source
            .movie_page(&guessed)
            .await
            .with_context(|| format!("Could not fetch the page for guessed slug {guessed}"))?;
        let slug = match canonical_slug(&page) {
            Some(canonical) => canonical,
            None => {
                debug!("  No canonical slug, keeping the guess");
                guessed.clone()
            }
        };
        info!("  → Raw canonical slug: {slug}");

        if !slug.is_placeholder() {
            return Ok((slug, page));
        }

        let Some(found) = self.search().await else {
            bail!("Search fallback found no movie for {:?}", self.title.name());
        };
        info!("  → Fallback search slug: {found}");
        let page = self
            .source
            .movie_page(&found)
            .await
            .with_context(|| format!("Could not fetch the page for {found}"))?;
        Ok((found, page))
    }

    /// Strategy 3 on top of the chart and table parsers.
    ///
    /// Returns the slug the territories belong to, which differs from `slug`
    /// only when the search's pick had data and `slug` had none.
    pub async fn territories(&mut self, slug: Slug, page: &Html) -> (Slug, Vec<TerritoryPair>) {
        let pairs = self.chart(&slug).await;
        if !pairs.is_empty() {
            return (slug, pairs);
        }
        let pairs = international::parse_table(page);
        if !pairs.is_empty() {
            debug!("  Territories read from the movie page table");
            return (slug, pairs);
        }

        match self.search().await {
            Some(alternative) if alternative != slug => {
                info!("  → Retrying international data with fallback slug: {alternative}");
                let pairs = self.chart(&alternative).await;
                if pairs.is_empty() {
                    info!("    → Fallback slug has no territories either");
                    (slug, pairs)
                } else {
                    info!("    → Found {} territories on fallback slug", pairs.len());
                    (alternative, pairs)
                }
            }
            _ => {
                info!("  → No other candidate, keeping zero territories");
                (slug, vec![])
            }
        }
    }

    async fn chart(&self, slug: &Slug) -> Vec<TerritoryPair> {
        match self.source.international_chart(slug).await {
            Some(script) => international::parse_chart(&script),
            None => vec![],
        }
    }

    /// Best search candidate for the title, memoized.  Fetch failures count as no candidate.
    async fn search(&mut self) -> Option<Slug> {
        if let Some(searched) = &self.searched {
            return searched.clone();
        }
        let found = match self.source.search_page(self.title.name()).await {
            Ok(html) => {
                let candidates = search::parse(&html);
                debug!("  {} search candidates", candidates.len());
                search::best_match(self.title, &candidates).map(|c| c.slug.clone())
            }
            Err(e) => {
                warn!("  ! Search failed: {e:#}");
                None
            }
        };
        self.searched = Some(found.clone());
        found
    }
}
