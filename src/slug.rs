//! Turning titles, links and page metadata into [`Slug`]s.

use box_office_scraping_utils::{regex, selector};
use itertools::Itertools;
use scraper::Html;
use url::Url;

use crate::schema::Slug;

/// Guesses the slug the site would use for `title`.
///
/// Everything except ASCII letters, digits, spaces, hyphens and parentheses is dropped,
/// then the remaining words are joined with hyphens.
/// `"Black Panther (2018)"` becomes `Black-Panther-(2018)`.
pub fn slugify(title: &str) -> Slug {
    let kept = regex!(r"[^A-Za-z0-9 \-()]+").replace_all(title, "");
    Slug::encode(&kept.split_whitespace().join("-"))
}

/// Reads the slug the site reports for the page via `<meta property="og:url">`.
pub fn canonical_slug(html: &Html) -> Option<Slug> {
    let content = html
        .select(selector!(r#"meta[property="og:url"]"#))
        .next()?
        .attr("content")
        .filter(|content| !content.trim().is_empty())?;
    let url = Url::parse(content.trim()).ok()?;
    last_segment(url.path())
}

/// Extracts the slug from a relative movie link such as `/movie/Jurassic-World#tab=summary`.
///
/// Links into the budgets listing are not movie pages and yield `None`.
pub fn slug_from_href(href: &str) -> Option<Slug> {
    let path = href.split(['#', '?']).next()?;
    let rest = path.strip_prefix("/movie/")?;
    if rest.starts_with("budgets") {
        return None;
    }
    last_segment(rest)
}

fn last_segment(path: &str) -> Option<Slug> {
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    (!segment.is_empty()).then(|| Slug::from_segment(segment))
}
