//! Search result page: candidate movies and picking the one meant by a title.

use box_office_scraping_utils::{regex, selector};
use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use itertools::Itertools;
use log::{debug, trace};
use scraper::{ElementRef, Html};

use crate::{
    schema::{MovieTitle, Slug},
    slug::slug_from_href,
};

use super::stripped_text;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Candidate {
    pub slug: Slug,
    pub title: String,
    pub year: Option<u16>,
}

/// Every distinct movie linked from the page, in page order.
pub fn parse(html: &Html) -> Vec<Candidate> {
    html.select(selector!(r#"a[href^="/movie/"]"#))
        .filter_map(|a| {
            let slug = slug_from_href(a.attr("href")?)?;
            let year = slug.year().or_else(|| year_in_row(a));
            Some(Candidate {
                title: stripped_text(a, " "),
                year,
                slug,
            })
        })
        .unique_by(|candidate| candidate.slug.clone())
        .collect()
}

/// The release year shown in another cell of the result row, if any.
fn year_in_row(a: ElementRef) -> Option<u16> {
    let tr = a
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")?;
    tr.select(selector!("td"))
        .filter(|td| !td.descendants().any(|node| node.id() == a.id()))
        .find_map(|td| {
            regex!(r"\b(1[89]\d{2}|20\d{2})\b")
                .captures(&stripped_text(td, " "))
                .and_then(|caps| caps[1].parse().ok())
        })
}

/// Picks the candidate that best matches `title`.
///
/// Fuzzy title similarity decides, an exact (normalized) title and a matching year weigh heavily,
/// and the earlier result wins a tie.
pub fn best_match<'a>(title: &MovieTitle, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
    let matcher = SkimMatcherV2::default().ignore_case();
    let query = normalize(title.name());
    let mut best: Option<(i64, &Candidate)> = None;
    for candidate in candidates {
        let score = score(&matcher, &query, title.year(), candidate);
        trace!("  Candidate {:?} scored {score}", candidate.slug.as_str());
        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, candidate));
        }
    }
    if let Some((score, candidate)) = best {
        debug!("Best search candidate: {} (score {score})", candidate.slug);
    }
    best.map(|(_, candidate)| candidate)
}

fn score(matcher: &SkimMatcherV2, query: &str, year: Option<u16>, candidate: &Candidate) -> i64 {
    let name = normalize(&candidate.title);
    let mut score = matcher.fuzzy_match(&name, query).unwrap_or(0);
    if !name.is_empty() && name == query {
        score += 1000;
    }
    match (year, candidate.year) {
        (Some(expected), Some(found)) if expected == found => score += 500,
        (Some(expected), Some(found)) if expected.abs_diff(found) == 1 => score += 200,
        (Some(_), Some(_)) => score -= 300,
        _ => {}
    }
    score
}

/// Lowercase, `&` spelled out, punctuation dropped and a leading article removed.
fn normalize(title: &str) -> String {
    let lower = title.to_lowercase().replace('&', " and ");
    let words = lower
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>();
    let mut words = words.split_whitespace().peekable();
    if words.peek().is_some_and(|&w| ["the", "a", "an"].contains(&w)) {
        words.next();
    }
    words.join(" ")
}
