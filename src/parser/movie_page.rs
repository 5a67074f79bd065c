use box_office_scraping_utils::selector;
use log::trace;
use scraper::{ElementRef, Html};

use crate::schema::MovieDetails;

use super::{next_sibling_named, stripped_text};

/// Reads every field a movie page offers.
///
/// The summary and cast-and-crew tabs live on the same document, so one page serves both.
/// Missing sections leave the corresponding fields empty.
pub fn parse(html: &Html) -> MovieDetails {
    MovieDetails {
        genre: genre(html),
        director: director(html),
        cast: cast(html),
        production_countries: production_countries(html),
        finance: finance(html),
    }
}

pub fn genre(html: &Html) -> String {
    labelled_cell(html, "Genre:")
        .map(|td| stripped_text(td, ""))
        .unwrap_or_default()
}

pub fn production_countries(html: &Html) -> String {
    labelled_cell(html, "Production Countries:")
        .map(|td| stripped_text(td, ";"))
        .unwrap_or_default()
}

pub fn finance(html: &Html) -> String {
    html.select(selector!("table#movie_finances"))
        .next()
        .and_then(|table| table.select(selector!("td.data")).next())
        .map(|td| stripped_text(td, ""))
        .unwrap_or_default()
}

pub fn director(html: &Html) -> String {
    let Some(table) = credits_table(html) else {
        trace!("Production credits table not found");
        return String::new();
    };
    table
        .select(selector!("tr"))
        .find_map(|tr| {
            let cells = tr.select(selector!("td")).collect::<Vec<_>>();
            (cells.len() >= 3 && stripped_text(cells[2], "").eq_ignore_ascii_case("director"))
                .then(|| stripped_text(cells[0], ""))
        })
        .unwrap_or_default()
}

/// The first three billed cast members, padded with empty names.
pub fn cast(html: &Html) -> [String; 3] {
    let mut res: [String; 3] = Default::default();
    if let Some(div) = html.select(selector!("div.cast_new")).next() {
        for (slot, b) in res.iter_mut().zip(div.select(selector!("b"))) {
            *slot = stripped_text(b, "");
        }
    }
    res
}

/// The value cell next to the innermost `td` whose text contains `label`.
fn labelled_cell<'a>(html: &'a Html, label: &str) -> Option<ElementRef<'a>> {
    html.select(selector!("td"))
        .filter(|td| td.select(selector!("td")).next().is_none())
        .find(|td| td.text().collect::<String>().contains(label))
        .and_then(|td| next_sibling_named(td, "td"))
}

/// The first table after the "Production and Technical Credits" heading.
fn credits_table(html: &Html) -> Option<ElementRef> {
    html.select(selector!("h1, table"))
        .skip_while(|e| {
            e.value().name() != "h1"
                || !e
                    .text()
                    .collect::<String>()
                    .contains("Production and Technical Credits")
        })
        .find(|e| e.value().name() == "table")
}
