pub mod international;
pub mod movie_page;
pub mod search;

use itertools::Itertools;
use scraper::ElementRef;

/// Text of every descendant text node, each trimmed, empty ones dropped, joined by `sep`.
pub(crate) fn stripped_text(e: ElementRef, sep: &str) -> String {
    e.text().map(str::trim).filter(|s| !s.is_empty()).join(sep)
}

/// The next sibling element with the given tag name.
pub(crate) fn next_sibling_named<'a>(e: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    e.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == name)
}
