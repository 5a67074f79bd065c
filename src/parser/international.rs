//! Per-territory box office, from the chart script or the territory table.

use box_office_scraping_utils::{regex, selector};
use log::debug;
use scraper::Html;

use crate::schema::{Revenue, TerritoryPair};

use super::stripped_text;

/// Reads the rows passed to `google.visualization.arrayToDataTable` in the
/// international iframe's script.
///
/// Only `['Country', 12345.00]` rows are data, so the string-only header row is never returned.
pub fn parse_chart(script: &str) -> Vec<TerritoryPair> {
    let Some(body) =
        regex!(r"(?s)google\.visualization\.arrayToDataTable\(\s*\[(.*?)\]\s*\);").captures(script)
    else {
        debug!("No chart data found in the international iframe");
        return vec![];
    };
    let body = body[1].replace(['\n', '\r'], "");
    regex!(r"\[\s*'((?:[^'\\]|\\.)+)'\s*,\s*([\d.]+)\s*\]")
        .captures_iter(&body)
        .map(|caps| TerritoryPair {
            country: unescape(&caps[1]),
            revenue: Revenue::from_amount(&caps[2]),
        })
        .collect()
}

/// Reads the territory breakdown table on a movie page.
///
/// Used when the chart is missing.  The first cell is the territory and
/// the last cell carrying a dollar amount is its total.
pub fn parse_table(html: &Html) -> Vec<TerritoryPair> {
    let Some(table) = html.select(selector!("table")).find(|table| {
        table
            .select(selector!("th"))
            .any(|th| stripped_text(th, " ").to_lowercase().contains("territory"))
    }) else {
        return vec![];
    };
    table
        .select(selector!("tr"))
        .filter_map(|tr| {
            let cells = tr.select(selector!("td")).collect::<Vec<_>>();
            let country = stripped_text(*cells.first()?, " ");
            if country.is_empty() || country.to_lowercase().starts_with("total") {
                return None;
            }
            let amount = cells[1..]
                .iter()
                .rev()
                .map(|&td| stripped_text(td, ""))
                .find(|text| text.contains('$'))?;
            Some(TerritoryPair {
                country,
                revenue: Revenue::from_display(&amount),
            })
        })
        .collect()
}

fn unescape(s: &str) -> String {
    let mut res = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => res.extend(chars.next()),
            c => res.push(c),
        }
    }
    res
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::{parse_chart, parse_table};

    const IFRAME: &str = r#"
<script type="text/javascript">
  google.charts.load('current', {'packages':['geochart']});
  function drawRegionsMap() {
    var data = google.visualization.arrayToDataTable([
      ['Region', 'Box Office'],
      ['China', 228739535.00],
      ['United Kingdom', 65430216.00],
      ['Côte d\'Ivoire', 12.5],
      [ 'Japan' , 71000000 ]
    ]);
    var chart = new google.visualization.GeoChart(document.getElementById('regions_div'));
  }
</script>
"#;

    #[test]
    fn chart_rows_without_header() {
        let pairs = parse_chart(IFRAME);
        let rows = pairs
            .iter()
            .map(|p| (p.country.as_str(), p.revenue.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            [
                ("China", "$228,739,535"),
                ("United Kingdom", "$65,430,216"),
                ("Côte d'Ivoire", "$12"),
                ("Japan", "$71,000,000"),
            ]
        );
    }

    #[test]
    fn chart_missing() {
        assert!(parse_chart("<html><body>No data</body></html>").is_empty());
        assert!(parse_chart("google.visualization.arrayToDataTable([ ['Region', 'Box Office'] ]);").is_empty());
    }

    #[test]
    fn unreadable_amount_keeps_the_country() {
        let pairs = parse_chart("google.visualization.arrayToDataTable([['Peru', 1.2.3]]);");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].country, "Peru");
        assert_eq!(pairs[0].revenue.as_str(), "");
    }

    #[test]
    fn territory_table() {
        let html = Html::parse_document(
            r#"
<table>
  <tr><th>Territory</th><th>Release Date</th><th>Opening<br>Weekend</th><th>Total<br>Box Office</th></tr>
  <tr><td><a href="/box-office-chart/daily/China">China</a></td><td>6/10/2015</td><td>$100,000</td><td>$228,739,535</td></tr>
  <tr><td>Germany</td><td>6/11/2015</td><td>$5</td><td>n/a</td></tr>
  <tr><td>Iceland</td><td>6/11/2015</td><td></td><td></td></tr>
  <tr><td>Total</td><td></td><td></td><td>$1,000</td></tr>
</table>"#,
        );
        let rows = parse_table(&html)
            .into_iter()
            .map(|p| (p.country, p.revenue.as_str().to_owned()))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            [
                ("China".to_owned(), "$228,739,535".to_owned()),
                ("Germany".to_owned(), "$5".to_owned()),
            ]
        );
    }

    #[test]
    fn no_territory_table() {
        let html = Html::parse_document("<table><tr><th>Date</th></tr><tr><td>x</td></tr></table>");
        assert!(parse_table(&html).is_empty());
    }
}
