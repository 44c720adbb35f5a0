// src/calendar/dom.rs
//! DOM extraction for the economic calendar page.
//!
//! Works on rendered HTML so every heuristic can be exercised against fixture
//! pages without a browser. Row strategies are tried in order; the first one
//! that yields at least one valid row wins, even if a later one would also match.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::calendar::types::RawEventRow;

/// Row selectors, most specific first.
pub const ROW_SELECTORS: &[&str] = &[
    "table#economicCalendarData tbody tr.js-event-item",
    "tr.js-event-item",
    "tr[id^='eventRowId']",
    "table.calendar__table tr.calendar__row",
    "table tbody tr",
];

/// Markers for impact icons; the highest count across these is the icon score.
pub const IMPACT_ICON_SELECTORS: &[&str] = &[
    "i.grayFullBullishIcon",
    ".bullishIcon",
    "[data-img_key^='bull']",
    ".impact-icon",
    ".icon--impact",
];

/// Cells carrying an impact label; cell 2 is used when none is present.
const IMPACT_CELL_SELECTOR: &str = "td.sentiment, td.impact, td[class*='impact']";

/// Minimum length (in chars, exclusive) for a cell to be taken as the title.
const MIN_TITLE_CHARS: usize = 10;

static NUMERIC_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.\-+%]+$").expect("numeric regex"));

struct RowStrategy {
    css: String,
    selector: Selector,
}

pub struct DomExtractor {
    rows: Vec<RowStrategy>,
    icons: Vec<Selector>,
    impact_cell: Selector,
    header_cell: Selector,
}

impl Default for DomExtractor {
    fn default() -> Self {
        Self::with_row_selectors(ROW_SELECTORS)
    }
}

impl DomExtractor {
    /// Build with a custom ordered list of row selectors. Invalid CSS entries are
    /// dropped with a warning.
    pub fn with_row_selectors<S: AsRef<str>>(row_selectors: &[S]) -> Self {
        let rows = row_selectors
            .iter()
            .filter_map(|css| {
                let css = css.as_ref();
                match Selector::parse(css) {
                    Ok(selector) => Some(RowStrategy {
                        css: css.to_string(),
                        selector,
                    }),
                    Err(e) => {
                        warn!(target: "calendar", css, error = ?e, "invalid row selector dropped");
                        None
                    }
                }
            })
            .collect();

        let icons = IMPACT_ICON_SELECTORS
            .iter()
            .filter_map(|css| Selector::parse(css).ok())
            .collect();

        Self {
            rows,
            icons,
            impact_cell: Selector::parse(IMPACT_CELL_SELECTOR).expect("impact cell selector"),
            header_cell: Selector::parse("th").expect("th selector"),
        }
    }

    /// Extract rows from a rendered page. Empty when no strategy produced a valid row.
    pub fn extract(&self, html: &str) -> Vec<RawEventRow> {
        let doc = Html::parse_document(html);

        for strategy in &self.rows {
            let mut matched = 0usize;
            let out: Vec<RawEventRow> = doc
                .select(&strategy.selector)
                .inspect(|_| matched += 1)
                .filter_map(|row| self.extract_row(row))
                .collect();

            if !out.is_empty() {
                debug!(
                    target: "calendar",
                    selector = %strategy.css,
                    matched,
                    kept = out.len(),
                    "row strategy succeeded"
                );
                return out;
            }
            debug!(target: "calendar", selector = %strategy.css, matched, "row strategy yielded nothing");
        }
        Vec::new()
    }

    /// Extract one row. `None` for header rows, rows with fewer than four data
    /// cells, and rows without a usable title.
    pub fn extract_row(&self, row: ElementRef<'_>) -> Option<RawEventRow> {
        if row.select(&self.header_cell).next().is_some() {
            return None;
        }

        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "td")
            .collect();
        if cells.len() < 4 {
            return None;
        }

        let event = title_from(&cells)?;

        Some(RawEventRow {
            time: cell_text(&cells[0]),
            currency: cell_text(&cells[1]),
            impact: self.impact_score(row, &cells),
            event,
            actual: cells.get(3).map(cell_text).unwrap_or_default(),
            forecast: cells.get(4).map(cell_text).unwrap_or_default(),
            previous: cells.get(5).map(cell_text).unwrap_or_default(),
        })
    }

    /// Icon count first, then a text label on the impact cell overrides it.
    fn impact_score(&self, row: ElementRef<'_>, cells: &[ElementRef<'_>]) -> u32 {
        let mut score = self
            .icons
            .iter()
            .map(|sel| row.select(sel).count() as u32)
            .max()
            .unwrap_or(0);

        let label_cell = row
            .select(&self.impact_cell)
            .next()
            .or_else(|| cells.get(2).copied());
        if let Some(cell) = label_cell {
            if let Some(s) = score_from_label(&cell_text(&cell)) {
                score = s;
            }
        }
        score
    }
}

/// Map an impact label to a score: "high"/"3" -> 3, "medium"/"2" -> 2, "low"/"1" -> 1.
pub fn score_from_label(text: &str) -> Option<u32> {
    let t = text.to_lowercase();
    if t.contains("high") || t.contains('3') {
        Some(3)
    } else if t.contains("medium") || t.contains('2') {
        Some(2)
    } else if t.contains("low") || t.contains('1') {
        Some(1)
    } else {
        None
    }
}

/// First cell from index 2 on that is long enough and not a bare number.
fn title_from(cells: &[ElementRef<'_>]) -> Option<String> {
    cells.iter().skip(2).map(cell_text).find(|t| is_title(t))
}

pub fn is_title(text: &str) -> bool {
    text.chars().count() > MIN_TITLE_CHARS && !NUMERIC_ONLY.is_match(text)
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &str) -> String {
        format!("<html><body><table><tbody>{rows}</tbody></table></body></html>")
    }

    #[test]
    fn label_mapping() {
        assert_eq!(score_from_label("High Volatility"), Some(3));
        assert_eq!(score_from_label("3"), Some(3));
        assert_eq!(score_from_label("Medium"), Some(2));
        assert_eq!(score_from_label("low"), Some(1));
        assert_eq!(score_from_label(""), None);
    }

    #[test]
    fn title_heuristic() {
        assert!(is_title("Retail Sales (MoM)"));
        assert!(!is_title("Short one"));
        assert!(!is_title("-1234567.89%"));
        assert!(!is_title("+0.25%+0.25%"));
    }

    #[test]
    fn header_and_short_rows_are_skipped() {
        let html = table(
            "<tr><th>Time</th><td>a</td><td>b</td><td>c</td><td>d</td></tr>\
             <tr><td>08:30</td><td>USD</td><td>Nonfarm Payrolls</td></tr>",
        );
        assert!(DomExtractor::default().extract(&html).is_empty());
    }

    #[test]
    fn text_label_overrides_icon_count() {
        let html = table(
            "<tr><td>08:30</td><td>USD</td>\
             <td class=\"sentiment\"><i class=\"grayFullBullishIcon\"></i>low</td>\
             <td>Core Retail Sales (MoM)</td><td>0.4%</td><td>0.3%</td></tr>",
        );
        let rows = DomExtractor::default().extract(&html);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].impact, 1);
    }

    #[test]
    fn icon_count_is_max_across_hints() {
        let html = table(
            "<tr><td>14:00</td><td>USD</td>\
             <td><i class=\"grayFullBullishIcon\"></i><i class=\"grayFullBullishIcon\"></i>\
             <span class=\"impact-icon\"></span></td>\
             <td>FOMC Meeting Minutes</td></tr>",
        );
        let rows = DomExtractor::default().extract(&html);
        assert_eq!(rows[0].impact, 2);
        assert_eq!(rows[0].event, "FOMC Meeting Minutes");
        // cell 3 is the title cell here, still copied into `actual`
        assert_eq!(rows[0].actual, "FOMC Meeting Minutes");
        assert_eq!(rows[0].forecast, "");
        assert_eq!(rows[0].previous, "");
    }

    #[test]
    fn title_skips_numeric_and_short_cells() {
        let html = table(
            "<tr><td> 10:00 </td><td> EUR </td><td>2</td>\
             <td>-12345678.9%</td><td>ZEW Economic Sentiment</td><td>1.2</td></tr>",
        );
        let rows = DomExtractor::default().extract(&html);
        assert_eq!(rows[0].time, "10:00");
        assert_eq!(rows[0].currency, "EUR");
        assert_eq!(rows[0].event, "ZEW Economic Sentiment");
        assert_eq!(rows[0].impact, 2);
        assert_eq!(rows[0].actual, "-12345678.9%");
        assert_eq!(rows[0].forecast, "ZEW Economic Sentiment");
        assert_eq!(rows[0].previous, "1.2");
    }

    #[test]
    fn invalid_selectors_are_dropped() {
        let ex = DomExtractor::with_row_selectors(&["tr[", "table tbody tr"]);
        assert_eq!(ex.rows.len(), 1);
    }
}
