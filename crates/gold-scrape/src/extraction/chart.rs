//! Best-effort scraper for the inline price chart.
//!
//! The page ships its history chart as a `<script>` that configures a
//! charting library with literal arrays:
//!
//! ```text
//! xAxis: { categories: ['01/10','02/10', ...] },
//! series: [{ name: 'Mua vào', data: [83500, 83700, ...] },
//!          { name: 'Bán ra',  data: [85500, 85700, ...] }]
//! ```
//!
//! [`DelimiterChartExtractor`] slices those arrays out by their opening
//! delimiters. It knows nothing about JavaScript syntax and breaks as soon as
//! the library's output format changes; callers depend only on the
//! [`ChartExtractor`] trait so a real literal parser can replace it.

use scraper::{Html, Selector};

use crate::config::PageLayout;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extraction::numeric::parse_series_value;
use crate::types::ChartSeries;

const CATEGORIES_OPEN: &str = "categories: [";
const DATA_OPEN: &str = "data: [";
const ARRAY_CLOSE: char = ']';
const QUOTES: &[char] = &['\'', '"'];

/// Anything that can recover a [`ChartSeries`] from the page.
pub trait ChartExtractor: Send + Sync {
    fn parse_chart(&self, document: &Html) -> ScrapeResult<ChartSeries>;
}

/// Delimiter/substring implementation of [`ChartExtractor`].
#[derive(Debug, Clone)]
pub struct DelimiterChartExtractor {
    script: Selector,
    script_selector: String,
}

impl DelimiterChartExtractor {
    pub fn new(layout: &PageLayout) -> ScrapeResult<Self> {
        let script = Selector::parse(&layout.chart_script_selector).map_err(|e| {
            ScrapeError::Config(format!(
                "selector `{}`: {e:?}",
                layout.chart_script_selector
            ))
        })?;
        Ok(Self {
            script,
            script_selector: layout.chart_script_selector.clone(),
        })
    }
}

impl ChartExtractor for DelimiterChartExtractor {
    fn parse_chart(&self, document: &Html) -> ScrapeResult<ChartSeries> {
        let script = document.select(&self.script).next().ok_or_else(|| {
            ScrapeError::structure(format!("chart script matching `{}`", self.script_selector))
        })?;
        let text: String = script.text().collect();
        parse_chart_script(&text)
    }
}

/// Slice the three series out of the raw script text.
pub fn parse_chart_script(text: &str) -> ScrapeResult<ChartSeries> {
    let categories = array_body(text, CATEGORIES_OPEN, 0)
        .ok_or_else(|| ScrapeError::chart(format!("no `{CATEGORIES_OPEN}` array")))?;

    let data_arrays = text.matches(DATA_OPEN).count();
    if data_arrays < 2 {
        return Err(ScrapeError::chart(format!(
            "expected two `{DATA_OPEN}` arrays, found {data_arrays}"
        )));
    }
    let buy = array_body(text, DATA_OPEN, 0)
        .ok_or_else(|| ScrapeError::chart("unterminated buy series"))?;
    let sell = array_body(text, DATA_OPEN, 1)
        .ok_or_else(|| ScrapeError::chart("unterminated sell series"))?;

    let series = ChartSeries {
        dates: tokens(categories)
            .map(|t| t.replace(QUOTES, "").trim().to_string())
            .collect(),
        buy_in: parse_values("buy", buy)?,
        sell_out: parse_values("sell", sell)?,
    };

    if series.buy_in.len() != series.dates.len() || series.sell_out.len() != series.dates.len() {
        return Err(ScrapeError::chart(format!(
            "series lengths differ: {} dates, {} buy, {} sell",
            series.dates.len(),
            series.buy_in.len(),
            series.sell_out.len()
        )));
    }
    Ok(series)
}

/// Text between the `nth` occurrence of `open` and the next `]`.
fn array_body<'a>(text: &'a str, open: &str, nth: usize) -> Option<&'a str> {
    let (start, _) = text.match_indices(open).nth(nth)?;
    let rest = &text[start + open.len()..];
    let end = rest.find(ARRAY_CLOSE)?;
    Some(&rest[..end])
}

/// Comma-separated tokens; an empty array has none.
fn tokens(body: &str) -> impl Iterator<Item = &str> {
    let body = body.trim();
    let empty = body.is_empty();
    body.split(',').filter(move |_| !empty).map(str::trim)
}

fn parse_values(name: &str, body: &str) -> ScrapeResult<Vec<i64>> {
    tokens(body)
        .enumerate()
        .map(|(i, tok)| {
            parse_series_value(tok).ok_or_else(|| {
                ScrapeError::chart(format!("{name} series value {i} is not an integer: '{tok}'"))
            })
        })
        .collect()
}
