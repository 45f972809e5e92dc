//! Extraction of typed data from the fetched page.
//!
//! Both extractors read the same parsed document and fail independently:
//! the table feeds the published summary, the chart is supplementary.

pub mod chart;
pub mod numeric;
pub mod table;

pub use chart::{parse_chart_script, ChartExtractor, DelimiterChartExtractor};
pub use table::{decode_row, TableExtractor};

use scraper::Html;

/// Parse a raw page body. Malformed markup is repaired, never rejected.
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}
