//! Daily price table extraction.
//!
//! Each data row is decoded positionally by [`decode_row`]:
//!
//! | cell | content                                    |
//! |------|--------------------------------------------|
//! | 0    | label (gold type)                          |
//! | 1    | buy price today, maybe followed by a trend |
//! | 2    | sell price today, maybe followed by a trend|
//! | 3    | buy price previous day                     |
//! | 4    | sell price previous day                    |
//!
//! The published summary is the first data row. The table lists several gold
//! types and nothing on the page marks one as primary, so "first row wins" is
//! the whole rule.

use scraper::{ElementRef, Html, Selector};

use crate::config::PageLayout;
use crate::error::{ScrapeError, ScrapeResult};
use crate::extraction::numeric::{first_token, parse_price, strip_thousands};
use crate::types::{GoldPriceRecord, PriceTable};

/// Cells a price row must carry.
pub const PRICE_ROW_ARITY: usize = 5;

/// Locates the price table and decodes its rows.
#[derive(Debug, Clone)]
pub struct TableExtractor {
    table: Selector,
    table_selector: String,
    row: Selector,
    cell: Selector,
}

impl TableExtractor {
    pub fn new(layout: &PageLayout) -> ScrapeResult<Self> {
        Ok(Self {
            table: parse_selector(&layout.table_selector)?,
            table_selector: layout.table_selector.clone(),
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
        })
    }

    /// The primary record: row 0 of the table.
    pub fn parse_table(&self, document: &Html) -> ScrapeResult<GoldPriceRecord> {
        let table = self.locate(document)?;
        self.data_rows(table)
            .next()
            .ok_or_else(|| ScrapeError::row(0, "table has no data rows"))
            .and_then(|(row, cells)| decode_row(row, &cells))
    }

    /// Every data row, for the full tabular view.
    pub fn parse_price_table(&self, document: &Html) -> ScrapeResult<PriceTable> {
        let table = self.locate(document)?;
        let records = self
            .data_rows(table)
            .map(|(row, cells)| decode_row(row, &cells))
            .collect::<ScrapeResult<Vec<_>>>()?;
        if records.is_empty() {
            return Err(ScrapeError::row(0, "table has no data rows"));
        }
        Ok(PriceTable { records })
    }

    fn locate<'a>(&self, document: &'a Html) -> ScrapeResult<ElementRef<'a>> {
        document
            .select(&self.table)
            .next()
            .ok_or_else(|| ScrapeError::structure(format!("table matching `{}`", self.table_selector)))
    }

    /// Rows with at least one `<td>`, numbered from 0. Header rows built
    /// only from `<th>` are not data.
    fn data_rows<'a>(
        &'a self,
        table: ElementRef<'a>,
    ) -> impl Iterator<Item = (usize, Vec<String>)> + 'a {
        table
            .select(&self.row)
            .map(|tr| {
                tr.select(&self.cell)
                    .map(|td| td.text().collect::<String>())
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .enumerate()
    }
}

/// Decode one row's cell texts into a record.
pub fn decode_row(row: usize, cells: &[String]) -> ScrapeResult<GoldPriceRecord> {
    let Some([label, buy, sell, prev_buy, prev_sell]) = cells.get(..PRICE_ROW_ARITY) else {
        return Err(ScrapeError::row(
            row,
            format!("expected {PRICE_ROW_ARITY} cells, found {}", cells.len()),
        ));
    };

    let index = normalize_label(label);
    if index.is_empty() {
        return Err(ScrapeError::row(row, "empty label cell"));
    }

    Ok(GoldPriceRecord {
        index,
        buy_price: current_price(row, "buy", buy)?,
        sell_price: current_price(row, "sell", sell)?,
        prev_buy_price: previous_price(row, "previous buy", prev_buy)?,
        prev_sell_price: previous_price(row, "previous sell", prev_sell)?,
    })
}

/// `" SJC 1L "` → `"sjc_1l"`.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Today's prices may carry a trend marker after the number.
fn current_price(row: usize, field: &str, raw: &str) -> ScrapeResult<u64> {
    first_token(raw)
        .and_then(parse_price)
        .ok_or_else(|| not_numeric(row, field, raw))
}

fn previous_price(row: usize, field: &str, raw: &str) -> ScrapeResult<u64> {
    parse_price(raw).ok_or_else(|| not_numeric(row, field, raw))
}

fn not_numeric(row: usize, field: &str, raw: &str) -> ScrapeError {
    ScrapeError::row(
        row,
        format!("{field} cell is not a price: '{}'", strip_thousands(raw)),
    )
}

fn parse_selector(css: &str) -> ScrapeResult<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Config(format!("selector `{css}`: {e:?}")))
}
