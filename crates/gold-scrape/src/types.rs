//! Core data types produced by a scrape run.

use serde::{Deserialize, Serialize};

/// One row of the daily price table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldPriceRecord {
    /// Row label, trimmed, lower-cased, spaces replaced by `_` (e.g. `sjc`).
    #[serde(rename = "gold_idx", alias = "index")]
    pub index: String,
    pub buy_price: u64,
    pub sell_price: u64,
    #[serde(rename = "yesterday_buy_price")]
    pub prev_buy_price: u64,
    #[serde(rename = "yesterday_sell_price")]
    pub prev_sell_price: u64,
}

impl GoldPriceRecord {
    /// Change in buy price since the previous day.
    pub fn buy_change(&self) -> i64 {
        self.buy_price as i64 - self.prev_buy_price as i64
    }

    /// Change in sell price since the previous day.
    pub fn sell_change(&self) -> i64 {
        self.sell_price as i64 - self.prev_sell_price as i64
    }

    /// Dealer margin (sell minus buy).
    pub fn spread(&self) -> i64 {
        self.sell_price as i64 - self.buy_price as i64
    }
}

/// Every data row of the price table, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceTable {
    pub records: Vec<GoldPriceRecord>,
}

impl PriceTable {
    /// The row published as "today's gold price". Always the first row.
    pub fn primary(&self) -> Option<&GoldPriceRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a row by its normalized label.
    pub fn get(&self, index: &str) -> Option<&GoldPriceRecord> {
        self.records.iter().find(|r| r.index == index)
    }
}

/// Historical price chart: three parallel series of equal length.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    pub dates: Vec<String>,
    pub buy_in: Vec<i64>,
    pub sell_out: Vec<i64>,
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint<'a> {
    pub date: &'a str,
    pub buy_in: i64,
    pub sell_out: i64,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Rows in source order.
    pub fn points(&self) -> impl Iterator<Item = ChartPoint<'_>> + '_ {
        self.dates
            .iter()
            .zip(self.buy_in.iter())
            .zip(self.sell_out.iter())
            .map(|((date, &buy_in), &sell_out)| ChartPoint {
                date,
                buy_in,
                sell_out,
            })
    }

    /// Most recent point (last in source order).
    pub fn latest(&self) -> Option<ChartPoint<'_>> {
        self.points().last()
    }
}
