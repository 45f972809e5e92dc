//! Run sequencing: fetch → table → chart → summary → notify.
//!
//! Every step is public so an external scheduler can run them as separate
//! tasks; [`PipelineCoordinator::run`] chains them for a single invocation.
//!
//! Abort rules:
//! - fetch failure ends the run before any parsing;
//! - table failure ends the run before notification;
//! - chart failure is reported as a warning and the run continues.

use std::sync::Arc;

use serde::Serialize;

use crate::acquisition::{FetchedPage, HttpFetcher};
use crate::config::ScrapeConfig;
use crate::error::{ScrapeError, ScrapeResult};
use crate::events::{ScrapeEvent, ScrapeObserver, Stage};
use crate::extraction::{parse_document, ChartExtractor, DelimiterChartExtractor, TableExtractor};
use crate::pipeline::credentials::{CredentialProvider, SessionCredentials};
use crate::pipeline::notify::{Notification, Notifier};
use crate::types::{ChartSeries, GoldPriceRecord, PriceTable};

/// What one page yields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// Row 0 of the price table.
    pub record: GoldPriceRecord,
    /// All rows, when every row decoded.
    pub table: Option<PriceTable>,
    /// Chart history, when the script was readable.
    pub series: Option<ChartSeries>,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub url: String,
    pub attempts: u32,
    #[serde(flatten)]
    pub extraction: Extraction,
    pub notification: Notification,
}

pub struct PipelineCoordinator {
    url: String,
    fetcher: HttpFetcher,
    table: TableExtractor,
    chart: Box<dyn ChartExtractor>,
    notifier: Arc<dyn Notifier>,
    observer: Arc<dyn ScrapeObserver>,
}

impl PipelineCoordinator {
    /// Validate `config` and build one fetch session plus both extractors.
    pub fn new(
        config: ScrapeConfig,
        notifier: Arc<dyn Notifier>,
        observer: Arc<dyn ScrapeObserver>,
    ) -> ScrapeResult<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.fetch.clone(), observer.clone())?;
        Ok(Self {
            table: TableExtractor::new(&config.layout)?,
            chart: Box::new(DelimiterChartExtractor::new(&config.layout)?),
            url: config.url,
            fetcher,
            notifier,
            observer,
        })
    }

    /// Swap the chart scraper.
    pub fn with_chart_extractor(mut self, chart: Box<dyn ChartExtractor>) -> Self {
        self.chart = chart;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }

    /// Step 1: download the page.
    pub async fn fetch_page(&self) -> ScrapeResult<FetchedPage> {
        Ok(self.fetcher.fetch(&self.url).await?)
    }

    /// Step 2: the published record (row 0).
    pub fn extract_table(&self, page: &FetchedPage) -> ScrapeResult<GoldPriceRecord> {
        let document = parse_document(&page.body);
        let result = self.table.parse_table(&document);
        self.report_extraction(page, Stage::Table, &result, true, table_parsed);
        result
    }

    /// Every table row.
    pub fn extract_price_table(&self, page: &FetchedPage) -> ScrapeResult<PriceTable> {
        let document = parse_document(&page.body);
        self.table.parse_price_table(&document)
    }

    /// Step 3: chart history. Failures are reported as warnings.
    pub fn extract_chart(&self, page: &FetchedPage) -> ScrapeResult<ChartSeries> {
        let document = parse_document(&page.body);
        let result = self.chart.parse_chart(&document);
        self.report_extraction(page, Stage::Chart, &result, false, chart_parsed);
        result
    }

    /// Steps 2 and 3 over one parsed document.
    ///
    /// Only a table failure is an error; a bad chart or a bad secondary row
    /// leaves the matching field `None`.
    pub fn extract(&self, page: &FetchedPage) -> ScrapeResult<Extraction> {
        let document = parse_document(&page.body);

        let record = self.table.parse_table(&document);
        self.report_extraction(page, Stage::Table, &record, true, table_parsed);
        let record = record?;

        let table = match self.table.parse_price_table(&document) {
            Ok(table) => Some(table),
            Err(e) => {
                self.observer.on_event(&ScrapeEvent::ExtractionFailed {
                    stage: Stage::Table,
                    url: page.url.clone(),
                    error: format!("secondary rows: {e}"),
                    body_len: page.body.len(),
                    fatal: false,
                });
                None
            }
        };

        let series = self.chart.parse_chart(&document);
        self.report_extraction(page, Stage::Chart, &series, false, chart_parsed);

        Ok(Extraction {
            record,
            table,
            series: series.ok(),
        })
    }

    /// Step 4: the message for the published record.
    pub fn summarize(&self, record: &GoldPriceRecord) -> Notification {
        Notification::for_record(record)
    }

    /// Step 5: deliver. Credentials are used for this call only.
    pub async fn notify(
        &self,
        notification: &Notification,
        credentials: &SessionCredentials,
    ) -> ScrapeResult<()> {
        match self.notifier.notify(credentials, notification).await {
            Ok(()) => {
                self.observer.on_event(&ScrapeEvent::NotificationSent {
                    subject: notification.subject.clone(),
                });
                Ok(())
            }
            Err(e) => {
                self.delivery_failed(Stage::Notify, &e);
                Err(e)
            }
        }
    }

    /// Run every step once.
    pub async fn run(&self, credentials: &dyn CredentialProvider) -> ScrapeResult<RunReport> {
        let page = self.fetch_page().await?;
        let extraction = self.extract(&page)?;
        let notification = self.summarize(&extraction.record);

        let creds = credentials.credentials().await.inspect_err(|e| {
            self.delivery_failed(Stage::Credentials, e);
        })?;
        self.notify(&notification, &creds).await?;
        drop(creds);

        Ok(RunReport {
            url: page.url,
            attempts: page.attempts,
            extraction,
            notification,
        })
    }

    fn report_extraction<T>(
        &self,
        page: &FetchedPage,
        stage: Stage,
        result: &ScrapeResult<T>,
        fatal: bool,
        on_success: fn(&T) -> ScrapeEvent,
    ) {
        let event = match result {
            Ok(value) => on_success(value),
            Err(e) => ScrapeEvent::ExtractionFailed {
                stage,
                url: page.url.clone(),
                error: e.to_string(),
                body_len: page.body.len(),
                fatal,
            },
        };
        self.observer.on_event(&event);
    }

    fn delivery_failed(&self, stage: Stage, error: &ScrapeError) {
        self.observer.on_event(&ScrapeEvent::DeliveryFailed {
            stage,
            error: error.to_string(),
        });
    }
}

fn table_parsed(record: &GoldPriceRecord) -> ScrapeEvent {
    ScrapeEvent::TableParsed {
        index: record.index.clone(),
        buy_price: record.buy_price,
        sell_price: record.sell_price,
        yesterday_buy_price: record.prev_buy_price,
        yesterday_sell_price: record.prev_sell_price,
    }
}

fn chart_parsed(series: &ChartSeries) -> ScrapeEvent {
    ScrapeEvent::ChartParsed {
        points: series.len(),
    }
}
