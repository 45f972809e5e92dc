//! End-to-end runs of the pipeline against a mock page server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scraper::Html;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gold_scrape::config::{FetchConfig, RetryPolicy, ScrapeConfig};
use gold_scrape::events::{MemoryObserver, ScrapeEvent, Stage};
use gold_scrape::extraction::ChartExtractor;
use gold_scrape::pipeline::{
    CredentialProvider, Notification, Notifier, PipelineCoordinator, SessionCredentials,
    StaticCredentialProvider, WebhookNotifier,
};
use gold_scrape::{ChartSeries, FetchedPage, ScrapeError, ScrapeResult};

const PAGE: &str = include_str!("fixtures/gold_page.html");
const PAGE_PATH: &str = "/gia-vang-hom-nay-c425.html";

// ─────────────────────── helpers ───────────────────────

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        _credentials: &SessionCredentials,
        notification: &Notification,
    ) -> ScrapeResult<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Counts how often the credential step is reached.
struct CountingCredentials {
    calls: AtomicUsize,
}

#[async_trait]
impl CredentialProvider for CountingCredentials {
    async fn credentials(&self) -> ScrapeResult<SessionCredentials> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(test_credentials())
    }
}

struct FailingCredentials;

#[async_trait]
impl CredentialProvider for FailingCredentials {
    async fn credentials(&self) -> ScrapeResult<SessionCredentials> {
        Err(ScrapeError::Credentials("role assumption denied".into()))
    }
}

fn test_credentials() -> SessionCredentials {
    SessionCredentials::new("AKIATEST", "secret", "session-token")
}

fn config_for(server: &MockServer) -> ScrapeConfig {
    ScrapeConfig {
        url: format!("{}{PAGE_PATH}", server.uri()),
        fetch: FetchConfig {
            timeout_ms: 2_000,
            retry: RetryPolicy {
                backoff_unit_ms: 1,
                ..RetryPolicy::default()
            },
            ..FetchConfig::default()
        },
        ..ScrapeConfig::default()
    }
}

async fn serve(body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn page_from(body: &str) -> FetchedPage {
    FetchedPage {
        url: "file://fixture".into(),
        final_url: "file://fixture".into(),
        status: 200,
        body: body.to_string(),
        attempts: 1,
    }
}

// ─────────────────────── full runs ───────────────────────

#[tokio::test]
async fn test_full_run_publishes_first_row() {
    let server = serve(PAGE.to_string()).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let observer = MemoryObserver::new();
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), observer.clone()).unwrap();

    let report = coordinator
        .run(&StaticCredentialProvider(test_credentials()))
        .await
        .unwrap();

    let record = &report.extraction.record;
    assert_eq!(record.index, "sjc");
    assert_eq!(record.buy_price, 84_500);
    assert_eq!(record.sell_price, 86_500);
    assert_eq!(record.prev_buy_price, 84_000);
    assert_eq!(record.prev_sell_price, 86_000);

    let table = report.extraction.table.as_ref().unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.records[1].index, "nhẫn_9999");
    assert_eq!(table.records[2].index, "pnj_hà_nội");

    let series = report.extraction.series.as_ref().unwrap();
    assert_eq!(series.len(), 7);
    assert_eq!(series.dates.first().map(String::as_str), Some("12/10"));
    assert_eq!(series.buy_in.last(), Some(&84_500));
    assert_eq!(series.sell_out.last(), Some(&86_500));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("84500"));
    assert!(sent[0].message.contains("86500"));

    let events = observer.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, ScrapeEvent::ChartParsed { points: 7 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ScrapeEvent::NotificationSent { .. })));
}

#[tokio::test]
async fn test_malformed_chart_still_notifies() {
    let broken = PAGE.replacen("data: [", "values: [", 1);
    let server = serve(broken).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let observer = MemoryObserver::new();
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), observer.clone()).unwrap();

    let report = coordinator
        .run(&StaticCredentialProvider(test_credentials()))
        .await
        .unwrap();

    assert!(report.extraction.series.is_none());
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].message.is_empty());

    let warning = observer.events().into_iter().find(|e| {
        matches!(
            e,
            ScrapeEvent::ExtractionFailed {
                stage: Stage::Chart,
                fatal: false,
                ..
            }
        )
    });
    assert!(warning.is_some(), "chart failure must be logged");
}

#[tokio::test]
async fn test_missing_table_aborts_before_notification() {
    let broken = PAGE.replace("gia-vang-search-data-table", "renamed-table");
    let server = serve(broken).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let credentials = CountingCredentials {
        calls: AtomicUsize::new(0),
    };
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), MemoryObserver::new())
            .unwrap();

    let err = coordinator.run(&credentials).await.unwrap_err();
    assert!(matches!(err, ScrapeError::StructureNotFound { .. }));
    assert!(notifier.sent().is_empty());
    assert_eq!(credentials.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_fetch_failure_aborts_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;
    let notifier = Arc::new(RecordingNotifier::default());
    let observer = MemoryObserver::new();
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), observer.clone()).unwrap();

    let err = coordinator
        .run(&StaticCredentialProvider(test_credentials()))
        .await
        .unwrap_err();

    assert!(matches!(err, ScrapeError::FetchFailed(_)));
    assert!(notifier.sent().is_empty());
    assert!(!observer
        .events()
        .iter()
        .any(|e| matches!(e, ScrapeEvent::ExtractionFailed { .. })));
}

#[tokio::test]
async fn test_credential_failure_is_reported() {
    let server = serve(PAGE.to_string()).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let observer = MemoryObserver::new();
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), observer.clone()).unwrap();

    let err = coordinator.run(&FailingCredentials).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Credentials(_)));
    assert!(notifier.sent().is_empty());
    assert!(observer.events().iter().any(|e| matches!(
        e,
        ScrapeEvent::DeliveryFailed {
            stage: Stage::Credentials,
            ..
        }
    )));
}

// ─────────────────────── individual steps ───────────────────────

#[tokio::test]
async fn test_steps_run_independently() {
    let server = serve(PAGE.to_string()).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let coordinator =
        PipelineCoordinator::new(config_for(&server), notifier.clone(), MemoryObserver::new())
            .unwrap();

    let page = coordinator.fetch_page().await.unwrap();
    let record = coordinator.extract_table(&page).unwrap();
    let series = coordinator.extract_chart(&page).unwrap();
    assert_eq!(series.len(), 7);

    let summary = coordinator.summarize(&record);
    coordinator
        .notify(&summary, &test_credentials())
        .await
        .unwrap();
    assert_eq!(notifier.sent(), vec![summary]);
}

#[test]
fn test_extract_saved_page_without_network() {
    let coordinator = PipelineCoordinator::new(
        ScrapeConfig::default(),
        Arc::new(RecordingNotifier::default()),
        MemoryObserver::new(),
    )
    .unwrap();

    let extraction = coordinator.extract(&page_from(PAGE)).unwrap();
    assert_eq!(extraction.record.index, "sjc");
    assert_eq!(extraction.table.map(|t| t.len()), Some(3));

    let broken_row = PAGE.replacen("<td>83,300</td>", "", 1);
    let extraction = coordinator.extract(&page_from(&broken_row)).unwrap();
    assert_eq!(extraction.record.buy_price, 84_500);
    assert!(extraction.table.is_none());
}

/// Stand-in for a real script-literal parser.
struct FixedChart;

impl ChartExtractor for FixedChart {
    fn parse_chart(&self, _document: &Html) -> ScrapeResult<ChartSeries> {
        Ok(ChartSeries {
            dates: vec!["today".into()],
            buy_in: vec![1],
            sell_out: vec![2],
        })
    }
}

#[test]
fn test_chart_extractor_is_swappable() {
    let coordinator = PipelineCoordinator::new(
        ScrapeConfig::default(),
        Arc::new(RecordingNotifier::default()),
        MemoryObserver::new(),
    )
    .unwrap()
    .with_chart_extractor(Box::new(FixedChart));

    let series = coordinator.extract_chart(&page_from("<html></html>")).unwrap();
    assert_eq!(series.dates, vec!["today"]);
}

// ─────────────────────── delivery ───────────────────────

#[tokio::test]
async fn test_webhook_posts_summary_with_session_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notify"))
        .and(header("authorization", "Bearer session-token"))
        .and(body_partial_json(serde_json::json!({
            "subject": "Gold Data",
            "message": "Gold data for today: 84500 - 86500"
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = WebhookNotifier::new(
        format!("{}/notify", server.uri()),
        std::time::Duration::from_secs(2),
    )
    .unwrap();
    let coordinator = PipelineCoordinator::new(
        ScrapeConfig::default(),
        Arc::new(RecordingNotifier::default()),
        MemoryObserver::new(),
    )
    .unwrap();
    let record = coordinator.extract_table(&page_from(PAGE)).unwrap();

    notifier
        .notify(&test_credentials(), &coordinator.summarize(&record))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_webhook_error_status_is_notify_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let notifier =
        WebhookNotifier::new(server.uri(), std::time::Duration::from_secs(2)).unwrap();
    let summary = Notification {
        subject: "Gold Data".into(),
        message: "Gold data for today: 1 - 2".into(),
        timestamp: chrono::Utc::now(),
    };
    let err = notifier
        .notify(&test_credentials(), &summary)
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::Notify(_)));
}
