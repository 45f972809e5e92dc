//! The `gold-scrape` binary, driven as the scheduler would run it.

use std::process::Output;

use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = include_str!("fixtures/gold_page.html");
const PAGE_PATH: &str = "/gia-vang-hom-nay-c425.html";

// ─────────────────────── helpers ───────────────────────

async fn gold_scrape(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gold-scrape"))
        .args(args)
        .env_remove("GOLD_SCRAPE_URL")
        .env_remove("GOLD_SCRAPE_PROXY")
        .env_remove("GOLD_SCRAPE_TIMEOUT_SECS")
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn test_run_json_keeps_stdout_parseable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;
    let url = format!("{}{PAGE_PATH}", server.uri());

    let output = gold_scrape(&["run", "--anonymous", "--json", "--url", &url]).await;
    assert!(output.status.success(), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output))
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {}", stdout(&output)));
    assert_eq!(report["record"]["gold_idx"], "sjc");
    assert_eq!(
        report["notification"]["message"],
        "Gold data for today: 84500 - 86500"
    );
    let events = report["events"].as_array().unwrap();
    assert!(events.iter().any(|e| e["type"] == "NotificationSent"));

    assert!(stderr(&output).contains("Gold Data: Gold data for today: 84500 - 86500"));
}

#[tokio::test]
async fn test_run_prints_summary_line() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .mount(&server)
        .await;

    let output = gold_scrape(&["run", "--anonymous", "--url", &server.uri()]).await;
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(out.starts_with("Gold Data: Gold data for today: 84500 - 86500\n"), "{out}");
    assert!(out.contains("Spread:"));
}

#[tokio::test]
async fn test_oversized_timeout_is_rejected() {
    let output = gold_scrape(&["fetch", "--timeout", "18446744073709552"]).await;
    assert!(!output.status.success());
    assert!(stderr(&output).contains("too large"), "{}", stderr(&output));
}

#[tokio::test]
async fn test_fetch_then_parse_offline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let saved = dir.path().join("page.html");
    let saved_arg = saved.to_str().unwrap();

    let fetched = gold_scrape(&["fetch", "--url", &server.uri(), "-o", saved_arg]).await;
    assert!(fetched.status.success(), "{}", stderr(&fetched));
    assert!(saved.exists());

    let parsed = gold_scrape(&["parse", saved_arg, "--json"]).await;
    assert!(parsed.status.success(), "{}", stderr(&parsed));
    let extraction: serde_json::Value = serde_json::from_str(&stdout(&parsed)).unwrap();
    assert_eq!(extraction["record"]["buy_price"], 84_500);
    assert_eq!(extraction["series"]["dates"].as_array().map(Vec::len), Some(7));
}
