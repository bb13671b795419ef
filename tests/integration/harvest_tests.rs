//! Integration tests for the harvester
//!
//! These tests point both the relay routes and the extraction endpoint at
//! wiremock servers and drive full runs end-to-end.

use mcq_harvest::config::{Config, FetchConfig};
use mcq_harvest::extract::GeminiExtractor;
use mcq_harvest::fetch::{build_http_client, ProxyRotator, ResilientFetcher};
use mcq_harvest::harvest::{FailureKind, HarvestObserver, HarvestOutcome, Harvester, RunState};
use mcq_harvest::storage::{ResultStore, SqliteResultStore};
use mcq_harvest::{HarvestError, Record};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const P1: &str = "https://quiz.example.com/physics/page-1";
const P2: &str = "https://quiz.example.com/physics/page-2";

/// Collects everything the harvester reports
#[derive(Default)]
struct RecordingObserver {
    progress: Mutex<Vec<String>>,
    snapshots: Mutex<Vec<Vec<Record>>>,
    states: Mutex<Vec<RunState>>,
}

impl HarvestObserver for RecordingObserver {
    fn on_progress(&self, message: &str) {
        self.progress.lock().unwrap().push(message.to_string());
    }

    fn on_records(&self, records: &[Record]) {
        self.snapshots.lock().unwrap().push(records.to_vec());
    }

    fn on_state(&self, state: RunState) {
        self.states.lock().unwrap().push(state);
    }
}

fn mcq(question: &str) -> serde_json::Value {
    json!({
        "question": question,
        "options": ["1 N", "10 N", "100 N"],
        "correctAnswer": "10 N",
        "examName": "NEET 2019"
    })
}

/// Serves `html` through the relay when the target is `locator`
async fn mount_page(server: &MockServer, locator: &str, html: &str, delay: Option<Duration>) {
    let mut template = ResponseTemplate::new(200).set_body_string(html);
    if let Some(delay) = delay {
        template = template.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path("/relay"))
        .and(query_param("url", locator))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Answers extraction requests whose prompt contains `marker` with `payload`
async fn mount_extraction(server: &MockServer, marker: &str, payload: serde_json::Value) {
    mount_slow_extraction(server, marker, payload, Duration::ZERO).await;
}

async fn mount_slow_extraction(
    server: &MockServer,
    marker: &str,
    payload: serde_json::Value,
    delay: Duration,
) {
    let text = payload.to_string();
    let body = json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    });
    Mock::given(method("POST"))
        .and(path(format!("/v1beta/models/{}:generateContent", MODEL)))
        .and(body_string_contains(marker))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

fn create_harvester(server: &MockServer) -> Harvester {
    let client = build_http_client(&FetchConfig::default()).unwrap();
    let rotator = ProxyRotator::from_templates(&[format!("{}/relay?url=", server.uri())]);
    let fetcher = ResilientFetcher::new(client.clone(), rotator, "The page is temporarily unavailable");
    let extractor = GeminiExtractor::new(
        client,
        format!("{}/v1beta", server.uri()),
        MODEL,
        "test-key",
    );
    Harvester::new(fetcher, Arc::new(extractor)).with_page_delay(Duration::from_millis(5))
}

async fn relay_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/relay")
        .count()
}

async fn extraction_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().ends_with(":generateContent"))
        .count()
}

#[tokio::test]
async fn test_two_page_run_completes() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_page(&server, P2, "<html>PAGE-TWO</html>", None).await;
    mount_extraction(
        &server,
        "PAGE-ONE",
        json!({ "mcqs": [mcq("q1"), mcq("q2")], "nextUrl": P2 }),
    )
    .await;
    mount_extraction(&server, "PAGE-TWO", json!({ "mcqs": [mcq("q3")], "nextUrl": null })).await;

    let observer = Arc::new(RecordingObserver::default());
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let harvester = create_harvester(&server)
        .with_observer(observer.clone())
        .with_store(store.clone());

    let report = harvester.start(P1).await.unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Completed);
    assert_eq!(report.pages, 2);
    let questions: Vec<&str> = report.records.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(questions, vec!["q1", "q2", "q3"]);
    assert_eq!(report.records[0].exam_name.as_deref(), Some("NEET 2019"));

    // Each page publishes the whole accumulated sequence
    let snapshots = observer.snapshots.lock().unwrap();
    assert_eq!(snapshots.iter().map(Vec::len).collect::<Vec<_>>(), vec![2, 3]);
    assert_eq!(
        *observer.states.lock().unwrap(),
        vec![RunState::Running, RunState::Completed]
    );
    assert_eq!(
        observer.progress.lock().unwrap().last().unwrap(),
        "Scraping complete! Found 3 MCQs across 2 pages."
    );

    assert_eq!(store.load().unwrap(), Some(report.records.clone()));
    assert_eq!(relay_requests(&server).await, 2);
    assert!(!harvester.is_running());
}

#[tokio::test]
async fn test_blocked_first_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/relay"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let harvester = create_harvester(&server).with_store(store.clone());
    let report = harvester.start(P1).await.unwrap();

    match &report.outcome {
        HarvestOutcome::Blocked { locator, summary } => {
            assert_eq!(locator.as_str(), P1);
            assert!(summary.contains("403"), "summary was {}", summary);
        }
        other => panic!("expected Blocked, got {:?}", other),
    }
    assert_eq!(report.state(), RunState::Blocked);
    assert!(report.records.is_empty());
    assert_eq!(report.pages, 0);
    assert!(report.outcome.handoff_message().unwrap().contains(P1));
    assert_eq!(
        report.log.last().unwrap(),
        &format!("Automated scraping from \"{}\" was blocked.", P1)
    );

    assert_eq!(extraction_requests(&server).await, 0);
    assert_eq!(store.load().unwrap(), None);
}

#[tokio::test]
async fn test_malformed_second_page_keeps_first_page_records() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_page(&server, P2, "<html>PAGE-TWO</html>", None).await;
    mount_extraction(
        &server,
        "PAGE-ONE",
        json!({ "mcqs": [mcq("q1"), mcq("q2")], "nextUrl": P2 }),
    )
    .await;
    mount_extraction(&server, "PAGE-TWO", json!({ "nextUrl": null })).await;

    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let harvester = create_harvester(&server).with_store(store.clone());
    let report = harvester.start(P1).await.unwrap();

    match &report.outcome {
        HarvestOutcome::Failed { kind, message } => {
            assert_eq!(*kind, FailureKind::MalformedResponse);
            assert!(message.starts_with("Received malformed data from the API"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pages, 1);
    assert!(report.log.last().unwrap().starts_with("Error: "));
    assert_eq!(store.load().unwrap().map(|r| r.len()), Some(2));
}

#[tokio::test]
async fn test_next_page_equal_to_current_stops() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_extraction(&server, "PAGE-ONE", json!({ "mcqs": [mcq("q1")], "nextUrl": P1 })).await;

    let report = create_harvester(&server).start(P1).await.unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Completed);
    assert_eq!(report.pages, 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(relay_requests(&server).await, 1);
}

#[tokio::test]
async fn test_cancel_during_fetch_keeps_records() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_page(&server, P2, "<html>PAGE-TWO</html>", Some(Duration::from_secs(10))).await;
    mount_extraction(
        &server,
        "PAGE-ONE",
        json!({ "mcqs": [mcq("q1"), mcq("q2")], "nextUrl": P2 }),
    )
    .await;

    let observer = Arc::new(RecordingObserver::default());
    let harvester = Arc::new(create_harvester(&server).with_observer(observer.clone()));

    let running = {
        let harvester = Arc::clone(&harvester);
        tokio::spawn(async move { harvester.start(P1).await })
    };

    // Wait until page 2 is being fetched
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(harvester.is_running());
    assert!(harvester.cancel());

    let report = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancellation should interrupt the pending fetch")
        .unwrap()
        .unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Cancelled);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pages, 1);
    assert_eq!(report.log.last().unwrap(), "Scraping cancelled.");
    assert_eq!(observer.states.lock().unwrap().last(), Some(&RunState::Cancelled));
    assert!(!harvester.is_running());
    assert!(!harvester.cancel());
}

#[tokio::test]
async fn test_cancel_during_extraction_discards_pending_page() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_page(&server, P2, "<html>PAGE-TWO</html>", None).await;
    mount_extraction(
        &server,
        "PAGE-ONE",
        json!({ "mcqs": [mcq("q1"), mcq("q2")], "nextUrl": P2 }),
    )
    .await;
    mount_slow_extraction(
        &server,
        "PAGE-TWO",
        json!({ "mcqs": [mcq("late")], "nextUrl": null }),
        Duration::from_secs(10),
    )
    .await;

    let observer = Arc::new(RecordingObserver::default());
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let harvester = Arc::new(
        create_harvester(&server)
            .with_observer(observer.clone())
            .with_store(store.clone()),
    );

    let running = {
        let harvester = Arc::clone(&harvester);
        tokio::spawn(async move { harvester.start(P1).await })
    };

    // Wait until page 2 is with the extraction service
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(extraction_requests(&server).await, 2);
    assert!(harvester.cancel());

    let report = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancellation should interrupt the pending extraction")
        .unwrap()
        .unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Cancelled);
    assert_eq!(report.pages, 1);
    let questions: Vec<&str> = report.records.iter().map(|r| r.question.as_str()).collect();
    assert_eq!(questions, vec!["q1", "q2"]);
    assert!(!report.log.iter().any(|m| m.starts_with("(Page 2) Found")));

    let snapshots = observer.snapshots.lock().unwrap();
    assert_eq!(snapshots.iter().map(Vec::len).collect::<Vec<_>>(), vec![2]);
    assert_eq!(store.load().unwrap().map(|r| r.len()), Some(2));
}

#[tokio::test]
async fn test_cancel_during_pause_returns_promptly() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_page(&server, P2, "<html>PAGE-TWO</html>", None).await;
    mount_extraction(&server, "PAGE-ONE", json!({ "mcqs": [mcq("q1")], "nextUrl": P2 })).await;

    let harvester = Arc::new(create_harvester(&server).with_page_delay(Duration::from_secs(30)));

    let running = {
        let harvester = Arc::clone(&harvester);
        tokio::spawn(async move { harvester.start(P1).await })
    };

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(harvester.cancel());

    let report = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("cancellation should cut the pause short")
        .unwrap()
        .unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Cancelled);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.pages, 1);
    assert!(report
        .log
        .iter()
        .any(|m| m == "Waiting for 30s to avoid API rate limits..."));
    assert_eq!(report.log.last().unwrap(), "Scraping cancelled.");
    assert_eq!(relay_requests(&server).await, 1);
}

#[tokio::test]
async fn test_new_run_supersedes_previous() {
    let server = MockServer::start().await;
    let slow = "https://slow.example.com/start";
    mount_page(&server, slow, "<html>SLOW</html>", Some(Duration::from_secs(10))).await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_extraction(&server, "SLOW", json!({ "mcqs": [mcq("stale")] })).await;
    mount_extraction(&server, "PAGE-ONE", json!({ "mcqs": [mcq("fresh")] })).await;

    let observer = Arc::new(RecordingObserver::default());
    let store = Arc::new(SqliteResultStore::new_in_memory().unwrap());
    let harvester = Arc::new(
        create_harvester(&server)
            .with_observer(observer.clone())
            .with_store(store.clone()),
    );

    let first = {
        let harvester = Arc::clone(&harvester);
        tokio::spawn(async move { harvester.start(slow).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = harvester.start(P1).await.unwrap();
    let first = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .expect("superseded run should stop promptly")
        .unwrap()
        .unwrap();

    assert_eq!(first.outcome, HarvestOutcome::Cancelled);
    assert!(first.records.is_empty());
    assert!(second.session_id > first.session_id);
    assert_eq!(second.outcome, HarvestOutcome::Completed);
    assert_eq!(second.records[0].question, "fresh");

    // Nothing from the superseded run reached the observer after the switch
    let progress = observer.progress.lock().unwrap();
    assert!(!progress.iter().any(|m| m == "Scraping cancelled."));
    assert_eq!(progress.last().unwrap(), "Scraping complete! Found 1 MCQs across 1 pages.");
    for snapshot in observer.snapshots.lock().unwrap().iter() {
        assert!(snapshot.iter().all(|r| r.question == "fresh"));
    }
    assert_eq!(store.load().unwrap(), Some(second.records));
    assert_eq!(extraction_requests(&server).await, 1);
}

#[tokio::test]
async fn test_results_survive_restart() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_extraction(
        &server,
        "PAGE-ONE",
        json!({ "mcqs": [mcq("q1"), mcq("q2")], "nextUrl": null }),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("results.db");

    let report = {
        let store = Arc::new(SqliteResultStore::new(&db_path).unwrap());
        let harvester = create_harvester(&server).with_store(store);
        harvester.start(P1).await.unwrap()
    };

    let reopened = Arc::new(SqliteResultStore::new(&db_path).unwrap());
    let harvester = create_harvester(&server).with_store(reopened.clone());
    assert_eq!(harvester.restore_previous().unwrap(), Some(report.records));

    harvester.clear_results().unwrap();
    assert_eq!(harvester.restore_previous().unwrap(), None);
    assert_eq!(reopened.load().unwrap(), None);
}

#[tokio::test]
async fn test_single_page_mode() {
    let server = MockServer::start().await;
    mount_extraction(
        &server,
        "PASTED-PAGE",
        json!({ "mcqs": [mcq("q1"), mcq("q2"), mcq("q3")], "nextUrl": P2 }),
    )
    .await;

    let harvester = create_harvester(&server);
    let report = harvester
        .start_single_page("<html>PASTED-PAGE</html>", Some(P1))
        .await
        .unwrap();

    assert_eq!(report.outcome, HarvestOutcome::Completed);
    assert_eq!(report.records.len(), 3);
    assert_eq!(relay_requests(&server).await, 0);
    assert_eq!(extraction_requests(&server).await, 1);

    let requests = server.received_requests().await.unwrap();
    let prompt = String::from_utf8_lossy(&requests[0].body);
    assert!(prompt.contains(P1));
}

#[tokio::test]
async fn test_invalid_start_locator() {
    let server = MockServer::start().await;
    let harvester = create_harvester(&server);

    for input in ["", "   ", "quiz.example.com/page-1", "ftp://quiz.example.com/"] {
        let err = harvester.start(input).await.unwrap_err();
        assert!(matches!(err, HarvestError::InvalidInput(_)), "{:?}", input);
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_harvester_from_config() {
    let server = MockServer::start().await;
    mount_page(&server, P1, "<html>PAGE-ONE</html>", None).await;
    mount_extraction(&server, "PAGE-ONE", json!({ "mcqs": [mcq("q1")] })).await;

    let mut config = Config::default();
    config.harvester.page_delay_ms = 0;
    config.fetch.routes = vec![format!("{}/relay?url={{url}}", server.uri())];

    let client = build_http_client(&config.fetch).unwrap();
    let extractor = GeminiExtractor::new(
        client,
        format!("{}/v1beta", server.uri()),
        MODEL,
        "test-key",
    );
    let harvester = Harvester::from_config(&config, Arc::new(extractor)).unwrap();
    assert_eq!(harvester.page_delay(), Duration::ZERO);

    let report = harvester.start(P1).await.unwrap();
    assert_eq!(report.outcome, HarvestOutcome::Completed);
    assert_eq!(report.records.len(), 1);
}
