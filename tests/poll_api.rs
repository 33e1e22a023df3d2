use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::{self, Body};
use axum::Router;
use chrono::NaiveDateTime;
use http::{Request, StatusCode};
use poll_results::models::{PollMeta, PollOption, PollWindow, VoteOperation, VotingPower, FINAL_CHOICE};
use poll_results::{create_routes, PollCatalog, PollService, Warehouse};
use serde_json::Value;
use tower::ServiceExt;

#[derive(Default)]
struct Stats {
    reconnects: AtomicUsize,
    queries: AtomicUsize,
    power_queries: AtomicUsize,
}

#[derive(Default)]
struct MemoryWarehouse {
    closed: AtomicBool,
    reconnect_heals: bool,
    stats: Arc<Stats>,
    fail_queries: bool,
    window: Option<PollWindow>,
    operations: Vec<VoteOperation>,
    power: Vec<VotingPower>,
    last_load: Option<NaiveDateTime>,
}

impl MemoryWarehouse {
    fn query(&self) -> Result<(), sqlx::Error> {
        self.stats.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries {
            return Err(sqlx::Error::Protocol("relation mcd_public.votes does not exist".into()));
        }
        Ok(())
    }
}

impl Warehouse for MemoryWarehouse {
    async fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> Result<(), sqlx::Error> {
        self.stats.reconnects.fetch_add(1, Ordering::SeqCst);
        if self.reconnect_heals {
            self.closed.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn poll_window(&self, _code: u64) -> Result<Option<PollWindow>, sqlx::Error> {
        self.query()?;
        Ok(self.window)
    }

    async fn vote_operations(&self, _code: u64) -> Result<Vec<VoteOperation>, sqlx::Error> {
        self.query()?;
        Ok(self.operations.clone())
    }

    async fn voting_power(&self) -> Result<Vec<VotingPower>, sqlx::Error> {
        self.query()?;
        self.stats.power_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.power.clone())
    }

    async fn last_load(&self) -> Result<Option<NaiveDateTime>, sqlx::Error> {
        self.query()?;
        Ok(self.last_load)
    }
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn vote(at: &str, voter: &str, kind: &str, amount: f64, option: &str) -> VoteOperation {
    VoteOperation {
        timestamp: ts(at),
        tx_hash: Some(format!("0xtx{}", voter)),
        voter: Some(voter.into()),
        operation: Some(kind.into()),
        dapproval: Some(amount),
        option: Some(option.into()),
        proxy: None,
    }
}

fn catalog() -> PollCatalog {
    PollCatalog::new([PollMeta {
        code: 42,
        title: "Adjust the stability fee".into(),
        options: vec![
            PollOption { id: "A".into(), title: "Yes".into() },
            PollOption { id: "B".into(), title: "No".into() },
        ],
    }])
    .unwrap()
}

fn warehouse() -> MemoryWarehouse {
    MemoryWarehouse {
        window: Some(PollWindow {
            start_timestamp: ts("2023-12-01 00:00:00"),
            end_timestamp: ts("2024-01-01 00:00:00"),
        }),
        operations: vec![
            vote("2024-01-01 00:00:01", "0xaa", "VOTE", 10.0, "A"),
            vote("2023-12-31 23:59:00", "0xaa", "VOTE", 10.0, "B"),
            vote("2023-12-30 12:00:00", "0xbb", "VOTE", 4.0, "Z"),
        ],
        power: vec![
            VotingPower { voter: "0xaa".into(), voting_power: Some(5.0) },
            VotingPower { voter: "0xcc".into(), voting_power: None },
        ],
        last_load: Some(ts("2024-01-02 03:04:05")),
        ..Default::default()
    }
}

fn app(warehouse: MemoryWarehouse) -> (Router, Arc<Stats>) {
    let stats = warehouse.stats.clone();
    let service = Arc::new(PollService::new(warehouse, catalog(), "https://ethtx.info"));
    (create_routes(service), stats)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: Router, uri: &str) -> Value {
    let (status, bytes) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn open_poll_results() {
    let (app, stats) = app(warehouse());
    let payload = get_json(app, "/data/poll/42").await;

    assert_eq!(payload["status"], "success");
    let data = &payload["data"];
    assert_eq!(data["poll_start"], "2023-12-01 00:00:00");
    assert_eq!(data["poll_end"], "2024-01-01 00:00:00");
    assert_eq!(data["last_vote"], "2024-01-01 00:00:01");
    assert_eq!(data["num_voters"], 2);
    // 0xaa counts with its in-window ballot (10) plus live power (5).
    assert_eq!(data["approval"], "19.00");
    assert_eq!(data["not_valid_num"], 1);
    assert_eq!(data["not_valid_stake"], "4.00");
    assert_eq!(data["operations_num"], "3");

    let options = data["options"].as_str().unwrap();
    assert!(options.contains("<td>No</td><td>15.00</td><td>1</td>"));
    assert!(options.contains("<td>Yes</td><td>0.00</td><td>0</td>"));
    assert!(!options.contains("Not valid"));

    let operations = data["operations"].as_array().unwrap();
    assert_eq!(operations.len(), 3);
    assert_eq!(operations[0]["TIME"], "2024-01-01 00:00:01");
    assert_eq!(operations[0]["OPTION"], "Yes");
    assert_eq!(operations[0]["APPROVAL"], "15.00");
    assert_eq!(operations[2]["OPTION"], "Not valid");
    assert!(operations[0]["OPERATION"]
        .as_str()
        .unwrap()
        .contains("https://ethtx.info/0xtx0xaa"));

    assert_eq!(stats.power_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn closed_poll_ignores_voting_power() {
    let mut warehouse = warehouse();
    warehouse
        .operations
        .insert(0, vote("2024-01-01 00:00:00", "0xaa", FINAL_CHOICE, 10.0, "B"));
    let (app, stats) = app(warehouse);
    let payload = get_json(app, "/data/poll/42").await;

    assert_eq!(payload["status"], "success");
    assert_eq!(payload["data"]["approval"], "14.00");
    assert_eq!(payload["data"]["operations"][0]["OPERATION"], FINAL_CHOICE);
    assert_eq!(stats.power_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_codes_are_unknown_without_queries() {
    for code in ["abc", "12a", "%20", "-4"] {
        let (app, stats) = app(warehouse());
        let payload = get_json(app, &format!("/data/poll/{}", code)).await;
        assert_eq!(payload, serde_json::json!({"status": "failure", "data": "Unknown poll"}));
        assert_eq!(stats.queries.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn poll_missing_from_catalog_is_unknown() {
    let (app, stats) = app(warehouse());
    let payload = get_json(app, "/data/poll/7").await;
    assert_eq!(payload["data"], "Unknown poll");
    assert_eq!(stats.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_reconnect_is_a_connection_error() {
    let warehouse = MemoryWarehouse {
        closed: AtomicBool::new(true),
        ..warehouse()
    };
    let (app, stats) = app(warehouse);
    let payload = get_json(app, "/data/poll/42").await;

    assert_eq!(payload["status"], "failure");
    assert_eq!(payload["data"], "Database connection error");
    assert_eq!(stats.reconnects.load(Ordering::SeqCst), 1);
    assert_eq!(stats.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn successful_reconnect_serves_results() {
    let warehouse = MemoryWarehouse {
        closed: AtomicBool::new(true),
        reconnect_heals: true,
        ..warehouse()
    };
    let (app, stats) = app(warehouse);
    let payload = get_json(app, "/data/poll/42").await;

    assert_eq!(payload["status"], "success");
    assert_eq!(stats.reconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn query_failures_are_backend_errors() {
    let warehouse = MemoryWarehouse {
        fail_queries: true,
        ..warehouse()
    };
    let (app, _) = app(warehouse);
    let payload = get_json(app, "/data/poll/42").await;

    assert_eq!(payload["status"], "failure");
    let message = payload["data"].as_str().unwrap();
    assert!(message.starts_with("Backend error: "));
    assert!(message.contains("does not exist"));
}

#[tokio::test]
async fn missing_window_is_a_backend_error() {
    let warehouse = MemoryWarehouse {
        window: None,
        ..warehouse()
    };
    let (app, _) = app(warehouse);
    let payload = get_json(app, "/data/poll/42").await;
    assert_eq!(payload["data"], "Backend error: no voting window recorded for poll 42");
}

#[tokio::test]
async fn poll_page_shows_title_and_refresh() {
    let (app, _) = app(warehouse());
    let (status, bytes) = get(app, "/poll/42").await;
    let html = String::from_utf8(bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<h1>Adjust the stability fee</h1>"));
    assert!(html.contains("Last refresh: <span>2024-01-02 03:04:05</span>"));
}

#[tokio::test]
async fn poll_page_for_unknown_poll() {
    let (app, stats) = app(warehouse());
    let (status, bytes) = get(app, "/poll/4x").await;
    let html = String::from_utf8(bytes).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No poll matches <code>4x</code>."));
    assert_eq!(stats.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn poll_page_error() {
    let warehouse = MemoryWarehouse {
        fail_queries: true,
        ..warehouse()
    };
    let (app, _) = app(warehouse);
    let (status, bytes) = get(app, "/poll/42").await;
    let html = String::from_utf8(bytes).unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(html.contains("relation mcd_public.votes does not exist"));
}
